use clap::{Parser, Subcommand};
use common::db;
use exchange_service::{ExchangeConfig, ExchangeService, RepositoryType};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exchange administration CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Database URL (defaults to DATABASE_URL)
    #[arg(short, long)]
    database_url: Option<String>,

    /// Commands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Charge interest on every outstanding loan
    AccrueInterest,
    /// Repay every loan from cash as far as possible
    SettleLoans,
    /// List a new instrument
    List {
        /// Instrument code
        code: String,
        /// Company name
        name: String,
        /// Opening price
        price: rust_decimal::Decimal,
        /// Total shares issued
        shares: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "exchange_service={},exchange_admin={}",
            cli.log_level, cli.log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ExchangeConfig::from_env()?;
    if cli.database_url.is_some() {
        config.database_url = cli.database_url;
    }
    let Some(database_url) = config.database_url.clone() else {
        error!("DATABASE_URL must be set or passed with --database-url");
        return Err("no database configured".into());
    };

    if let Commands::Migrate = cli.command {
        let pool = db::connect(&database_url, config.db_pool_size).await?;
        db::run_migrations(&pool).await?;
        info!("Migrations applied");
        return Ok(());
    }

    let service = ExchangeService::with_repository(RepositoryType::Postgres(Some(database_url)), config).await?;
    match cli.command {
        Commands::Migrate => {}
        Commands::AccrueInterest => {
            let count = service.accrue_interest().await?;
            info!("Interest accrued on {} accounts", count);
        }
        Commands::SettleLoans => {
            let count = service.settle_loans().await?;
            info!("Settled loans on {} accounts", count);
        }
        Commands::List { code, name, price, shares } => {
            let instrument = service.list_instrument(&code, &name, price, shares).await?;
            info!("Listed {} ({}) at {}", instrument.code, instrument.name, instrument.price);
        }
    }

    Ok(())
}
