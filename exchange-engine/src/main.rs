//! Stock Bridge server: HTTP API plus the periodic snapshot and interest jobs

mod jobs;

use std::sync::Arc;

use api_gateway::{router, AppConfig, AppState};
use clap::Parser;
use common::db;
use common::decimal::Price;
use common::error::{Error, Result};
use dotenv::dotenv;
use exchange_service::{ExchangeConfig, ExchangeService, PostgresExchangeRepository};
use market_data::{InMemorySnapshotRepository, PostgresSnapshotRepository, PriceHistoryService, SnapshotRepository};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Stock exchange simulation server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Listening address; overrides PORT
    #[clap(short, long)]
    addr: Option<String>,

    /// List a handful of demo instruments on an empty market
    #[clap(long)]
    demo: bool,

    /// Apply database migrations before serving
    #[clap(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize logging with debug level when DEBUG=1 env var is set
    let debug_enabled = std::env::var("DEBUG").map(|v| v == "1").unwrap_or(false);
    let log_level = if debug_enabled { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    debug!("Debug logging enabled");

    let app_config = AppConfig::new();
    app_config.validate()?;
    let exchange_config = ExchangeConfig::from_env()?;

    let (exchange, snapshots) = build_services(exchange_config, args.migrate).await?;
    let prices = PriceHistoryService::with_repository(
        snapshots,
        app_config.chart_points,
        app_config.chart_utc_offset_minutes,
    )?;
    let state = Arc::new(AppState::new(Arc::new(exchange), Arc::new(prices)));

    if args.demo {
        seed_demo_market(&state.exchange).await?;
    }

    let snapshot_job = jobs::spawn_snapshot_recorder(state.clone(), app_config.snapshot_interval);
    let interest_job = jobs::spawn_interest_accrual(state.clone(), app_config.interest_interval);

    let app = router(state, log_level);

    let addr = args.addr.unwrap_or_else(|| format!("127.0.0.1:{}", app_config.port));
    let addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| Error::ConfigurationError(format!("Invalid address {}: {}", addr, e)))?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    // Run until interrupt signal
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    snapshot_job.abort();
    interest_job.abort();
    info!("Server stopped");
    Ok(())
}

/// Exchange service and snapshot store, PostgreSQL-backed when DATABASE_URL is set
async fn build_services(
    config: ExchangeConfig,
    migrate: bool,
) -> Result<(ExchangeService, Arc<dyn SnapshotRepository>)> {
    let Some(url) = config.database_url.clone() else {
        info!("DATABASE_URL not set, using in-memory storage");
        return Ok((
            ExchangeService::in_memory(config),
            Arc::new(InMemorySnapshotRepository::new()),
        ));
    };

    let pool = db::connect(&url, config.db_pool_size).await?;
    if migrate {
        db::run_migrations(&pool).await?;
        info!("Database migrations applied");
    }

    let exchange = ExchangeService::with_repo(
        Arc::new(PostgresExchangeRepository::new(pool.clone())),
        config,
    );
    Ok((exchange, Arc::new(PostgresSnapshotRepository::new(pool))))
}

/// List demo companies when the market is empty
async fn seed_demo_market(exchange: &ExchangeService) -> Result<()> {
    if !exchange.list_instruments().await?.is_empty() {
        warn!("Market already has instruments, skipping demo listings");
        return Ok(());
    }

    let listings = [
        ("ACME", "Acme Corporation", Price::new(12000, 2), 10_000),
        ("BOLT", "Bolt Motors", Price::new(4550, 2), 25_000),
        ("CRWN", "Crown Foods", Price::new(31025, 2), 4_000),
        ("DLTA", "Delta Shipping", Price::new(1875, 2), 60_000),
        ("EVRG", "Evergreen Energy", Price::new(7210, 2), 15_000),
    ];
    for (code, name, price, shares) in listings {
        exchange.list_instrument(code, name, price, shares).await?;
    }
    info!("Listed {} demo instruments", listings.len());
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
