//! HTTP surface of the stock exchange simulation

pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use common::error::Result;
use exchange_service::ExchangeService;
use market_data::PriceHistoryService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{account, admin, instrument, leaderboard, loan, trade};

pub use crate::config::AppConfig;
pub use crate::error::ApiError;

/// App state shared across handlers
pub struct AppState {
    /// Accounts, instruments, trades and loans
    pub exchange: Arc<ExchangeService>,
    /// Price history
    pub prices: Arc<PriceHistoryService>,
}

impl AppState {
    /// Create the shared state
    pub fn new(exchange: Arc<ExchangeService>, prices: Arc<PriceHistoryService>) -> Self {
        Self { exchange, prices }
    }

    /// Snapshot the current price of every instrument
    pub async fn record_snapshots(&self) -> Result<usize> {
        let instruments = self.exchange.list_instruments().await?;
        self.prices.record_all(&instruments, Utc::now()).await
    }
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Account routes
        api::account::register_account,
        api::account::get_account,
        api::account::get_portfolio,
        api::account::get_transactions,
        // Instrument routes
        api::instrument::list_instruments,
        api::instrument::get_instrument,
        api::instrument::get_price_history,
        // Trading routes
        api::trade::place_trade,
        api::loan::manage_loan,
        api::leaderboard::get_leaderboard,
        // Admin routes
        api::admin::list_instrument,
        api::admin::record_snapshots,
        api::admin::accrue_interest,
        api::admin::settle_loans,
    ),
    components(
        schemas(
            api::account::RegisterAccountRequest,
            api::instrument::InstrumentDetail,
            api::trade::TradeForm,
            api::loan::LoanForm,
            api::admin::ListInstrumentRequest,
            api::admin::JobResult,
            api::response::ResponseMetadata,
            common::model::Account,
            common::model::Instrument,
            common::model::Holding,
            common::model::LedgerEntry,
            common::model::Side,
            exchange_service::Portfolio,
            exchange_service::PortfolioPosition,
            exchange_service::LeaderboardEntry,
            market_data::ChartData,
            error::ErrorResponse,
            error::ErrorInfo,
        )
    ),
    tags(
        (name = "account", description = "Account registration, portfolio and history"),
        (name = "instrument", description = "Listed companies and price history"),
        (name = "trade", description = "Buying and selling shares"),
        (name = "loan", description = "Loans and installments"),
        (name = "leaderboard", description = "Net worth ranking"),
        (name = "admin", description = "Listings and periodic jobs")
    ),
    info(
        title = "Stock Bridge API",
        version = "1.0.0",
        description = "Stock market simulation: simulated cash, loans, trades and a net-worth leaderboard"
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn router(state: Arc<AppState>, log_level: Level) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Account routes
        .route("/accounts", post(account::register_account))
        .route("/accounts/:id", get(account::get_account))
        .route("/portfolio", get(account::get_portfolio))
        .route("/transactions", get(account::get_transactions))

        // Instrument routes
        .route("/instruments", get(instrument::list_instruments))
        .route("/instruments/:code", get(instrument::get_instrument))
        .route("/instruments/:code/history", get(instrument::get_price_history))
        .route("/instruments/:code/trade", post(trade::place_trade))

        // Loans and ranking
        .route("/loans", post(loan::manage_loan))
        .route("/leaderboard", get(leaderboard::get_leaderboard))

        // Admin routes
        .route("/admin/instruments", post(admin::list_instrument))
        .route("/admin/snapshots", post(admin::record_snapshots))
        .route("/admin/interest", post(admin::accrue_interest))
        .route("/admin/loans/settle", post(admin::settle_loans));

    let swagger_ui = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(swagger_ui)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(log_level))
                .on_request(DefaultOnRequest::new().level(log_level))
                .on_response(DefaultOnResponse::new().level(log_level)),
        )
        .with_state(state)
}
