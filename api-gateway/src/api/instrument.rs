//! Instrument API handlers
//!
//! Handlers for listed companies:
//! - List instruments
//! - Instrument detail with the caller's holding
//! - Price history chart

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::Utc;
use common::decimal::Amount;
use common::model::{Holding, Instrument};
use market_data::ChartData;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::api::session::SessionAccount;
use crate::error::ApiError;
use crate::AppState;

/// Instrument with derived figures and the session holding
#[derive(Debug, Serialize, ToSchema)]
pub struct InstrumentDetail {
    /// The instrument
    pub instrument: Instrument,
    /// price * shares outstanding
    pub market_cap: Amount,
    /// Holding of the session account, when one is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding: Option<Holding>,
}

/// List every instrument
#[utoipa::path(
    get,
    path = "/api/v1/instruments",
    responses(
        (status = 200, description = "Instruments sorted by code", body = [Instrument])
    ),
    tag = "instrument"
)]
pub async fn list_instruments(
    State(state): State<Arc<AppState>>,
) -> Result<ApiListResponse<Instrument>, ApiError> {
    let instruments = state.exchange.list_instruments().await?;
    Ok(ApiListResponse::new(instruments))
}

/// Get one instrument
#[utoipa::path(
    get,
    path = "/api/v1/instruments/{code}",
    params(
        ("code" = String, Path, description = "Instrument code"),
        ("X-Account-Id" = Option<String>, Header, description = "Session account ID (UUID)")
    ),
    responses(
        (status = 200, description = "Instrument retrieved successfully", body = InstrumentDetail),
        (status = 404, description = "Instrument not found")
    ),
    tag = "instrument"
)]
pub async fn get_instrument(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    session: Option<SessionAccount>,
) -> Result<ApiResponse<InstrumentDetail>, ApiError> {
    let instrument = find_instrument(&state, &code).await?;

    let holding = match session {
        Some(SessionAccount(account_id)) => Some(state.exchange.get_holding(account_id, &instrument.code).await?),
        None => None,
    };

    Ok(ApiResponse::new(InstrumentDetail {
        market_cap: instrument.market_cap(),
        instrument,
        holding,
    }))
}

/// Price history chart of an instrument
#[utoipa::path(
    get,
    path = "/api/v1/instruments/{code}/history",
    params(
        ("code" = String, Path, description = "Instrument code")
    ),
    responses(
        (status = 200, description = "Chart labels and prices, oldest first", body = ChartData),
        (status = 404, description = "Instrument not found")
    ),
    tag = "instrument"
)]
pub async fn get_price_history(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<ApiResponse<ChartData>, ApiError> {
    let instrument = find_instrument(&state, &code).await?;
    let chart = state.prices.chart(&instrument, Utc::now()).await?;
    Ok(ApiResponse::new(chart))
}

pub(crate) async fn find_instrument(state: &AppState, code: &str) -> Result<Instrument, ApiError> {
    state.exchange.get_instrument(code).await?
        .ok_or_else(|| ApiError::NotFound(format!("Instrument not found: {}", code)))
}
