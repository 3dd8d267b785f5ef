//! Trade API handler

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Form;
use common::model::LedgerEntry;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::response::ApiResponse;
use crate::api::session::SessionAccount;
use crate::error::ApiError;
use crate::AppState;

/// Message returned with every completed trade
pub const TRADE_COMPLETE: &str = "Transaction Complete!";

/// Trade form as posted by the market page
#[derive(Debug, Deserialize, ToSchema)]
pub struct TradeForm {
    /// `buy` or `sell`
    #[serde(default)]
    pub mode: String,
    /// Positive whole number of shares
    #[serde(default)]
    pub quantity: String,
}

/// Buy or sell shares of an instrument at its current price
#[utoipa::path(
    post,
    path = "/api/v1/instruments/{code}/trade",
    params(
        ("code" = String, Path, description = "Instrument code"),
        ("X-Account-Id" = String, Header, description = "Session account ID (UUID)")
    ),
    request_body(content = TradeForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Trade executed", body = LedgerEntry),
        (status = 400, description = "Invalid mode or quantity, or the trade cannot be covered"),
        (status = 403, description = "Market closed"),
        (status = 404, description = "Instrument or account not found")
    ),
    tag = "trade"
)]
pub async fn place_trade(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    SessionAccount(account_id): SessionAccount,
    Form(form): Form<TradeForm>,
) -> Result<ApiResponse<LedgerEntry>, ApiError> {
    let entry = state.exchange
        .trade_form(account_id, &code, &form.mode, &form.quantity)
        .await?;

    Ok(ApiResponse::with_message(entry, TRADE_COMPLETE))
}
