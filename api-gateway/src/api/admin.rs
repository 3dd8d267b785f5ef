//! Administrative endpoints
//!
//! Listing instruments and firing the periodic jobs by hand, so an external
//! scheduler can drive them instead of the in-process timers.

use std::sync::Arc;

use axum::{extract::State, Json};
use common::decimal::{Price, Shares};
use common::model::Instrument;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::response::ApiResponse;
use crate::error::ApiError;
use crate::AppState;

/// New instrument listing
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListInstrumentRequest {
    /// Unique code, 1 to 10 letters or digits
    pub code: String,
    /// Unique company name
    pub name: String,
    /// Opening price
    pub price: Price,
    /// Total shares issued
    pub shares_outstanding: Shares,
}

/// Outcome of a batch job
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResult {
    /// Rows processed
    pub processed: usize,
}

/// List a new instrument
#[utoipa::path(
    post,
    path = "/api/v1/admin/instruments",
    request_body = ListInstrumentRequest,
    responses(
        (status = 200, description = "Instrument listed", body = Instrument),
        (status = 400, description = "Invalid listing"),
        (status = 409, description = "Code or name already taken")
    ),
    tag = "admin"
)]
pub async fn list_instrument(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ListInstrumentRequest>,
) -> Result<ApiResponse<Instrument>, ApiError> {
    let instrument = state.exchange
        .list_instrument(&request.code, &request.name, request.price, request.shares_outstanding)
        .await?;
    Ok(ApiResponse::new(instrument))
}

/// Record the current price of every instrument
#[utoipa::path(
    post,
    path = "/api/v1/admin/snapshots",
    responses(
        (status = 200, description = "Snapshots recorded", body = JobResult)
    ),
    tag = "admin"
)]
pub async fn record_snapshots(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<JobResult>, ApiError> {
    let processed = state.record_snapshots().await?;
    Ok(ApiResponse::new(JobResult { processed }))
}

/// Charge interest on every outstanding loan
#[utoipa::path(
    post,
    path = "/api/v1/admin/interest",
    responses(
        (status = 200, description = "Interest accrued", body = JobResult)
    ),
    tag = "admin"
)]
pub async fn accrue_interest(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<JobResult>, ApiError> {
    let processed = state.exchange.accrue_interest().await?;
    Ok(ApiResponse::with_message(JobResult { processed }, "Interest Deducted"))
}

/// Repay every loan from cash as far as possible
#[utoipa::path(
    post,
    path = "/api/v1/admin/loans/settle",
    responses(
        (status = 200, description = "Loans settled", body = JobResult)
    ),
    tag = "admin"
)]
pub async fn settle_loans(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<JobResult>, ApiError> {
    let processed = state.exchange.settle_loans().await?;
    Ok(ApiResponse::with_message(JobResult { processed }, "Loan Deducted"))
}

