//! Leaderboard API handler

use std::sync::Arc;

use axum::extract::State;
use exchange_service::LeaderboardEntry;

use crate::api::response::ApiListResponse;
use crate::error::ApiError;
use crate::AppState;

/// Every account ranked by net worth
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    responses(
        (status = 200, description = "Ranked accounts", body = [LeaderboardEntry])
    ),
    tag = "leaderboard"
)]
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<ApiListResponse<LeaderboardEntry>, ApiError> {
    let entries = state.exchange.leaderboard().await?;
    Ok(ApiListResponse::new(entries))
}
