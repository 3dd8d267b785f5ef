//! Account API handlers
//!
//! Handles endpoints related to the trading account:
//! - Register an account
//! - Get account details
//! - Portfolio and transaction history of the session account

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use common::model::{Account, LedgerEntry};
use exchange_service::Portfolio;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::api::session::SessionAccount;
use crate::error::ApiError;
use crate::AppState;

/// Register account request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterAccountRequest {
    /// Unique username
    pub username: String,
}

/// Register a new account funded by the opening loan
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = RegisterAccountRequest,
    responses(
        (status = 200, description = "Account successfully registered", body = Account),
        (status = 400, description = "Invalid username"),
        (status = 409, description = "Username already taken")
    ),
    tag = "account"
)]
pub async fn register_account(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterAccountRequest>,
) -> Result<ApiResponse<Account>, ApiError> {
    let account = state.exchange.register_account(&request.username).await?;
    Ok(ApiResponse::new(account))
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account details retrieved successfully", body = Account),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Account>, ApiError> {
    let account = state.exchange.get_account(id).await?
        .ok_or_else(|| ApiError::NotFound(format!("Account not found: {}", id)))?;

    Ok(ApiResponse::new(account))
}

/// Holdings and net worth of the session account
#[utoipa::path(
    get,
    path = "/api/v1/portfolio",
    params(
        ("X-Account-Id" = String, Header, description = "Session account ID (UUID)")
    ),
    responses(
        (status = 200, description = "Portfolio retrieved successfully", body = Portfolio),
        (status = 401, description = "Missing session account"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    SessionAccount(account_id): SessionAccount,
) -> Result<ApiResponse<Portfolio>, ApiError> {
    let portfolio = state.exchange.portfolio(account_id).await?;
    Ok(ApiResponse::new(portfolio))
}

/// Completed trades of the session account, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(
        ("X-Account-Id" = String, Header, description = "Session account ID (UUID)")
    ),
    responses(
        (status = 200, description = "Transaction history retrieved successfully", body = [LedgerEntry]),
        (status = 401, description = "Missing session account"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    SessionAccount(account_id): SessionAccount,
) -> Result<ApiListResponse<LedgerEntry>, ApiError> {
    let entries = state.exchange.ledger(account_id).await?;
    Ok(ApiListResponse::new(entries))
}
