//! Loan API handler

use std::sync::Arc;

use axum::extract::State;
use axum::Form;
use common::model::Account;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::response::ApiResponse;
use crate::api::session::SessionAccount;
use crate::error::ApiError;
use crate::AppState;

/// Loan form
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoanForm {
    /// `issue` or `pay`
    #[serde(default)]
    pub mode: String,
}

/// Take a loan or repay one installment
#[utoipa::path(
    post,
    path = "/api/v1/loans",
    params(
        ("X-Account-Id" = String, Header, description = "Session account ID (UUID)")
    ),
    request_body(content = LoanForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Loan issued or installment paid", body = Account),
        (status = 400, description = "Invalid mode, loan limit reached or installment rejected"),
        (status = 403, description = "Market closed")
    ),
    tag = "loan"
)]
pub async fn manage_loan(
    State(state): State<Arc<AppState>>,
    SessionAccount(account_id): SessionAccount,
    Form(form): Form<LoanForm>,
) -> Result<ApiResponse<Account>, ApiError> {
    let account = state.exchange.loan_form(account_id, &form.mode).await?;

    let message = if form.mode.trim().eq_ignore_ascii_case("issue") {
        "Loan has been issued."
    } else {
        "Installment paid!"
    };
    Ok(ApiResponse::with_message(account, message))
}
