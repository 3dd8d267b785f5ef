//! Session account extraction
//!
//! Authentication lives outside this service; the caller's account is
//! identified by the `X-Account-Id` header.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

/// Header naming the session account
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Account ID of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAccount(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for SessionAccount
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACCOUNT_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-Account-Id header".to_string()))?;

        value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(SessionAccount)
            .ok_or_else(|| ApiError::BadRequest("X-Account-Id must be a UUID".to_string()))
    }
}
