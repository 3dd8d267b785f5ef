//! API handlers
//!
//! This module contains all the API endpoint handlers organized by resource.
//! Each handler follows a consistent pattern:
//! - Extract state, the session account and parameters using Axum extractors
//! - Call the appropriate service methods
//! - Map the result to a standardized response format

pub mod account;
pub mod admin;
pub mod instrument;
pub mod leaderboard;
pub mod loan;
pub mod response;
pub mod session;
pub mod trade;

pub use response::{ApiListResponse, ApiResponse};
pub use session::SessionAccount;
