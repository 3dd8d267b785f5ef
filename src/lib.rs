//! Stock Bridge: a stock market simulation with simulated cash, loans,
//! trades and a net-worth leaderboard.
//!
//! This metapackage re-exports the workspace crates and hosts the
//! cross-crate test-suite.

pub use api_gateway;
pub use common;
pub use exchange_service;
pub use market_data;
