//! Exchange service: accounts, instruments, the trade coordinator and loans

pub mod service;
pub mod repository;
pub mod config;
pub mod trade;
pub mod stats;
pub mod leaderboard;

pub use service::{ExchangeService, Portfolio, PortfolioPosition, RepositoryType};
pub use repository::{ExchangeRepository, InMemoryExchangeRepository, MarketSnapshot, PostgresExchangeRepository};
pub use config::{ExchangeConfig, MarketHours};
pub use leaderboard::LeaderboardEntry;
