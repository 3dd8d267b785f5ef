//! Market data service: instrument price history and chart data

mod service;
mod models;
pub mod repository;

pub use service::{PriceHistoryService, DEFAULT_CHART_POINTS};
pub use models::{ChartData, PriceSnapshot};
pub use repository::{InMemorySnapshotRepository, PostgresSnapshotRepository, SnapshotRepository};
