mod memory;
mod postgres;

use async_trait::async_trait;
use common::error::Result;

use crate::models::PriceSnapshot;

pub use memory::InMemorySnapshotRepository;
pub use postgres::PostgresSnapshotRepository;

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Append snapshots; returns how many were stored
    async fn record(&self, snapshots: &[PriceSnapshot]) -> Result<usize>;
    /// Latest `limit` snapshots of an instrument, oldest first
    async fn latest(&self, code: &str, limit: usize) -> Result<Vec<PriceSnapshot>>;
}
