use async_trait::async_trait;
use common::error::Result;
use dashmap::DashMap;

use super::SnapshotRepository;
use crate::models::PriceSnapshot;

/// Snapshot history kept per instrument code
#[derive(Default)]
pub struct InMemorySnapshotRepository {
    history: DashMap<String, Vec<PriceSnapshot>>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn record(&self, snapshots: &[PriceSnapshot]) -> Result<usize> {
        for snapshot in snapshots {
            self.history
                .entry(snapshot.code.clone())
                .or_default()
                .push(snapshot.clone());
        }
        Ok(snapshots.len())
    }

    async fn latest(&self, code: &str, limit: usize) -> Result<Vec<PriceSnapshot>> {
        Ok(self
            .history
            .get(code)
            .map(|entries| {
                let start = entries.len().saturating_sub(limit);
                entries[start..].to_vec()
            })
            .unwrap_or_default())
    }
}
