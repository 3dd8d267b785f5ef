//! Price history service: periodic snapshots and chart series

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use common::error::{Error, Result};
use common::model::Instrument;
use tracing::{debug, info};

use crate::models::{ChartData, PriceSnapshot};
use crate::repository::{InMemorySnapshotRepository, SnapshotRepository};

/// Number of snapshots shown on a chart by default
pub const DEFAULT_CHART_POINTS: usize = 10;

/// Records instrument prices over time and turns them into chart data
pub struct PriceHistoryService {
    /// Snapshot storage
    repo: Arc<dyn SnapshotRepository>,
    /// Snapshots per chart
    chart_points: usize,
    /// Offset used for chart labels
    utc_offset: FixedOffset,
}

impl Default for PriceHistoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceHistoryService {
    /// Create an in-memory service with UTC labels and the default chart size
    pub fn new() -> Self {
        Self {
            repo: Arc::new(InMemorySnapshotRepository::new()),
            chart_points: DEFAULT_CHART_POINTS,
            utc_offset: Utc.fix(),
        }
    }

    /// Create a service over a repository
    pub fn with_repository(
        repo: Arc<dyn SnapshotRepository>,
        chart_points: usize,
        utc_offset_minutes: i32,
    ) -> Result<Self> {
        if chart_points == 0 {
            return Err(Error::ConfigurationError("CHART_POINTS must be positive".to_string()));
        }
        let utc_offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::ConfigurationError(format!(
                "CHART_UTC_OFFSET_MINUTES out of range: {}",
                utc_offset_minutes
            )))?;

        Ok(Self { repo, chart_points, utc_offset })
    }

    /// Append the current price of every instrument to its history
    pub async fn record_all(&self, instruments: &[Instrument], at: DateTime<Utc>) -> Result<usize> {
        let snapshots: Vec<PriceSnapshot> = instruments
            .iter()
            .map(|i| PriceSnapshot {
                code: i.code.clone(),
                price: i.price,
                recorded_at: at,
            })
            .collect();

        let count = self.repo.record(&snapshots).await?;
        info!("Recorded {} price snapshots", count);
        Ok(count)
    }

    /// Latest snapshots of an instrument, oldest first
    pub async fn history(&self, code: &str) -> Result<Vec<PriceSnapshot>> {
        self.repo.latest(code, self.chart_points).await
    }

    /// Chart series for an instrument.
    ///
    /// The live price is appended when it differs from the latest snapshot
    /// or when no snapshot exists yet.
    pub async fn chart(&self, instrument: &Instrument, now: DateTime<Utc>) -> Result<ChartData> {
        let snapshots = self.history(&instrument.code).await?;
        debug!("Building chart for {} from {} snapshots", instrument.code, snapshots.len());

        let mut chart = ChartData::default();
        for snapshot in &snapshots {
            chart.push(self.label(snapshot.recorded_at), snapshot.price);
        }

        let stale = snapshots.last().map_or(true, |s| s.price != instrument.price);
        if stale {
            chart.push(self.label(now), instrument.price);
        }
        Ok(chart)
    }

    fn label(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.utc_offset).format("%H:%M").to_string()
    }
}
