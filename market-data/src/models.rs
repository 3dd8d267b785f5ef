//! Market data models

use chrono::{DateTime, Utc};
use common::decimal::Price;
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

/// Price of an instrument at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct PriceSnapshot {
    /// Instrument code
    pub code: String,
    /// Price when the snapshot was taken
    pub price: Price,
    /// Snapshot timestamp
    pub recorded_at: DateTime<Utc>,
}

/// Price chart series, oldest point first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct ChartData {
    /// `HH:MM` label per point
    pub labels: Vec<String>,
    /// Price per point
    pub prices: Vec<Price>,
}

impl ChartData {
    /// Append one point
    pub fn push(&mut self, label: String, price: Price) {
        self.labels.push(label);
        self.prices.push(price);
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the chart has no points
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
