//! Application configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

use common::error::{Error, Result};
use market_data::DEFAULT_CHART_POINTS;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API port
    pub port: u16,
    /// Snapshots per price chart
    pub chart_points: usize,
    /// Offset of chart labels from UTC, in minutes
    pub chart_utc_offset_minutes: i32,
    /// Period of the price snapshot job
    pub snapshot_interval: Duration,
    /// Period of the interest accrual job
    pub interest_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// Create a new configuration from environment variables
    pub fn new() -> Self {
        Self {
            port: env_or("PORT", 8080),
            chart_points: env_or("CHART_POINTS", DEFAULT_CHART_POINTS),
            chart_utc_offset_minutes: env_or("CHART_UTC_OFFSET_MINUTES", 0),
            snapshot_interval: Duration::from_secs(env_or("SNAPSHOT_INTERVAL_SECS", 300)),
            interest_interval: Duration::from_secs(env_or("INTEREST_INTERVAL_SECS", 1800)),
        }
    }

    /// Reject values the chart builder or the periodic jobs cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chart_points == 0 {
            return Err(Error::ConfigurationError("CHART_POINTS must be positive".to_string()));
        }
        if self.chart_utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::ConfigurationError(format!(
                "CHART_UTC_OFFSET_MINUTES must be within one day, got {}",
                self.chart_utc_offset_minutes
            )));
        }
        if self.snapshot_interval.is_zero() {
            return Err(Error::ConfigurationError("SNAPSHOT_INTERVAL_SECS must be positive".to_string()));
        }
        if self.interest_interval.is_zero() {
            return Err(Error::ConfigurationError("INTEREST_INTERVAL_SECS must be positive".to_string()));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            port: 8080,
            chart_points: DEFAULT_CHART_POINTS,
            chart_utc_offset_minutes: 180,
            snapshot_interval: Duration::from_secs(300),
            interest_interval: Duration::from_secs(1800),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut snapshot = config();
        snapshot.snapshot_interval = Duration::ZERO;
        assert!(matches!(snapshot.validate(), Err(Error::ConfigurationError(_))));

        let mut interest = config();
        interest.interest_interval = Duration::ZERO;
        assert!(matches!(interest.validate(), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn chart_settings_are_checked() {
        let mut points = config();
        points.chart_points = 0;
        assert!(matches!(points.validate(), Err(Error::ConfigurationError(_))));

        let mut offset = config();
        offset.chart_utc_offset_minutes = -1440;
        assert!(matches!(offset.validate(), Err(Error::ConfigurationError(_))));
    }
}
