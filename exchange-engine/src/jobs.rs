//! Periodic background jobs

use std::sync::Arc;
use std::time::Duration;

use api_gateway::AppState;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Record a price snapshot of every instrument each `period`
pub fn spawn_snapshot_recorder(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Snapshot recorder running every {:?}", period);

        loop {
            ticker.tick().await;
            if let Err(e) = state.record_snapshots().await {
                error!("Price snapshot failed: {}", e);
            }
        }
    })
}

/// Charge interest on every loan each `period`; the first charge happens one period after start
pub fn spawn_interest_accrual(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        info!("Interest accrual running every {:?}", period);

        loop {
            ticker.tick().await;
            if let Err(e) = state.exchange.accrue_interest().await {
                error!("Interest accrual failed: {}", e);
            }
        }
    })
}
