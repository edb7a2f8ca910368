//! Run-state tracking and the incremental lookback policy
//!
//! The lookback window always overlaps the previous run by at least one
//! day so boundary-timing races never lose items; re-seeing an item is
//! harmless because staging dedups by identity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use satchel_domain::{Result, RunState};
use tracing::debug;

use crate::ports::RunStateStore;

const SECS_PER_DAY: i64 = 86_400;

/// Pure lookback computation, separated from persistence for testing.
#[derive(Debug, Clone, Copy)]
pub struct LookbackPolicy {
    backfill_days: i64,
}

impl LookbackPolicy {
    pub fn new(backfill_days: i64) -> Self {
        Self { backfill_days: backfill_days.max(1) }
    }

    /// Days to scan: `ceil(elapsed / 1 day) + 1` since the last
    /// successful run, or the full backfill window on a first run.
    pub fn window_days(&self, state: &RunState, now: DateTime<Utc>) -> i64 {
        match state.last_run_timestamp {
            Some(last) => {
                let elapsed = now.timestamp() - last;
                if elapsed <= 0 {
                    return 1;
                }
                (elapsed + SECS_PER_DAY - 1) / SECS_PER_DAY + 1
            }
            None => self.backfill_days,
        }
    }
}

/// Couples the lookback policy to the persisted run-state record.
pub struct RunStateTracker {
    store: Arc<dyn RunStateStore>,
    policy: LookbackPolicy,
}

impl RunStateTracker {
    pub fn new(store: Arc<dyn RunStateStore>, policy: LookbackPolicy) -> Self {
        Self { store, policy }
    }

    /// Lookback window for the next run, in days.
    pub async fn lookback_days(&self) -> Result<i64> {
        let state = self.store.load().await?;
        let days = self.policy.window_days(&state, Utc::now());
        debug!(days, "resolved lookback window");
        Ok(days)
    }

    /// Record the current time as the last successful run. Called only
    /// after a run finishes its source scans without a fatal error;
    /// partial item-level failures do not block this write.
    pub async fn mark_run_complete(&self) -> Result<()> {
        let state = RunState { last_run_timestamp: Some(Utc::now().timestamp()) };
        self.store.save(&state).await
    }
}
