//! Bounded in-memory run log.
//!
//! The status endpoint replays recent pipeline activity without a log
//! aggregation stack: every observer notification lands here (and in the
//! tracing output) with a timestamp, bounded to the most recent entries.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::RwLock;
use satchel_core::PipelineObserver;
use satchel_domain::constants::RUN_LOG_LIMIT;
use tracing::info;

pub struct RunLog {
    lines: RwLock<VecDeque<String>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self { lines: RwLock::new(VecDeque::new()) }
    }

    /// Recent entries, newest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.read().iter().rev().cloned().collect()
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineObserver for RunLog {
    fn notify(&self, message: &str) {
        info!(target: "pipeline", "{message}");
        let line = format!("[{}] {message}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        let mut lines = self.lines.write();
        lines.push_back(line);
        while lines.len() > RUN_LOG_LIMIT {
            lines.pop_front();
        }
    }
}
