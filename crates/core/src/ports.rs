//! Port interfaces for the extraction pipeline
//!
//! Everything the pipeline needs from the outside world crosses one of
//! these traits. Adapters live in `satchel-infra`; tests use in-memory
//! fakes.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use satchel_domain::{EnrichedEvent, ExtractedEvent, RawItem, Result, RunState};

/// A source of raw candidate notices (mail inbox, school portal).
///
/// Adapters isolate their own provider plumbing; one adapter's failure
/// must not prevent the others from being scanned.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short name used in logs and run reports.
    fn name(&self) -> &str;

    /// Pull candidate items discovered within the last `lookback_days`.
    async fn scan(&self, lookback_days: i64) -> Result<Vec<RawItem>>;
}

/// The text-to-structured-event oracle.
///
/// Treated as untrusted and unreliable: `Ok(None)` means the oracle
/// confidently found no event, any `Err` triggers the regex fallback
/// upstream. All JSON-fence stripping and schema validation happen
/// behind this boundary - callers never see raw model output.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(
        &self,
        item: &RawItem,
        context_labels: &[String],
    ) -> Result<Option<ExtractedEvent>>;
}

/// Calendar collaborator: advisory conflict lookup plus approval-time
/// commit.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Titles of existing calendar entries overlapping `[start, end]`.
    async fn find_conflicts(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<String>>;

    /// Write an approved event to the calendar; returns a deep link.
    async fn commit(&self, event: &EnrichedEvent) -> Result<String>;
}

/// Persistence for the single run-state record.
#[async_trait]
pub trait RunStateStore: Send + Sync {
    /// Unreadable or missing state loads as the default (first run).
    async fn load(&self) -> Result<RunState>;

    async fn save(&self, state: &RunState) -> Result<()>;
}

/// Injected progress notification channel (status page run log).
pub trait PipelineObserver: Send + Sync {
    fn notify(&self, message: &str);
}

/// Observer that forwards progress lines to tracing only.
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn notify(&self, message: &str) {
        tracing::info!(target: "satchel::pipeline", "{message}");
    }
}
