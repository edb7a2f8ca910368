//! Core pipeline data types
//!
//! The three event shapes mirror the pipeline stages: a `RawItem` comes
//! out of a source adapter, an `ExtractedEvent` out of the oracle (or the
//! fallback extractor), and an `EnrichedEvent` out of the normalizer on
//! its way into the staging store.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLOR_ID, PRIORITY_COLOR_ID};

/// Origin of a raw candidate notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Email,
    Portal,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Email => write!(f, "email"),
            SourceKind::Portal => write!(f, "portal"),
        }
    }
}

/// One candidate notice pulled from a source adapter.
///
/// Immutable once created; consumed exactly once by the normalizer.
/// `body` is plain text - HTML is stripped at the adapter boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    /// Provider-native identifier, stable within its source when present
    /// (e.g. a mail message id). Portal pages usually supply none.
    pub id: Option<String>,
    pub title: String,
    pub body: String,
    pub source: SourceKind,
}

/// Structured event as produced by the extraction oracle or the
/// regex fallback. Timestamps are naive local times; the calendar
/// timezone is implied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub title: String,
    pub start_time: NaiveDateTime,
    /// Defaults to `start_time + 1h` during enrichment when absent.
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Household-member labels the oracle believes are concerned.
    /// Advisory only - the heuristic classifier is authoritative.
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Priority marker carried through to the calendar provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Default,
    Priority,
}

impl ColorTag {
    /// Provider color id for this tag.
    pub fn provider_id(&self) -> &'static str {
        match self {
            ColorTag::Default => DEFAULT_COLOR_ID,
            ColorTag::Priority => PRIORITY_COLOR_ID,
        }
    }
}

/// Approval state machine: `pending -> {approved, rejected}`, both
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

/// Fully enriched event awaiting human approval.
///
/// Owned exclusively by the staging store once staged; the normalizer
/// constructs it and hands it off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedEvent {
    /// Stable identity used for dedup across runs (provider id when the
    /// source supplies one, synthesized otherwise).
    pub identity: String,
    /// Display title: subject tags plus costume/conflict markers.
    pub title: String,
    /// Description with gift reminder and conflict notices applied.
    pub description: String,
    pub location: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub color_tag: ColorTag,
    pub source: SourceKind,
    pub source_url: Option<String>,
    pub status: EventStatus,
    pub discovered_at: DateTime<Utc>,
}

/// Append-only staging history record, bounded to the most recent 50.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub identity: String,
    pub title: String,
    pub status: EventStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Persisted run bookkeeping: the single record behind the incremental
/// scan policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// Epoch seconds of the last pipeline run that completed without a
    /// fatal error. `None` means the pipeline has never completed.
    #[serde(default)]
    pub last_run_timestamp: Option<i64>,
}

/// Whether a pipeline run is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Idle,
    Running,
}

/// Per-run summary returned by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Raw items collected across all source adapters.
    pub scanned: usize,
    /// Events staged for approval.
    pub staged: usize,
    /// Items skipped by the relevance gate without an oracle call.
    pub ignored: usize,
    /// Items where neither the oracle nor the fallback found a date.
    pub missed: usize,
    /// Item-level failures (logged, non-fatal).
    pub failures: usize,
}
