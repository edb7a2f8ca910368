//! # Satchel Core
//!
//! Pure pipeline logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The heuristic classifier (subject labels, gift/costume flags,
//!   regex fallback extraction)
//! - The event normalizer/enricher
//! - The approval staging store and its state machine
//! - The run-state lookback policy
//! - The pipeline orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `satchel-domain`
//! - No HTTP, filesystem, or provider code
//! - All external collaborators behind port traits
//! - Pure, testable business logic

pub mod classify;
pub mod enrich;
pub mod pipeline;
pub mod ports;
pub mod runstate;
pub mod staging;

// Re-export specific items to avoid ambiguity
pub use classify::fallback::extract_fallback;
pub use classify::flags::{needs_costume, needs_gift};
pub use classify::subjects::{SubjectMatcher, SubjectOutcome};
pub use enrich::Enricher;
pub use pipeline::PipelineService;
pub use ports::{
    CalendarGateway, ExtractionOracle, PipelineObserver, RunStateStore, SourceAdapter,
};
pub use runstate::{LookbackPolicy, RunStateTracker};
pub use staging::StagingStore;
