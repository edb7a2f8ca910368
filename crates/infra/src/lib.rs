//! # Satchel Infrastructure
//!
//! Infrastructure implementations of core pipeline ports.
//!
//! This crate contains:
//! - The retrying HTTP client
//! - External service integrations (mail source, portal agent, extraction
//!   oracle, calendar gateway)
//! - File-backed run-state persistence
//! - Configuration loading (env + file probing)
//! - The cron pipeline scheduler
//!
//! ## Architecture
//! - Implements the port traits defined in `satchel-core`
//! - Contains all "impure" code (network, filesystem, clock schedules)

pub mod calendar;
pub mod config;
pub mod errors;
pub mod http;
pub mod oracle;
pub mod scheduling;
pub mod sources;
pub mod state;

pub use calendar::CalendarClient;
pub use errors::InfraError;
pub use http::HttpClient;
pub use oracle::GeminiOracle;
pub use scheduling::{PipelineJob, PipelineScheduler, SchedulerError};
pub use sources::{MailAdapter, PortalAdapter};
pub use state::FileRunStateStore;
