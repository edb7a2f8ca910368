//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Satchel
///
/// Variants follow the pipeline failure taxonomy: source scans, oracle
/// calls and conflict checks are isolated failures; only `Auth` at the
/// start of a run is fatal to that run.
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SatchelError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("No event detected: {0}")]
    ExtractionMiss(String),

    #[error("Conflict check error: {0}")]
    ConflictCheck(String),

    #[error("Calendar commit error: {0}")]
    Commit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Satchel operations
pub type Result<T> = std::result::Result<T, SatchelError>;
