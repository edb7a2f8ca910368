//! # Satchel API
//!
//! HTTP application layer - routes and main entry point.
//!
//! This crate contains:
//! - The approval/status HTTP surface (axum)
//! - Application context (dependency injection)
//! - Main entry point and setup
//!
//! ## Architecture
//! - Depends on `satchel-domain`, `satchel-core`, and `satchel-infra`
//! - Wires the pipeline ports to their infrastructure implementations

pub mod context;
pub mod routes;
pub mod runlog;

pub use context::AppContext;
pub use routes::router;
pub use runlog::RunLog;
