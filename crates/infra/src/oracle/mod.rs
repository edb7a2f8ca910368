//! Extraction oracle integration (Gemini REST API)

pub mod client;
pub mod types;

pub use client::GeminiOracle;
pub use types::GeminiError;
