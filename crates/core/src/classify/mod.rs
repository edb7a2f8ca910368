//! Heuristic rule engine
//!
//! One shared classifier invoked by both the pre-oracle relevance gate
//! and the enrichment path, so subject labeling behaves identically
//! everywhere it is evaluated.

pub mod fallback;
pub mod flags;
pub mod subjects;
