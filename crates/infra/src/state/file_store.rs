//! File-backed run-state store.
//!
//! The record is tiny (one JSON object), so the whole file is rewritten
//! on every save. Writes go to a sibling temp file first and are renamed
//! into place; a crash mid-save leaves the previous record intact.

use std::path::PathBuf;

use async_trait::async_trait;
use satchel_core::RunStateStore;
use satchel_domain::{Result, RunState, SatchelError};
use tracing::{debug, warn};

use crate::errors::InfraError;

pub struct FileRunStateStore {
    path: PathBuf,
}

impl FileRunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RunStateStore for FileRunStateStore {
    /// A missing or unreadable record degrades to the default (which
    /// triggers the full backfill window) instead of blocking the run.
    async fn load(&self) -> Result<RunState> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no run-state record, starting fresh");
                return Ok(RunState::default());
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "run-state unreadable, starting fresh");
                return Ok(RunState::default());
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(state),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "run-state corrupt, starting fresh");
                Ok(RunState::default())
            }
        }
    }

    async fn save(&self, state: &RunState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|err| SatchelError::Internal(format!("run-state serialization: {err}")))?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, contents.as_bytes())
            .await
            .map_err(|err| SatchelError::from(InfraError::from(err)))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|err| SatchelError::from(InfraError::from(err)))?;

        debug!(path = %self.path.display(), "run-state saved");
        Ok(())
    }
}
