//! Approval staging store
//!
//! Holds enriched events awaiting a human decision. The pending map is
//! mutated both by pipeline runs (staging) and by the approval surface
//! (approve/reject), so every read-modify-write sequence happens under
//! one lock. The commit call itself runs outside the lock - the decision
//! to approve was already made, and a slow calendar write must not block
//! concurrent staging.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use satchel_domain::constants::HISTORY_LIMIT;
use satchel_domain::{EnrichedEvent, EventStatus, HistoryEntry, Result, SatchelError};
use tracing::{debug, info};

use crate::ports::CalendarGateway;

struct Inner {
    /// Pending events in staging order (newest last).
    pending: Vec<EnrichedEvent>,
    /// Append-only history, newest last, bounded to [`HISTORY_LIMIT`].
    history: VecDeque<HistoryEntry>,
}

/// Identity-keyed staging store with a bounded history log.
pub struct StagingStore {
    inner: RwLock<Inner>,
    calendar: Arc<dyn CalendarGateway>,
}

impl StagingStore {
    pub fn new(calendar: Arc<dyn CalendarGateway>) -> Self {
        Self {
            inner: RwLock::new(Inner { pending: Vec::new(), history: VecDeque::new() }),
            calendar,
        }
    }

    /// Stage an event for approval.
    ///
    /// Idempotent by identity: re-staging an identity that is already
    /// pending leaves exactly one pending entry. A history record tagged
    /// pending is appended either way. Returns whether a new entry was
    /// inserted.
    pub fn stage(&self, event: EnrichedEvent) -> bool {
        let mut inner = self.inner.write();

        push_history(&mut inner.history, &event);

        if inner.pending.iter().any(|existing| existing.identity == event.identity) {
            debug!(identity = %event.identity, "already pending; staging skipped");
            return false;
        }

        info!(identity = %event.identity, title = %event.title, "event staged for approval");
        inner.pending.push(event);
        true
    }

    /// Pending events, most recently staged first.
    pub fn list_pending(&self) -> Vec<EnrichedEvent> {
        let inner = self.inner.read();
        inner.pending.iter().rev().cloned().collect()
    }

    /// History records, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let inner = self.inner.read();
        inner.history.iter().rev().cloned().collect()
    }

    /// Number of currently pending events.
    pub fn pending_count(&self) -> usize {
        self.inner.read().pending.len()
    }

    /// Approve a pending event and commit it to the calendar.
    ///
    /// The pending entry is removed before the commit; a commit failure
    /// is reported to the caller but not rolled back - the human decision
    /// stands, and the retry is manual.
    pub async fn approve(&self, identity: &str) -> Result<String> {
        let event = {
            let mut inner = self.inner.write();
            let index = inner
                .pending
                .iter()
                .position(|event| event.identity == identity)
                .ok_or_else(|| SatchelError::NotFound(format!("no pending event {identity}")))?;
            let mut event = inner.pending.remove(index);
            event.status = EventStatus::Approved;
            mark_history(&mut inner.history, identity, EventStatus::Approved);
            event
        };

        let link = self
            .calendar
            .commit(&event)
            .await
            .map_err(|err| SatchelError::Commit(err.to_string()))?;
        info!(identity = %identity, link = %link, "event committed to calendar");
        Ok(link)
    }

    /// Reject a pending event. A no-op when the identity is not pending
    /// (rejecting twice, or rejecting after approval, changes nothing).
    pub fn reject(&self, identity: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(index) = inner.pending.iter().position(|event| event.identity == identity) else {
            debug!(identity = %identity, "reject on unknown identity; no-op");
            return false;
        };
        inner.pending.remove(index);
        mark_history(&mut inner.history, identity, EventStatus::Rejected);
        info!(identity = %identity, "event rejected");
        true
    }
}

fn push_history(history: &mut VecDeque<HistoryEntry>, event: &EnrichedEvent) {
    history.push_back(HistoryEntry {
        identity: event.identity.clone(),
        title: event.title.clone(),
        status: EventStatus::Pending,
        recorded_at: Utc::now(),
    });
    while history.len() > HISTORY_LIMIT {
        history.pop_front();
    }
}

/// Terminal transitions rewrite the matching history entries rather than
/// appending a second row.
fn mark_history(history: &mut VecDeque<HistoryEntry>, identity: &str, status: EventStatus) {
    for entry in history.iter_mut().filter(|entry| entry.identity == identity) {
        entry.status = status;
    }
}
