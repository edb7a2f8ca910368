//! Domain constants
//!
//! Marker strings and provider color ids are part of the calendar-facing
//! contract: they must stay byte-stable across runs so re-staged events
//! render identically.

/// Reminder line prepended to descriptions when the gift heuristic fires.
pub const GIFT_REMINDER: &str = "🎁 REMINDER: BUY GIFT!";

/// Title prefix for events that require a costume or dress-up.
pub const COSTUME_PREFIX: &str = "⚠️ COSTUME: ";

/// Title prefix for events that overlap an existing calendar entry.
pub const CONFLICT_PREFIX: &str = "⚠️ CLASH: ";

/// Provider color id for ordinary events (lavender).
pub const DEFAULT_COLOR_ID: &str = "1";

/// Provider color id for high-priority events (red).
pub const PRIORITY_COLOR_ID: &str = "11";

/// Calendar timezone implied by all naive event timestamps.
pub const CALENDAR_TIMEZONE: &str = "Europe/London";

/// Maximum number of staging history entries retained (oldest evicted).
pub const HISTORY_LIMIT: usize = 50;

/// Maximum number of run-log lines retained by the progress observer.
pub const RUN_LOG_LIMIT: usize = 50;

/// Lookback window for the very first run, in days (~6 months).
pub const DEFAULT_BACKFILL_DAYS: i64 = 180;

/// Default start-of-day hour when the fallback extractor finds no time.
pub const DEFAULT_START_HOUR: u32 = 9;

/// Default event duration when no end time is known, in minutes.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Pause between consecutive oracle calls, in milliseconds (quota pacing).
pub const ORACLE_CALL_DELAY_MS: u64 = 2_000;

/// Default pipeline schedule: every 6 hours.
pub const DEFAULT_CRON: &str = "0 0 */6 * * *";

/// Organizational label applied when no household member matched but an
/// override keyword kept the item relevant.
pub const DEFAULT_ORG_LABEL: &str = "School";

/// Label for items flagged by the nursery marker keyword.
pub const NURSERY_LABEL: &str = "Nursery";

/// Marker keyword that earns the nursery label on its own.
pub const NURSERY_MARKER: &str = "nursery";

/// Operational override terms that force inclusion even with no named
/// subject (whole-school notices).
pub const OPERATIONAL_TERMS: &[&str] = &["office", "closing", "closed"];

/// Name fragments shorter than this require a surname co-occurrence to
/// count as a match (guards 3-letter nicknames like "Ben").
pub const SHORT_FRAGMENT_LEN: usize = 4;
