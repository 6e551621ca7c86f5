use crate::core::error::FetchError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One fetched and decoded set of exchange rates.
///
/// `observed_at` is the upstream publication time; `fetched_at` is when this
/// process retrieved it. Immutable once constructed, held in memory only.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub base_currency: String,
    pub rates: HashMap<String, f64>,
    pub observed_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

impl RateSnapshot {
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }
}

/// What one scheduling pass produced.
#[derive(Debug, Clone)]
pub enum ScheduleOutcome {
    /// Cached snapshot served unchanged, no upstream call made.
    Fresh(RateSnapshot),
    /// Upstream was called and returned a new snapshot.
    Refreshed(RateSnapshot),
    /// Upstream was called and failed. Any previously cached snapshot is
    /// preserved here so callers can keep displaying the last good rates.
    Failed {
        error: FetchError,
        message: &'static str,
        stale: Option<RateSnapshot>,
    },
}

impl ScheduleOutcome {
    /// The snapshot to display, if any — current or last known-good.
    pub fn snapshot(&self) -> Option<&RateSnapshot> {
        match self {
            ScheduleOutcome::Fresh(s) | ScheduleOutcome::Refreshed(s) => Some(s),
            ScheduleOutcome::Failed { stale, .. } => stale.as_ref(),
        }
    }
}

/// Result of one scheduling pass: the outcome plus the earliest instant the
/// caller should schedule again. The actual timer belongs to the caller.
#[derive(Debug, Clone)]
pub struct ScheduleResult {
    pub outcome: ScheduleOutcome,
    pub next_refresh_at: DateTime<Utc>,
}
