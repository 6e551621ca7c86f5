//! Hour-bucket refresh scheduling over a [`RateClient`].
//!
//! A snapshot is considered current while `now` stays in the same UTC hour
//! bucket as its observation time and a fetch attempt happened within the
//! last five minutes. Otherwise exactly one upstream call is made. The
//! scheduler never owns a timer; each pass reports the earliest instant the
//! caller should invoke it again.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::snapshot::{RateSnapshot, ScheduleOutcome, ScheduleResult};
use crate::rate_client::RateClient;

/// A cached snapshot older than this is stale even inside its hour bucket.
const FRESH_WINDOW: Duration = Duration::minutes(5);
/// Offset past the hour boundary, covering upstream publication lag.
const PUBLISH_GRACE: Duration = Duration::minutes(2);
/// Fixed retry delay after a failed fetch. No jitter, no growth.
const RETRY_BACKOFF: Duration = Duration::minutes(15);

/// UTC day plus hour-of-day. Comparing both fields keeps buckets distinct
/// across midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HourBucket {
    day: NaiveDate,
    hour: u32,
}

fn hour_bucket(t: DateTime<Utc>) -> HourBucket {
    HourBucket {
        day: t.date_naive(),
        hour: t.hour(),
    }
}

fn hour_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive()
        .and_hms_opt(t.hour(), 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(t)
}

fn next_success_refresh(now: DateTime<Utc>) -> DateTime<Utc> {
    hour_floor(now) + Duration::hours(1) + PUBLISH_GRACE
}

#[derive(Debug, Default)]
struct SchedulerState {
    last_snapshot: Option<RateSnapshot>,
    last_attempt_at: Option<DateTime<Utc>>,
}

impl SchedulerState {
    /// The cached snapshot, if it is still current at `now`: same UTC hour
    /// bucket as its observation time, and a fetch attempt within the fresh
    /// window. Both conditions are checked independently.
    fn fresh_snapshot(&self, now: DateTime<Utc>) -> Option<&RateSnapshot> {
        let snapshot = self.last_snapshot.as_ref()?;
        if hour_bucket(snapshot.observed_at) != hour_bucket(now) {
            return None;
        }
        let attempted_at = self.last_attempt_at?;
        (now - attempted_at < FRESH_WINDOW).then_some(snapshot)
    }
}

/// Decides per call whether to serve the cached snapshot or refetch, and
/// owns the cached state. Safe to share behind an `Arc`: the lock is held
/// across the decision and the fetch, so concurrent callers cannot trigger
/// duplicate upstream calls.
pub struct RefreshScheduler<C> {
    client: C,
    base_currency: String,
    state: Mutex<SchedulerState>,
}

impl<C: RateClient> RefreshScheduler<C> {
    pub fn new(client: C, base_currency: &str) -> Self {
        Self {
            client,
            base_currency: base_currency.to_string(),
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// One scheduling pass at time `now`.
    ///
    /// Fresh: the cached snapshot is returned unchanged. Stale: the client
    /// is invoked exactly once; on failure the cached snapshot is kept and
    /// returned alongside the mapped error message.
    pub async fn get_current_rates(&self, now: DateTime<Utc>) -> ScheduleResult {
        let mut state = self.state.lock().await;

        if let Some(snapshot) = state.fresh_snapshot(now) {
            debug!("Serving cached snapshot");
            return ScheduleResult {
                outcome: ScheduleOutcome::Fresh(snapshot.clone()),
                next_refresh_at: next_success_refresh(now),
            };
        }

        debug!("Snapshot stale, fetching from upstream");
        state.last_attempt_at = Some(now);

        match self.client.fetch(&self.base_currency, now).await {
            Ok(snapshot) => {
                state.last_snapshot = Some(snapshot.clone());
                ScheduleResult {
                    outcome: ScheduleOutcome::Refreshed(snapshot),
                    next_refresh_at: next_success_refresh(now),
                }
            }
            Err(error) => {
                warn!(error = %error, "Rate fetch failed, keeping last snapshot");
                ScheduleResult {
                    outcome: ScheduleOutcome::Failed {
                        message: error.user_message(),
                        error,
                        stale: state.last_snapshot.clone(),
                    },
                    next_refresh_at: now + RETRY_BACKOFF,
                }
            }
        }
    }

    /// The last successfully fetched snapshot, if any.
    pub async fn last_snapshot(&self) -> Option<RateSnapshot> {
        self.state.lock().await.last_snapshot.clone()
    }
}
