use super::{rates, ui};
use crate::rate_client::RateClient;
use crate::scheduler::RefreshScheduler;
use anyhow::Result;
use chrono::Utc;
use tracing::debug;

/// Runs the scheduler in a loop, sleeping until each reported
/// `next_refresh_at`. This is the timer harness; the scheduler itself only
/// computes instants.
pub async fn run<C: RateClient>(
    scheduler: &RefreshScheduler<C>,
    display_currencies: &[String],
) -> Result<()> {
    loop {
        let spinner = ui::new_spinner("Fetching rates...");
        let result = scheduler.get_current_rates(Utc::now()).await;
        spinner.finish_and_clear();

        println!("{}\n", rates::display(&result, display_currencies));

        let wait = sleep_duration_until(result.next_refresh_at);
        debug!(?wait, "Sleeping until next refresh");
        tokio::time::sleep(wait).await;
    }
}

/// Clamped at one second so a `next_refresh_at` in the past cannot spin.
fn sleep_duration_until(next_refresh_at: chrono::DateTime<Utc>) -> std::time::Duration {
    (next_refresh_at - Utc::now())
        .to_std()
        .unwrap_or_default()
        .max(std::time::Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sleep_duration_is_clamped_for_past_instants() {
        let past = Utc::now() - Duration::minutes(10);
        assert_eq!(sleep_duration_until(past), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_duration_for_future_instant() {
        let future = Utc::now() + Duration::minutes(15);
        let wait = sleep_duration_until(future);
        assert!(wait > std::time::Duration::from_secs(14 * 60));
        assert!(wait <= std::time::Duration::from_secs(15 * 60));
    }
}
