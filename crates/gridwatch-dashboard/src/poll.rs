//! Fixed-interval poll ticker

use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::warn;

/// Floor for the configured interval
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Fires once immediately, then every interval. Late ticks are not
/// bunched up: a slow loop just polls less often.
pub struct PollTicker {
    interval: Interval,
}

impl PollTicker {
    pub fn new(period: Duration) -> Self {
        let period = if period < MIN_INTERVAL {
            warn!(
                requested_ms = period.as_millis() as u64,
                "Poll interval too short, using minimum"
            );
            MIN_INTERVAL
        } else {
            period
        };
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
