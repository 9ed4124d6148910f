use std::time::Duration;
use tracing::debug;

use super::domain::Strategy;

pub const SINGLE_EMPLOYER_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

/// Delay observed after each (source, keyword) fetch. A non-zero override
/// replaces every per-strategy interval; a zero override counts as unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    override_interval: Option<Duration>,
}

impl PacingPolicy {
    pub fn new(override_interval: Option<Duration>) -> Self {
        Self {
            override_interval: override_interval.filter(|interval| !interval.is_zero()),
        }
    }

    pub fn interval(&self, strategy: Strategy) -> Duration {
        self.override_interval.unwrap_or(if strategy.is_single_employer() {
            SINGLE_EMPLOYER_INTERVAL
        } else {
            DEFAULT_INTERVAL
        })
    }

    pub async fn pause(&self, strategy: Strategy) {
        let interval = self.interval(strategy);
        debug!(%strategy, delay_ms = interval.as_millis() as u64, "pacing before next request");
        tokio::time::sleep(interval).await;
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn single_employer_sources_wait_longer() {
        let policy = PacingPolicy::default();
        assert_eq!(policy.interval(Strategy::Microsoft), Duration::from_secs(5));
        assert_eq!(policy.interval(Strategy::Amazon), Duration::from_secs(5));
        assert_eq!(policy.interval(Strategy::Generic), Duration::from_secs(2));
    }

    #[test]
    fn override_applies_to_every_strategy() {
        let policy = PacingPolicy::new(Some(Duration::from_millis(750)));
        for strategy in Strategy::ordered() {
            assert_eq!(policy.interval(strategy), Duration::from_millis(750));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pause_sleeps_for_the_interval() {
        let started = Instant::now();
        PacingPolicy::default().pause(Strategy::Generic).await;
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_override_falls_back_to_strategy_defaults() {
        let policy = PacingPolicy::new(Some(Duration::ZERO));
        assert_eq!(policy, PacingPolicy::default());
        assert_eq!(policy.interval(Strategy::Microsoft), Duration::from_secs(5));
        assert_eq!(policy.interval(Strategy::Generic), Duration::from_secs(2));

        let started = Instant::now();
        policy.pause(Strategy::Microsoft).await;
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }
}
