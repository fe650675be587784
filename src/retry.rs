//! Exponential backoff with jitter for adapter retries.

use std::time::Duration;

/// Backoff schedule between retries of a failed adapter call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// The initial backoff duration.
    pub base: Duration,
    /// The multiplicative factor for each subsequent retry.
    pub factor: f64,
    /// The maximum duration to wait between retries.
    pub max: Duration,
    /// Whether to apply random jitter (+/- 50%) to the delay.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(3),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let scale = self.factor.powi(attempt as i32);
        let seconds = self.base.as_secs_f64() * scale;
        let capped = seconds.min(self.max.as_secs_f64());
        let mut delay = Duration::from_secs_f64(capped);

        if self.jitter {
            let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
            if jitter_ms > 0 {
                let offset = rand::random::<u64>() % (jitter_ms * 2 + 1);
                let total_ms = delay.as_millis() as i64 + (offset as i64 - jitter_ms as i64);
                delay = Duration::from_millis(total_ms.max(0) as u64);
            }
        }

        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> Backoff {
        Backoff {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        }
    }

    #[test]
    fn delay_grows_exponentially_until_cap() {
        let backoff = no_jitter();
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(10), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_half_delay() {
        let backoff = Backoff {
            jitter: true,
            ..no_jitter()
        };
        for attempt in 0..4 {
            let nominal = no_jitter().delay(attempt).as_millis() as i64;
            let jittered = backoff.delay(attempt).as_millis() as i64;
            assert!((jittered - nominal).abs() <= nominal / 2 + 1);
        }
    }
}
