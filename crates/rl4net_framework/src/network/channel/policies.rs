use crate::utilities::configuration::BindRetryParams;

use std::time::Duration;

/// Configurable retry behavior with exponential backoff and jitter.
///
/// `max_attempts` counts every try, including the first one; `0` and `1` both
/// mean a single attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub add_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&BindRetryParams::default())
    }
}

impl From<&BindRetryParams> for RetryPolicy {
    fn from(params: &BindRetryParams) -> Self {
        Self {
            max_attempts: params.max_attempts,
            initial_delay: Duration::from_millis(params.initial_delay_ms),
            max_delay: Duration::from_millis(params.max_delay_ms),
            backoff_multiplier: params.backoff_multiplier,
            add_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);
        let mut delay_ms = base_delay.min(self.max_delay.as_millis() as f64);

        if self.add_jitter {
            // up to 25%
            let jitter = delay_ms * 0.25 * rand::random::<f64>();
            delay_ms += jitter;
        }

        Duration::from_millis(delay_ms as u64)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_jitter() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(300),
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = without_jitter();
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(300));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy {
            add_jitter: true,
            ..without_jitter()
        };
        for _ in 0..32 {
            let delay = policy.delay_for_attempt(2);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(125));
        }
    }

    #[test]
    fn attempts_include_the_first_try() {
        let policy = without_jitter();
        assert!(policy.should_retry(4));
        assert!(!policy.should_retry(5));
        assert!(!RetryPolicy::no_retries().should_retry(1));
    }

    #[test]
    fn built_from_config_params() {
        let policy = RetryPolicy::from(&BindRetryParams {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 40,
            backoff_multiplier: 1.5,
        });
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_millis(40));
    }
}
