use crate::config::RetryConfig;
use crate::processors::error::PipelineError;
use crate::utils::backoff::exponential_delay;
use rand::Rng;
use std::time::Duration;

/// Largest share of a delay added as jitter.
const JITTER_FRACTION: f64 = 0.1;

/// Decides whether a failed event gets another attempt, and when.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Retry only transient failures, and only while attempts remain.
    pub fn should_retry(&self, error: &PipelineError, retry_count: u32) -> bool {
        retry_count < self.config.max_retries && error.is_retryable()
    }

    /// Delay before the attempt following `retry_count`, jitter included.
    /// Never exceeds `max_delay`.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let delay = self.base_delay_for(retry_count);
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }
        let jitter = delay.mul_f64(rand::rng().random_range(0.0..=JITTER_FRACTION));
        (delay + jitter).min(self.config.max_delay)
    }

    /// `min(base * multiplier^retry_count, max_delay)`.
    pub fn base_delay_for(&self, retry_count: u32) -> Duration {
        exponential_delay(
            self.config.base_delay,
            self.config.backoff_multiplier,
            retry_count,
            self.config.max_delay,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use proptest::prelude::*;

    fn transient() -> PipelineError {
        StorageError::Transient("connection reset by peer".to_string()).into()
    }

    #[test]
    fn test_retry_requires_transient_error_and_remaining_attempts() {
        let policy = RetryPolicy::new(RetryConfig::default());
        assert!(policy.should_retry(&transient(), 0));
        assert!(policy.should_retry(&transient(), 2));
        assert!(!policy.should_retry(&transient(), 3));
        let permanent: PipelineError = StorageError::Permanent("syntax error".to_string()).into();
        assert!(!policy.should_retry(&permanent, 0));
    }

    #[test]
    fn test_delay_without_jitter() {
        let policy = RetryPolicy::new(RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        });
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::new(RetryConfig::default());
        for _ in 0..100 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_millis(2_200));
        }
    }

    proptest! {
        #[test]
        fn prop_jittered_delay_never_exceeds_max(retry in 0u32..40, max_ms in 1u64..60_000) {
            let policy = RetryPolicy::new(RetryConfig {
                max_delay: Duration::from_millis(max_ms),
                ..RetryConfig::default()
            });
            prop_assert!(policy.delay_for(retry) <= Duration::from_millis(max_ms));
            prop_assert!(policy.base_delay_for(retry) <= policy.base_delay_for(retry + 1));
        }
    }
}
