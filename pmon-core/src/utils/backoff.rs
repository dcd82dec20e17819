use std::time::Duration;

/// Delay before the first reconnect attempt.
const RECONNECT_BASE_MS: u64 = 1_000;
/// Upper bound of the reconnect delay.
const RECONNECT_MAX_MS: u64 = 30_000;

/// Returns the delay before the next reconnect, `min(1000 * 2^attempts, 30000)` ms.
pub fn reconnect_delay(attempts: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempts);
    Duration::from_millis(RECONNECT_BASE_MS.saturating_mul(factor).min(RECONNECT_MAX_MS))
}

/// Returns `min(base * multiplier^retry_count, max)` without jitter.
pub fn exponential_delay(base: Duration, multiplier: f64, retry_count: u32, max: Duration) -> Duration {
    let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
    let millis = base.as_millis() as f64 * multiplier.powi(exponent);
    let cap = max.as_millis() as f64;
    if !millis.is_finite() || millis >= cap {
        return max;
    }
    Duration::from_millis(millis.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reconnect_delay_calculation() {
        assert_eq!(reconnect_delay(0), Duration::from_secs(1));
        assert_eq!(reconnect_delay(1), Duration::from_secs(2));
        assert_eq!(reconnect_delay(2), Duration::from_secs(4));
        assert_eq!(reconnect_delay(4), Duration::from_secs(16));
        // Capped at 30s from the fifth attempt on
        assert_eq!(reconnect_delay(5), Duration::from_secs(30));
        assert_eq!(reconnect_delay(64), Duration::from_secs(30));
        assert_eq!(reconnect_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        assert_eq!(exponential_delay(base, 2.0, 0, max), Duration::from_secs(1));
        assert_eq!(exponential_delay(base, 2.0, 3, max), Duration::from_secs(8));
        assert_eq!(exponential_delay(base, 2.0, 10, max), max);
        assert_eq!(exponential_delay(base, 1.0, 10, max), base);
    }

    proptest! {
        #[test]
        fn prop_exponential_delay_is_monotonic_and_capped(
            base_ms in 1u64..5_000,
            multiplier in 1.0f64..4.0,
            max_ms in 1u64..120_000,
            retry in 0u32..64,
        ) {
            let base = Duration::from_millis(base_ms);
            let max = Duration::from_millis(max_ms);
            let current = exponential_delay(base, multiplier, retry, max);
            let next = exponential_delay(base, multiplier, retry + 1, max);
            prop_assert!(current <= next);
            prop_assert!(next <= max);
        }

        #[test]
        fn prop_reconnect_delay_is_monotonic(attempts in 0u32..1_000) {
            prop_assert!(reconnect_delay(attempts) <= reconnect_delay(attempts + 1));
            prop_assert!(reconnect_delay(attempts) <= Duration::from_millis(RECONNECT_MAX_MS));
        }
    }
}
