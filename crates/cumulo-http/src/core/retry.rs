use std::time::Duration;

/// Fraction of the exponential delay that jitter may add on top.
pub const JITTER_FRACTION: f64 = 0.2;

/// Exponential backoff without jitter or cap.
///
/// The delay formula is: `base * 2^retry_count`
///
/// # Arguments
///
/// * `retry_count` - Retries already performed (0 = delay before the first retry)
/// * `base` - The base delay duration
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cumulo_http::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// Backoff with jitter, capped at `max`.
///
/// `jitter_sample` is a value in `[0, 1)`; it stretches the exponential delay
/// by up to [`JITTER_FRACTION`]. Passing `0.0` disables jitter, which keeps
/// the function deterministic for callers that supply their own sample.
///
/// ```
/// use std::time::Duration;
/// use cumulo_http::backoff_delay;
///
/// let base = Duration::from_millis(800);
/// let max = Duration::from_secs(60);
/// assert_eq!(backoff_delay(1, base, max, 0.0), Duration::from_millis(1600));
/// assert_eq!(backoff_delay(30, base, max, 0.5), max);
/// ```
pub fn backoff_delay(retry_count: u32, base: Duration, max: Duration, jitter_sample: f64) -> Duration {
    let exp = retry_delay(retry_count, base);
    if exp >= max {
        return max;
    }
    let sample = jitter_sample.clamp(0.0, 1.0);
    let spread = exp.mul_f64(JITTER_FRACTION * sample);
    exp.saturating_add(spread).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_basic() {
        let base = Duration::from_millis(100);

        assert_eq!(retry_delay(0, base), Duration::from_millis(100));
        assert_eq!(retry_delay(1, base), Duration::from_millis(200));
        assert_eq!(retry_delay(2, base), Duration::from_millis(400));
        assert_eq!(retry_delay(3, base), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_delay_zero_base() {
        let base = Duration::ZERO;
        assert_eq!(retry_delay(0, base), Duration::ZERO);
        assert_eq!(retry_delay(10, base), Duration::ZERO);
    }

    #[test]
    fn test_retry_delay_saturates() {
        let base = Duration::from_secs(u64::MAX / 2);
        assert_eq!(retry_delay(40, base), Duration::MAX);
    }

    #[test]
    fn test_backoff_without_jitter_is_exponential() {
        let base = Duration::from_millis(800);
        let max = Duration::from_secs(60);
        assert_eq!(backoff_delay(0, base, max, 0.0), Duration::from_millis(800));
        assert_eq!(backoff_delay(2, base, max, 0.0), Duration::from_millis(3200));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let base = Duration::from_millis(1000);
        let max = Duration::from_secs(60);
        assert_eq!(backoff_delay(0, base, max, 0.5), Duration::from_millis(1100));

        let high = backoff_delay(0, base, max, 0.999);
        assert!(high >= base && high < Duration::from_millis(1200));
    }

    #[test]
    fn test_backoff_out_of_range_sample_is_clamped() {
        let base = Duration::from_millis(1000);
        let max = Duration::from_secs(60);
        assert_eq!(backoff_delay(0, base, max, -3.0), base);
        assert_eq!(backoff_delay(0, base, max, 7.0), Duration::from_millis(1200));
    }

    #[test]
    fn test_backoff_is_capped() {
        let base = Duration::from_millis(800);
        let max = Duration::from_secs(5);
        assert_eq!(backoff_delay(2, base, max, 0.0), Duration::from_millis(3200));
        assert_eq!(backoff_delay(3, base, max, 0.0), max);
        assert_eq!(backoff_delay(3, base, max, 0.9), max);
        assert_eq!(backoff_delay(u32::MAX, base, max, 0.0), max);
    }
}
