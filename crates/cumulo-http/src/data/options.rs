use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry configuration for the pipeline's retry policy.
///
/// # Examples
///
/// ```
/// use cumulo_http::RetryOptions;
/// use std::time::Duration;
///
/// let options = RetryOptions::default()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(200))
///     .jitter(false);
/// assert_eq!(options.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Retries after the initial attempt. Total attempts = 1 + max_retries.
    ///
    /// Default: 3
    pub max_retries: u32,

    /// Delay before the first retry; doubled for every retry after it.
    ///
    /// Default: 800ms
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,

    /// Upper bound on any single backoff, including server-requested ones.
    ///
    /// Default: 60s
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,

    /// Add up to 20% random spread to each computed delay.
    ///
    /// Default: true
    pub jitter: bool,

    /// Response statuses treated as transient.
    ///
    /// Default: 408, 429, 500, 502, 503, 504
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries:    3,
            base_delay:     Duration::from_millis(800),
            max_delay:      Duration::from_secs(60),
            jitter:         true,
            retry_statuses: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryOptions {
    /// Options that never retry.
    pub fn none() -> Self { Self::default().max_retries(0) }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn retry_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_statuses = statuses.into_iter().collect();
        self
    }

    pub fn is_retry_status(&self, status: u16) -> bool { self.retry_statuses.contains(&status) }
}

/// Serialize a [`Duration`] as whole milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
