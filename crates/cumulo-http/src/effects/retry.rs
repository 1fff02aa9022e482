use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use super::pipeline::{Next, Policy};
use crate::core::{backoff_delay, is_throttled};
use crate::data::{Context, Request, Response, RetryOptions};
use crate::error::Result;

/// Re-runs the rest of the chain on transient failures.
///
/// Each attempt either succeeds, fails terminally, or is scheduled for a
/// retry after a backoff sleep. The retry count lives on the request, so one
/// policy instance serves any number of concurrent requests.
///
/// Only idempotent requests with a replayable body are retried. When the
/// budget runs out the last response or error is returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    options: RetryOptions,
}

impl RetryPolicy {
    pub fn new(options: RetryOptions) -> Self { Self { options } }

    pub fn options(&self) -> &RetryOptions { &self.options }

    fn retry_reason(&self, outcome: &Result<Response>) -> Option<String> {
        match outcome {
            Ok(response) if self.options.is_retry_status(response.status()) => {
                let kind = if is_throttled(response.status()) { "throttled" } else { "status" };
                Some(format!("{kind} {}", response.status()))
            }
            Ok(_) => None,
            Err(e) if e.is_retryable() => Some(e.to_string()),
            Err(_) => None,
        }
    }

    /// Delay before retry `retry_count + 1`. A server hint wins over the
    /// computed backoff; both are capped at `max_delay`.
    fn delay(&self, retry_count: u32, response: Option<&Response>) -> Duration {
        if let Some(hint) = response.and_then(server_retry_hint) {
            return hint.min(self.options.max_delay);
        }
        let sample = if self.options.jitter { rand::thread_rng().r#gen::<f64>() } else { 0.0 };
        backoff_delay(retry_count, self.options.base_delay, self.options.max_delay, sample)
    }
}

fn server_retry_hint(response: &Response) -> Option<Duration> {
    let headers = response.headers();
    for name in ["retry-after-ms", "x-ms-retry-after-ms"] {
        if let Some(ms) = headers.get(name).and_then(|v| v.trim().parse().ok()) {
            return Some(Duration::from_millis(ms));
        }
    }
    headers
        .get("Retry-After")
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl Policy for RetryPolicy {
    async fn send(&self, ctx: &Context, request: &mut Request, next: Next<'_>) -> Result<Response> {
        loop {
            let outcome = next.run(ctx, request).await;
            let Some(reason) = self.retry_reason(&outcome) else {
                return outcome;
            };

            let retry_count = request.retry_count();
            if retry_count >= self.options.max_retries || !request.is_idempotent() || !request.is_replayable() {
                return outcome;
            }

            let delay = self.delay(retry_count, outcome.as_ref().ok());
            // Release the failed body before waiting.
            drop(outcome);
            warn!(
                method = %request.method(),
                attempt = retry_count + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                reason = %reason,
                "retrying request"
            );
            ctx.sleep(delay).await?;
            request.set_retry_count(retry_count + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_hint_takes_precedence() {
        let policy = RetryPolicy::new(RetryOptions::default().jitter(false));
        let mut response = Response::new(503, "Server Busy");
        response.add_header("x-ms-retry-after-ms", "250");
        assert_eq!(policy.delay(2, Some(&response)), Duration::from_millis(250));

        let mut response = Response::new(429, "Too Many Requests");
        response.add_header("Retry-After", "600");
        assert_eq!(policy.delay(0, Some(&response)), Duration::from_secs(60));
    }

    #[test]
    fn test_delay_without_hint_is_backoff() {
        let policy = RetryPolicy::new(RetryOptions::default().jitter(false));
        assert_eq!(policy.delay(1, None), Duration::from_millis(1600));
    }

    #[test]
    fn test_reason_classification() {
        let policy = RetryPolicy::default();
        assert!(policy.retry_reason(&Ok(Response::new(500, "Internal"))).is_some());
        assert!(policy.retry_reason(&Ok(Response::new(404, "Not Found"))).is_none());
        assert!(policy.retry_reason(&Ok(Response::new(200, "OK"))).is_none());
        assert!(policy.retry_reason(&Err(crate::Error::Cancelled)).is_none());
    }
}
