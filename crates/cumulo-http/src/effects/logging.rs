use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::pipeline::{Next, Policy};
use crate::core::redact_url;
use crate::data::{Context, Headers, Request, Response};
use crate::error::Result;

const REDACTED_HEADERS: [&str; 2] = ["authorization", "x-ms-copy-source-authorization"];

/// Emits one `debug` event per attempt with the outcome and timing.
///
/// Signatures in the URL and credential headers never reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPolicy;

/// Header pairs safe to log.
pub fn redacted_headers(headers: &Headers) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let secret = REDACTED_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h));
            (name.to_owned(), if secret { "REDACTED".to_owned() } else { value.to_owned() })
        })
        .collect()
}

#[async_trait]
impl Policy for LoggingPolicy {
    async fn send(&self, ctx: &Context, request: &mut Request, next: Next<'_>) -> Result<Response> {
        let method = request.method();
        let url = redact_url(request.url());
        let attempt = request.retry_count() + 1;
        trace!(%method, %url, headers = ?redacted_headers(request.headers()), "sending request");

        let started = Instant::now();
        let outcome = next.run(ctx, request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            Ok(response) => debug!(
                %method,
                %url,
                attempt,
                status = response.status(),
                elapsed_ms,
                "request completed"
            ),
            Err(e) => debug!(%method, %url, attempt, elapsed_ms, error = %e, "request failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_headers() {
        let headers: Headers = [("Authorization", "Bearer abc"), ("x-ms-version", "2021-08-06")]
            .into_iter()
            .collect();
        let shown = redacted_headers(&headers);
        assert_eq!(shown[0], ("Authorization".to_owned(), "REDACTED".to_owned()));
        assert_eq!(shown[1].1, "2021-08-06");
    }
}
