use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cumulo_http::{
    BearerTokenPolicy, Context, LoggingPolicy, Next, Pipeline, Policy, Request, Response, RetryPolicy, SasPolicy,
    SigningPolicy, Transport,
};

use crate::data::{ClientOptions, StorageCredential};
use crate::error::Result;

/// Stamps `x-ms-version` and a fresh `x-ms-date` on every attempt.
#[derive(Debug, Clone)]
pub struct StorageHeadersPolicy {
    api_version: String,
}

impl StorageHeadersPolicy {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
        }
    }
}

#[async_trait]
impl Policy for StorageHeadersPolicy {
    async fn send(&self, ctx: &Context, request: &mut Request, next: Next<'_>) -> cumulo_http::Result<Response> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let headers = request.headers_mut();
        headers.set("x-ms-version", self.api_version.as_str());
        headers.set("x-ms-date", date);
        next.run(ctx, request).await
    }
}

/// Assemble the policy chain every blob client sends through.
///
/// Order, outermost first: caller per-call policies, retry, storage headers,
/// caller per-retry policies, authentication, logging, transport. Anything
/// after the retry policy runs once per attempt.
pub fn build_pipeline(options: &ClientOptions, credential: &StorageCredential) -> Result<Pipeline> {
    let mut policies: Vec<Arc<dyn Policy>> = options.per_call_policies.clone();
    policies.push(Arc::new(RetryPolicy::new(options.retry.clone())));
    policies.push(Arc::new(StorageHeadersPolicy::new(options.api_version.clone())));
    policies.extend(options.per_retry_policies.iter().cloned());

    match credential {
        StorageCredential::Anonymous => {}
        StorageCredential::Sas(token) => policies.push(Arc::new(SasPolicy::new(token))),
        StorageCredential::Bearer(credential) => policies.push(Arc::new(BearerTokenPolicy::new(credential.clone()))),
        StorageCredential::Signer(signer) => policies.push(Arc::new(SigningPolicy::new(signer.clone()))),
    }
    policies.push(Arc::new(LoggingPolicy));

    Ok(Pipeline::new(policies, default_transport(options)?))
}

#[cfg(feature = "reqwest")]
fn default_transport(options: &ClientOptions) -> Result<Arc<dyn Transport>> {
    match &options.transport {
        Some(transport) => Ok(transport.clone()),
        None => Ok(Arc::new(cumulo_http::ReqwestTransport::new()?)),
    }
}

#[cfg(not(feature = "reqwest"))]
fn default_transport(options: &ClientOptions) -> Result<Arc<dyn Transport>> {
    options
        .transport
        .clone()
        .ok_or_else(|| crate::Error::precondition("no transport configured and the reqwest feature is disabled"))
}
