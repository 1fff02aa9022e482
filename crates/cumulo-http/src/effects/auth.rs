use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::pipeline::{Next, Policy};
use crate::data::{Context, Request, Response};
use crate::error::{Error, Result};

/// Adds authentication to a fully built request.
///
/// How the signature is derived is up to the implementation; the pipeline
/// only calls it once per attempt, after every header is in place.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: &mut Request) -> Result<()>;
}

/// Source of bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self, ctx: &Context) -> Result<String>;
}

/// A fixed token, for tests and short-lived tools.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("StaticToken(REDACTED)") }
}

#[async_trait]
impl TokenCredential for StaticToken {
    async fn token(&self, _ctx: &Context) -> Result<String> { Ok(self.0.clone()) }
}

/// Sets `Authorization: Bearer <token>` on every attempt.
pub struct BearerTokenPolicy {
    credential: Arc<dyn TokenCredential>,
}

impl BearerTokenPolicy {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self { Self { credential } }
}

#[async_trait]
impl Policy for BearerTokenPolicy {
    async fn send(&self, ctx: &Context, request: &mut Request, next: Next<'_>) -> Result<Response> {
        if request.url().scheme() != "https" {
            return Err(Error::precondition("bearer tokens require an https endpoint"));
        }
        let token = self.credential.token(ctx).await?;
        request.headers_mut().set("Authorization", format!("Bearer {token}"));
        next.run(ctx, request).await
    }
}

/// Merges a shared access signature into the query string.
///
/// Existing parameters with the same names are replaced, so running the
/// policy again on a retried request leaves the URL unchanged.
#[derive(Clone)]
pub struct SasPolicy {
    pairs: Vec<(String, String)>,
}

impl fmt::Debug for SasPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.pairs.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("SasPolicy").field("keys", &keys).finish()
    }
}

impl SasPolicy {
    /// Accepts the token with or without a leading `?`.
    pub fn new(token: &str) -> Self {
        let token = token.trim().trim_start_matches('?');
        let pairs = url::form_urlencoded::parse(token.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    pub fn apply(&self, request: &mut Request) {
        let url = request.url_mut();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !self.pairs.iter().any(|(sas, _)| sas == k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .extend_pairs(self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
}

#[async_trait]
impl Policy for SasPolicy {
    async fn send(&self, ctx: &Context, request: &mut Request, next: Next<'_>) -> Result<Response> {
        self.apply(request);
        next.run(ctx, request).await
    }
}

/// Runs a caller-supplied [`RequestSigner`] on every attempt.
pub struct SigningPolicy {
    signer: Arc<dyn RequestSigner>,
}

impl SigningPolicy {
    pub fn new(signer: Arc<dyn RequestSigner>) -> Self { Self { signer } }
}

#[async_trait]
impl Policy for SigningPolicy {
    async fn send(&self, ctx: &Context, request: &mut Request, next: Next<'_>) -> Result<Response> {
        self.signer.sign(request)?;
        next.run(ctx, request).await
    }
}
