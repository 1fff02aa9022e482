//! Request/response model and policy pipeline for blob storage clients.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Requests, responses, headers, cancellation context and options
//! - [`core`] - Pure transformations (backoff, status classes, range headers)
//! - [`effects`] - Body streams, the policy chain and the network transport
//!
//! # Key Features
//!
//! - **Ordered policies**: every request walks the same chain of policies, the
//!   last of which is always the transport
//! - **Per-request retry budget**: retry state lives on the request, so one
//!   pipeline can be shared by any number of concurrent callers
//! - **Owned body streams**: a response body is moved, never copied, until the
//!   final consumer drains or drops it

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::{ByteRange, ContentRange, StatusClass, backoff_delay, redact_url, retry_delay};
pub use data::{Context, Headers, Method, Request, RequestBody, Response, RetryOptions};
pub use effects::{
    BearerTokenPolicy, BodyStream, BoxStream, LoggingPolicy, Next, Pipeline, Policy, RequestSigner,
    RetryPolicy, SasPolicy, SigningPolicy, StaticToken, TokenCredential, Transport,
    TransportPolicy,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;

pub use error::{Error, Result};
