//! Effectful parts of the pipeline: body streams, policies and transports.

mod auth;
mod body;
mod logging;
mod pipeline;
mod retry;
mod transport;

pub use auth::{BearerTokenPolicy, RequestSigner, SasPolicy, SigningPolicy, StaticToken, TokenCredential};
pub use body::{BodyStream, BoxStream};
pub use logging::{LoggingPolicy, redacted_headers};
pub use pipeline::{Next, Pipeline, Policy};
pub use retry::RetryPolicy;
pub use transport::{Transport, TransportPolicy};

#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
