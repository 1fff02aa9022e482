use std::sync::Arc;

use async_trait::async_trait;

use super::pipeline::{Next, Policy};
use crate::data::{Context, Request, Response};
use crate::error::Result;

/// Network boundary of the pipeline.
///
/// Implementations send one attempt of a request and return the status,
/// headers and an unread body stream. They should not retry on their own.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: Production implementation using `reqwest`
/// - Mock implementations for testing
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, ctx: &Context, request: &mut Request) -> Result<Response>;
}

/// Terminal policy that hands the request to a [`Transport`].
pub struct TransportPolicy {
    transport: Arc<dyn Transport>,
}

impl TransportPolicy {
    pub fn new(transport: Arc<dyn Transport>) -> Self { Self { transport } }
}

#[async_trait]
impl Policy for TransportPolicy {
    async fn send(&self, ctx: &Context, request: &mut Request, _next: Next<'_>) -> Result<Response> {
        ctx.run(self.transport.send(ctx, request)).await
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;
    use reqwest::header::CONTENT_LENGTH;

    use super::*;
    use crate::data::{Method, RequestBody};
    use crate::effects::BodyStream;
    use crate::error::Error;

    /// Production transport using reqwest.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Result<Self> {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| Error::transport("failed to build HTTP client", e))?;
            Ok(Self { client })
        }

        pub fn with_client(client: reqwest::Client) -> Self { Self { client } }
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn send(&self, _ctx: &Context, request: &mut Request) -> Result<Response> {
            let method = request.method();
            let mut builder = self.client.request(to_reqwest_method(method), request.url().clone());
            for (name, value) in request.headers().iter() {
                builder = builder.header(name, value);
            }
            builder = match request.take_body() {
                RequestBody::Empty => builder,
                RequestBody::Bytes(bytes) => builder.body(bytes),
                RequestBody::Stream(stream) => {
                    let length = stream.length();
                    let builder = builder.body(reqwest::Body::wrap_stream(stream.into_stream()));
                    match length {
                        Some(length) => builder.header(CONTENT_LENGTH, length),
                        None => builder,
                    }
                }
            };

            let reply = builder
                .send()
                .await
                .map_err(|e| Error::transport(format!("{method} request failed"), e))?;

            let status = reply.status();
            let mut response = Response::new(status.as_u16(), status.canonical_reason().unwrap_or_default());
            for (name, value) in reply.headers() {
                match value.to_str() {
                    Ok(value) => response.add_header(name.as_str(), value),
                    Err(_) => tracing::debug!(header = %name, "skipping non-ASCII header value"),
                }
            }

            if method == Method::Head {
                response.set_body_stream(BodyStream::empty());
                return Ok(response);
            }
            let length = response.content_length();
            let stream = reply
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| Error::transport("failed reading response body", e)));
            response.set_body_stream(BodyStream::new(stream, length));
            Ok(response)
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
