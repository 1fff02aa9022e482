use std::fmt;

use bytes::Bytes;
use url::Url;

use super::Headers;
use crate::effects::BodyStream;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }

    /// Methods whose repetition leaves the target in the same state.
    pub fn is_idempotent(self) -> bool {
        matches!(self, Method::Get | Method::Head | Method::Put | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Payload of an outgoing request.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// In-memory payload. Cloning shares the buffer, so it can be resent.
    Bytes(Bytes),
    /// One-shot payload. Once sent it cannot be replayed.
    Stream(BodyStream),
}

impl RequestBody {
    pub fn len(&self) -> Option<u64> {
        match self {
            RequestBody::Empty => Some(0),
            RequestBody::Bytes(bytes) => Some(bytes.len() as u64),
            RequestBody::Stream(stream) => stream.length(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == Some(0) }
}

/// A single logical request.
///
/// The request is built once and handed to the pipeline by mutable
/// reference. Policies may edit headers and the URL; the retry policy bumps
/// [`Request::retry_count`] between attempts.
#[derive(Debug)]
pub struct Request {
    method:        Method,
    url:           Url,
    headers:       Headers,
    body:          RequestBody,
    idempotent:    bool,
    body_consumed: bool,
    retry_count:   u32,
}

impl Request {
    /// Create a request. Idempotency defaults from the method.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: RequestBody::Empty,
            idempotent: method.is_idempotent(),
            body_consumed: false,
            retry_count: 0,
        }
    }

    pub fn get(url: Url) -> Self { Self::new(Method::Get, url) }

    pub fn put(url: Url) -> Self { Self::new(Method::Put, url) }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: BodyStream) -> Self {
        self.body = RequestBody::Stream(stream);
        self
    }

    /// Mark the request as unsafe to resend transparently.
    #[must_use]
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    pub fn method(&self) -> Method { self.method }

    pub fn url(&self) -> &Url { &self.url }

    pub fn url_mut(&mut self) -> &mut Url { &mut self.url }

    pub fn headers(&self) -> &Headers { &self.headers }

    pub fn headers_mut(&mut self) -> &mut Headers { &mut self.headers }

    pub fn body(&self) -> &RequestBody { &self.body }

    pub fn is_idempotent(&self) -> bool { self.idempotent }

    /// Whether the body can be sent again on a later attempt.
    pub fn is_replayable(&self) -> bool {
        !self.body_consumed && !matches!(self.body, RequestBody::Stream(_))
    }

    /// Number of retries already performed for this request.
    pub fn retry_count(&self) -> u32 { self.retry_count }

    pub fn set_retry_count(&mut self, retry_count: u32) { self.retry_count = retry_count; }

    /// Body to put on the wire for the current attempt.
    ///
    /// In-memory bodies are shared and stay in place. A stream body is moved
    /// out and the request is no longer replayable.
    pub fn take_body(&mut self) -> RequestBody {
        match &self.body {
            RequestBody::Empty => RequestBody::Empty,
            RequestBody::Bytes(bytes) => RequestBody::Bytes(bytes.clone()),
            RequestBody::Stream(_) => {
                self.body_consumed = true;
                std::mem::take(&mut self.body)
            }
        }
    }
}
