//! Error types for cumulo-http.

use std::io;

use thiserror::Error;

use crate::data::Response;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The call was rejected before anything was sent.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source:  Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("service returned {status} ({code})", code = .code.as_deref().unwrap_or("no error code"))]
    Service {
        status:     u16,
        code:       Option<String>,
        message:    Option<String>,
        request_id: Option<String>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    Timeout,

    #[error("body stream error: {0}")]
    Body(String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn precondition(message: impl Into<String>) -> Self { Self::Precondition(message.into()) }

    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source:  Some(Box::new(source)),
        }
    }

    /// Build a service error from the status and diagnostic headers of a
    /// response. The body is left untouched.
    pub fn from_response(response: &Response) -> Self {
        let headers = response.headers();
        Self::Service {
            status:     response.status(),
            code:       headers.get("x-ms-error-code").map(str::to_owned),
            message:    None,
            request_id: headers.get("x-ms-request-id").map(str::to_owned),
        }
    }

    /// Connection-level failures that a retry may fix.
    ///
    /// Service errors are classified by status code in the retry policy,
    /// since the set of retryable statuses is configurable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Body(_))
    }

    pub fn is_precondition(&self) -> bool { matches!(self, Self::Precondition(_)) }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}
