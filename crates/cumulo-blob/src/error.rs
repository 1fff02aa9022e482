//! Error types for cumulo-blob.

use thiserror::Error;

use cumulo_transfer::TransferReport;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] cumulo_http::Error),

    #[error(transparent)]
    Transfer(cumulo_transfer::Error),

    /// The service sent an XML body that could not be read.
    #[error("malformed service XML: {0}")]
    Xml(String),
}

impl From<cumulo_transfer::Error> for Error {
    fn from(err: cumulo_transfer::Error) -> Self {
        match err {
            cumulo_transfer::Error::Http(e) => Self::Http(e),
            other => Self::Transfer(other),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self { Self::Xml(err.to_string()) }
}

impl Error {
    pub fn precondition(message: impl Into<String>) -> Self { Self::Http(cumulo_http::Error::precondition(message)) }

    /// Rejected before anything was sent.
    pub fn is_precondition(&self) -> bool {
        match self {
            Self::Http(e) => e.is_precondition(),
            Self::Transfer(e) => e.is_precondition(),
            Self::Xml(_) => false,
        }
    }

    /// HTTP status of a service error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Service error code, such as `BlobNotFound`.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Http(cumulo_http::Error::Service { code, .. }) => code.as_deref(),
            _ => None,
        }
    }

    /// Per-chunk report of an incomplete parallel transfer.
    pub fn report(&self) -> Option<&TransferReport> {
        match self {
            Self::Transfer(e) => e.report(),
            _ => None,
        }
    }
}
