//! Error types for cumulo-transfer.

use std::io;

use thiserror::Error;

use crate::data::TransferReport;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] cumulo_http::Error),

    /// The call was rejected before any request was sent.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// One or more chunks failed after exhausting their retries.
    #[error("transfer incomplete: {0}")]
    Incomplete(TransferReport),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn precondition(message: impl Into<String>) -> Self { Self::Precondition(message.into()) }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_) | Self::Http(cumulo_http::Error::Precondition(_)))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Http(cumulo_http::Error::Cancelled | cumulo_http::Error::Timeout))
    }

    /// Per-chunk report of an incomplete transfer.
    pub fn report(&self) -> Option<&TransferReport> {
        match self {
            Self::Incomplete(report) => Some(report),
            _ => None,
        }
    }
}
