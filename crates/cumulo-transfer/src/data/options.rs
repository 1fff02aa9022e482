use serde::{Deserialize, Serialize};

use crate::core::clamp_chunk_size;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// What the engine does with the rest of a transfer once a chunk fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFailureMode {
    /// Stop dispatching and cancel chunks still in flight.
    #[default]
    CancelRemaining,
    /// Let every other chunk run so the report lists all failed ranges.
    Continue,
}

/// Configuration for chunked transfers.
///
/// # Examples
///
/// ```
/// use cumulo_transfer::{ChunkFailureMode, TransferOptions};
///
/// let options = TransferOptions::default()
///     .chunk_size(8 * 1024 * 1024)
///     .max_concurrency(8)
///     .failure_mode(ChunkFailureMode::Continue);
/// assert_eq!(options.effective_chunk_size(), 8 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Size of the first ranged request of a download, which also discovers
    /// the object size.
    ///
    /// Default: 256 MiB
    pub initial_chunk_size: u64,

    /// Requested size of every following chunk.
    ///
    /// Default: 4 MiB
    pub chunk_size: u64,

    /// Lower bound applied to `chunk_size`.
    ///
    /// Default: 1 KiB
    pub min_chunk_size: u64,

    /// Upper bound applied to `chunk_size`.
    ///
    /// Default: 256 MiB
    pub max_chunk_size: u64,

    /// Chunk requests allowed in flight at once.
    ///
    /// Default: 5
    pub max_concurrency: usize,

    /// Uploads at or below this size go out as a single request.
    ///
    /// Default: 256 MiB
    pub single_upload_threshold: u64,

    /// Times a chunk download is resumed after its body stream breaks.
    ///
    /// Request-level retries are handled by the pipeline; this only covers
    /// failures while draining an already accepted response.
    ///
    /// Default: 3
    pub body_retries: u32,

    /// Default: cancel remaining chunks
    pub failure_mode: ChunkFailureMode,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            initial_chunk_size:      256 * MIB,
            chunk_size:              4 * MIB,
            min_chunk_size:          KIB,
            max_chunk_size:          256 * MIB,
            max_concurrency:         5,
            single_upload_threshold: 256 * MIB,
            body_retries:            3,
            failure_mode:            ChunkFailureMode::CancelRemaining,
        }
    }
}

impl TransferOptions {
    #[must_use]
    pub fn initial_chunk_size(mut self, size: u64) -> Self {
        self.initial_chunk_size = size;
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = size;
        self
    }

    #[must_use]
    pub fn chunk_bounds(mut self, min: u64, max: u64) -> Self {
        self.min_chunk_size = min;
        self.max_chunk_size = max;
        self
    }

    #[must_use]
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    #[must_use]
    pub fn single_upload_threshold(mut self, threshold: u64) -> Self {
        self.single_upload_threshold = threshold;
        self
    }

    #[must_use]
    pub fn body_retries(mut self, body_retries: u32) -> Self {
        self.body_retries = body_retries;
        self
    }

    #[must_use]
    pub fn failure_mode(mut self, failure_mode: ChunkFailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    /// `chunk_size` clamped into `[min_chunk_size, max_chunk_size]`.
    pub fn effective_chunk_size(&self) -> u64 {
        clamp_chunk_size(self.chunk_size, self.min_chunk_size, self.max_chunk_size)
    }

    /// Concurrency limit, never zero.
    pub fn concurrency(&self) -> usize { self.max_concurrency.max(1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_is_clamped() {
        let options = TransferOptions::default().chunk_size(1);
        assert_eq!(options.effective_chunk_size(), KIB);

        let options = TransferOptions::default().chunk_size(u64::MAX);
        assert_eq!(options.effective_chunk_size(), 256 * MIB);
    }

    #[test]
    fn test_zero_concurrency_still_runs() {
        assert_eq!(TransferOptions::default().max_concurrency(0).concurrency(), 1);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let options: TransferOptions =
            serde_json::from_str(r#"{"chunk_size": 1048576, "failure_mode": "continue"}"#).unwrap();
        assert_eq!(options.chunk_size, MIB);
        assert_eq!(options.failure_mode, ChunkFailureMode::Continue);
        assert_eq!(options.max_concurrency, 5);
    }
}
