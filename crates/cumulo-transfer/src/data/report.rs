use std::fmt;

use cumulo_http::ByteRange;

use super::Chunk;

/// Final state of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Succeeded,
    /// Retries exhausted or a terminal error.
    Failed { status: Option<u16>, reason: String },
    /// In flight when the transfer was stopped.
    Cancelled,
    /// Never dispatched.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub chunk:  Chunk,
    pub status: ChunkStatus,
}

/// Per-chunk result of a transfer, in plan order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferReport {
    pub chunks:            Vec<ChunkOutcome>,
    pub bytes_transferred: u64,
}

impl TransferReport {
    /// True only when every chunk succeeded.
    pub fn is_success(&self) -> bool { self.chunks.iter().all(|c| c.status == ChunkStatus::Succeeded) }

    pub fn failed(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.chunks.iter().filter(|c| matches!(c.status, ChunkStatus::Failed { .. }))
    }

    /// Ranges of chunks that failed on their own, excluding cancelled and
    /// skipped ones.
    pub fn failed_ranges(&self) -> Vec<ByteRange> { self.failed().map(|c| c.chunk.range()).collect() }

    /// Ranges that must be transferred again, failed or not.
    pub fn incomplete_ranges(&self) -> Vec<ByteRange> {
        self.chunks
            .iter()
            .filter(|c| c.status != ChunkStatus::Succeeded)
            .map(|c| c.chunk.range())
            .collect()
    }

    pub fn succeeded(&self) -> usize { self.chunks.iter().filter(|c| c.status == ChunkStatus::Succeeded).count() }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed: Vec<&ChunkOutcome> = self.failed().collect();
        write!(f, "{} of {} chunks succeeded", self.succeeded(), self.chunks.len())?;
        if failed.is_empty() {
            return Ok(());
        }
        f.write_str("; failed ranges:")?;
        for outcome in failed {
            let chunk = outcome.chunk;
            write!(f, " [{}, {})", chunk.offset, chunk.end())?;
            if let ChunkStatus::Failed { reason, .. } = &outcome.status {
                write!(f, " ({reason})")?;
            }
        }
        Ok(())
    }
}
