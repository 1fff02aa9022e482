//! Immutable transfer types.

pub mod chunk;
pub mod options;
pub mod report;

pub use chunk::{Chunk, ChunkPlan};
pub use options::{ChunkFailureMode, TransferOptions};
pub use report::{ChunkOutcome, ChunkStatus, TransferReport};
