//! Chunked, concurrent range transfers over a cumulo pipeline.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Chunk plans, transfer options and per-chunk reports
//! - [`core`] - Pure planning and 512-byte page alignment rules
//! - [`effects`] - Sinks, sources and the transfer engine
//!
//! # Key Features
//!
//! - **Deterministic layout**: every chunk lands at its own offset no matter
//!   which request finishes first
//! - **Independent retry budgets**: each chunk is a separate request through
//!   the full pipeline
//! - **Single aggregate failure**: the caller sees one error naming every
//!   failed range, never a per-chunk error

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::{PAGE_SIZE, check_page_alignment, clamp_chunk_size, plan_chunks, plan_page_chunks};
pub use data::{Chunk, ChunkFailureMode, ChunkOutcome, ChunkPlan, ChunkStatus, TransferOptions, TransferReport};
pub use effects::{BufferSink, BufferSource, FileSink, FileSource, Sink, Source, TransferEngine};

pub use error::{Error, Result};
