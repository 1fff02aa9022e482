//! Sinks, sources and the chunked transfer engine.

mod engine;
mod sink;
mod source;

pub use engine::TransferEngine;
pub use sink::{BufferSink, FileSink, Sink};
pub use source::{BufferSource, FileSource, Source};
