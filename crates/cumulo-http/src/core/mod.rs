//! Pure transformations used by the pipeline.
//!
//! Nothing in here performs I/O: backoff arithmetic, status classification
//! and range header formatting are all plain functions over values.

mod range;
mod retry;
mod validation;

pub use range::{ByteRange, ContentRange, format_range, parse_content_range, redact_url};
pub use retry::{JITTER_FRACTION, backoff_delay, retry_delay};
pub use validation::{StatusClass, is_throttled};
