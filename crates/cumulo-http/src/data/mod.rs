//! Request and response model shared by every policy in the pipeline.
//!
//! These types carry no network state of their own. A [`Request`] is built
//! once per logical operation (or per chunk) and only its attempt
//! bookkeeping changes while it travels through the pipeline.

pub mod context;
pub mod headers;
pub mod options;
pub mod request;
pub mod response;

pub use context::Context;
pub use headers::Headers;
pub use options::RetryOptions;
pub use request::{Method, Request, RequestBody};
pub use response::Response;
