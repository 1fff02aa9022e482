//! Blob clients and the pipeline they share.

mod block;
mod client;
mod page;
mod pipeline;

pub use block::{BlockBlobClient, block_id};
pub use client::BlobClient;
pub use page::{MAX_PAGE_WRITE, PageBlobClient};
pub use pipeline::{StorageHeadersPolicy, build_pipeline};
