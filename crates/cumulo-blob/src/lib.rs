//! Blob storage clients.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Client options, credentials and the models returned by the service
//! - [`core`] - Pure decoding of response headers and XML bodies
//! - [`effects`] - The blob, page blob and block blob clients
//!
//! Every client built from the same [`BlobClient`] shares one pipeline.
//! Large downloads and uploads go through the chunked transfer engine from
//! `cumulo-transfer`; everything else is a single request.

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use data::{
    BlobContentInfo, BlobDownloadInfo, BlobDownloadResponse, BlobProperties, BlobType, ClientOptions, CopyInfo,
    DeleteSnapshots, DownloadOptions, PageInfo, PageRange, PageRangesInfo, StorageCredential,
};
pub use effects::{
    BlobClient, BlockBlobClient, MAX_PAGE_WRITE, PageBlobClient, StorageHeadersPolicy, block_id, build_pipeline,
};

pub use error::{Error, Result};
