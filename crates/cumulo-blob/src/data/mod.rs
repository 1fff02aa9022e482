//! Client options and the values returned by blob operations.

pub mod models;
pub mod options;

pub use models::{
    BlobContentInfo, BlobDownloadInfo, BlobDownloadResponse, BlobProperties, BlobType, CopyInfo, PageInfo,
    PageRange, PageRangesInfo,
};
pub use options::{ClientOptions, DEFAULT_API_VERSION, DeleteSnapshots, DownloadOptions, StorageCredential};
