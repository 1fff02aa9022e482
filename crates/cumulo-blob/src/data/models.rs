use std::collections::BTreeMap;
use std::fmt;

use cumulo_http::{BodyStream, ContentRange};

/// Kind of blob as reported in `x-ms-blob-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobType {
    Block,
    Page,
    Append,
    #[default]
    Unknown,
}

impl BlobType {
    pub fn from_header(value: &str) -> Self {
        match value {
            "BlockBlob" => Self::Block,
            "PageBlob" => Self::Page,
            "AppendBlob" => Self::Append,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "BlockBlob",
            Self::Page => "PageBlob",
            Self::Append => "AppendBlob",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Result of `get_properties`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlobProperties {
    pub etag:             String,
    pub last_modified:    String,
    pub content_length:   u64,
    pub content_type:     Option<String>,
    pub blob_type:        BlobType,
    pub metadata:         BTreeMap<String, String>,
    /// Page blobs only.
    pub sequence_number:  Option<u64>,
    pub copy_id:          Option<String>,
    pub copy_status:      Option<String>,
    pub server_encrypted: Option<bool>,
}

/// Description of a downloaded blob or blob range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlobDownloadInfo {
    pub etag:             String,
    pub last_modified:    String,
    /// Bytes delivered to the caller.
    pub content_length:   u64,
    pub content_type:     Option<String>,
    pub blob_type:        BlobType,
    pub metadata:         BTreeMap<String, String>,
    pub server_encrypted: Option<bool>,
}

/// A single streamed download.
#[derive(Debug)]
pub struct BlobDownloadResponse {
    pub info:  BlobDownloadInfo,
    /// Present for ranged responses.
    pub range: Option<ContentRange>,
    pub body:  BodyStream,
}

/// One run of pages, `[offset, offset + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub offset: u64,
    pub length: u64,
}

impl PageRange {
    pub fn end(&self) -> u64 { self.offset + self.length }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRangesInfo {
    /// Pages holding data.
    pub page_ranges:         Vec<PageRange>,
    /// Pages cleared since a previous snapshot; empty for a plain listing.
    pub clear_ranges:        Vec<PageRange>,
    pub blob_content_length: u64,
    pub etag:                String,
    pub last_modified:       String,
}

/// Result of page writes, clears and resizes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub etag:            String,
    pub last_modified:   String,
    pub sequence_number: Option<u64>,
}

/// Result of calls that create or replace blob content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlobContentInfo {
    pub etag:            String,
    pub last_modified:   String,
    pub sequence_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyInfo {
    pub copy_id:       String,
    pub copy_status:   String,
    pub etag:          String,
    pub last_modified: String,
}
