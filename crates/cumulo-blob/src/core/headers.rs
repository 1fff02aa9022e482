use std::collections::BTreeMap;

use cumulo_http::Headers;

use crate::data::{BlobContentInfo, BlobDownloadInfo, BlobProperties, BlobType, CopyInfo, PageInfo};

const META_PREFIX: &str = "x-ms-meta-";

fn text(headers: &Headers, name: &str) -> String { headers.get(name).unwrap_or_default().to_owned() }

fn optional(headers: &Headers, name: &str) -> Option<String> { headers.get(name).map(str::to_owned) }

fn number(headers: &Headers, name: &str) -> Option<u64> { headers.get(name).and_then(|v| v.trim().parse().ok()) }

fn flag(headers: &Headers, name: &str) -> Option<bool> {
    headers.get(name).and_then(|v| match v.trim() {
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    })
}

/// `x-ms-meta-*` headers, keyed by the suffix.
pub fn metadata(headers: &Headers) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| {
            name.len() > META_PREFIX.len()
                && name.get(..META_PREFIX.len()).is_some_and(|p| p.eq_ignore_ascii_case(META_PREFIX))
        })
        .map(|(name, value)| (name[META_PREFIX.len()..].to_owned(), value.to_owned()))
        .collect()
}

pub fn blob_type(headers: &Headers) -> BlobType { headers.get("x-ms-blob-type").map_or(BlobType::Unknown, BlobType::from_header) }

pub fn download_info(headers: &Headers, content_length: u64) -> BlobDownloadInfo {
    BlobDownloadInfo {
        etag: text(headers, "ETag"),
        last_modified: text(headers, "Last-Modified"),
        content_length,
        content_type: optional(headers, "Content-Type"),
        blob_type: blob_type(headers),
        metadata: metadata(headers),
        server_encrypted: flag(headers, "x-ms-server-encrypted"),
    }
}

pub fn properties(headers: &Headers) -> BlobProperties {
    BlobProperties {
        etag:             text(headers, "ETag"),
        last_modified:    text(headers, "Last-Modified"),
        content_length:   number(headers, "Content-Length").unwrap_or(0),
        content_type:     optional(headers, "Content-Type"),
        blob_type:        blob_type(headers),
        metadata:         metadata(headers),
        sequence_number:  number(headers, "x-ms-blob-sequence-number"),
        copy_id:          optional(headers, "x-ms-copy-id"),
        copy_status:      optional(headers, "x-ms-copy-status"),
        server_encrypted: flag(headers, "x-ms-server-encrypted"),
    }
}

/// Size of a page blob as reported with a page listing.
pub fn blob_content_length(headers: &Headers) -> u64 { number(headers, "x-ms-blob-content-length").unwrap_or(0) }

pub fn page_info(headers: &Headers) -> PageInfo {
    PageInfo {
        etag:            text(headers, "ETag"),
        last_modified:   text(headers, "Last-Modified"),
        sequence_number: number(headers, "x-ms-blob-sequence-number"),
    }
}

pub fn content_info(headers: &Headers) -> BlobContentInfo {
    BlobContentInfo {
        etag:            text(headers, "ETag"),
        last_modified:   text(headers, "Last-Modified"),
        sequence_number: number(headers, "x-ms-blob-sequence-number"),
    }
}

pub fn copy_info(headers: &Headers) -> CopyInfo {
    CopyInfo {
        copy_id:       text(headers, "x-ms-copy-id"),
        copy_status:   text(headers, "x-ms-copy-status"),
        etag:          text(headers, "ETag"),
        last_modified: text(headers, "Last-Modified"),
    }
}
