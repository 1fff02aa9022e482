use serde::{Deserialize, Serialize};
use url::Url;

/// A byte range addressed by offset and optional length.
///
/// A missing length means "to the end of the object".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: u64,
    pub length: Option<u64>,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self { Self { offset, length: Some(length) } }

    pub fn from_offset(offset: u64) -> Self { Self { offset, length: None } }

    /// Last byte covered, if the range is bounded and non-empty.
    pub fn last(&self) -> Option<u64> {
        match self.length {
            Some(0) | None => None,
            Some(len) => Some(self.offset.saturating_add(len - 1)),
        }
    }

    /// Render as a `Range`/`x-ms-range` header value.
    ///
    /// ```
    /// use cumulo_http::ByteRange;
    ///
    /// assert_eq!(ByteRange::new(0, 4 * 1024 * 1024).to_header(), "bytes=0-4194303");
    /// assert_eq!(ByteRange::from_offset(512).to_header(), "bytes=512-");
    /// ```
    pub fn to_header(&self) -> String {
        match self.last() {
            Some(last) => format!("bytes={}-{}", self.offset, last),
            None => format!("bytes={}-", self.offset),
        }
    }
}

/// Format the header value for `length` bytes starting at `offset`.
///
/// `length` must be non-zero; a zero length yields an open-ended range.
pub fn format_range(offset: u64, length: u64) -> String { ByteRange::new(offset, length).to_header() }

/// A parsed `Content-Range: bytes start-end/total` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    /// Inclusive.
    pub end:   u64,
    /// `None` when the server sent `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn len(&self) -> u64 { self.end - self.start + 1 }

    pub fn is_empty(&self) -> bool { false }
}

/// Parse a `Content-Range` value such as `bytes 0-511/1024`.
///
/// Unsatisfied ranges (`bytes */1024`) have no start/end and return `None`.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, total) = rest.split_once('/')?;
    let (start, end) = span.trim().split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    if end < start {
        return None;
    }
    let total = match total.trim() {
        "*" => None,
        n => Some(n.parse().ok()?),
    };
    Some(ContentRange { start, end, total })
}

/// Copy of `url` with credential-bearing query values masked.
pub fn redact_url(url: &Url) -> String {
    const SECRET_KEYS: [&str; 2] = ["sig", "x-ms-signature"];

    if url.query().is_none() {
        return url.to_string();
    }
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let secret = SECRET_KEYS.iter().any(|s| k.eq_ignore_ascii_case(s));
            (k.into_owned(), if secret { "REDACTED".to_owned() } else { v.into_owned() })
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
