//! In-memory blob service speaking just enough of the REST surface for the
//! clients under test.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cumulo_blob::{BlobClient, ClientOptions, StorageCredential};
use cumulo_http::{BodyStream, Context, Headers, Method, Request, RequestBody, Response, RetryOptions, Transport};
use cumulo_transfer::TransferOptions;
use url::Url;

pub const ACCOUNT: &str = "https://acct.blob.example.net";

pub fn pattern(len: usize) -> Bytes { (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into() }

#[derive(Debug, Clone, Default)]
pub struct StoredBlob {
    pub data:      Vec<u8>,
    pub blob_type: &'static str,
    /// Indices of 512-byte pages holding data.
    pub pages:     BTreeSet<u64>,
    pub etag:      u64,
    pub metadata:  Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method:  Method,
    pub url:     Url,
    pub headers: Headers,
}

#[derive(Default)]
pub struct MockBlobService {
    blobs:       Mutex<HashMap<String, StoredBlob>>,
    staged:      Mutex<HashMap<String, HashMap<String, Bytes>>>,
    log:         Mutex<Vec<Recorded>>,
    fail_copies: Mutex<Option<u16>>,
    fail_block:  Mutex<Option<(String, u16)>>,
    etags:       AtomicU64,
    snapshots:   AtomicU32,
    calls:       AtomicU32,
}

impl MockBlobService {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>, blob_type: &'static str) {
        let data = data.into();
        let pages = if blob_type == "PageBlob" {
            (0..data.len() as u64 / 512).collect()
        } else {
            BTreeSet::new()
        };
        let blob = StoredBlob {
            data,
            blob_type,
            pages,
            etag: self.next_etag(),
            metadata: vec![("owner".into(), "ops".into())],
        };
        self.blobs.lock().unwrap().insert(path.to_owned(), blob);
    }

    pub fn blob(&self, path: &str) -> Option<StoredBlob> { self.blobs.lock().unwrap().get(path).cloned() }

    pub fn calls(&self) -> u32 { self.calls.load(Ordering::SeqCst) }

    pub fn requests(&self) -> Vec<Recorded> { self.log.lock().unwrap().clone() }

    /// Answer every copy start with `status`.
    pub fn fail_copies(&self, status: u16) { *self.fail_copies.lock().unwrap() = Some(status); }

    /// Answer every staging of block `id` with `status`.
    pub fn fail_block(&self, id: &str, status: u16) { *self.fail_block.lock().unwrap() = Some((id.to_owned(), status)); }

    fn next_etag(&self) -> u64 { self.etags.fetch_add(1, Ordering::SeqCst) + 1 }

    fn get(&self, key: &str, headers: &Headers) -> Response {
        let blobs = self.blobs.lock().unwrap();
        let Some(blob) = blobs.get(key) else {
            return error(404, "BlobNotFound", "The specified blob does not exist.");
        };
        if let Some(expected) = headers.get("If-Match") {
            if expected != etag(blob.etag) {
                return error(412, "ConditionNotMet", "The condition specified using HTTP conditional header(s) is not met.");
            }
        }

        let len = blob.data.len() as u64;
        let Some(range) = headers.get("x-ms-range") else {
            let response = described(Response::new(200, "OK"), blob);
            return with_body(response, Bytes::copy_from_slice(&blob.data));
        };
        let (start, end) = parse_range(range);
        if start >= len {
            return error(416, "InvalidRange", "The range specified is invalid for the current size of the resource.");
        }
        let end = end.unwrap_or(u64::MAX).min(len - 1);
        let mut response = described(Response::new(206, "Partial Content"), blob);
        response.add_header("Content-Range", format!("bytes {start}-{end}/{len}"));
        with_body(response, Bytes::copy_from_slice(&blob.data[start as usize..=end as usize]))
    }

    fn head(&self, key: &str) -> Response {
        let blobs = self.blobs.lock().unwrap();
        match blobs.get(key) {
            Some(blob) => {
                let mut response = described(Response::new(200, "OK"), blob);
                response.add_header("Content-Length", blob.data.len().to_string());
                response
            }
            None => error(404, "BlobNotFound", "The specified blob does not exist."),
        }
    }

    fn put_blob(&self, key: &str, headers: &Headers, body: Bytes) -> Response {
        if let Some(source) = headers.get("x-ms-copy-source") {
            return self.copy(key, source);
        }
        let metadata = headers
            .iter()
            .filter_map(|(name, value)| name.strip_prefix("x-ms-meta-").map(|k| (k.to_owned(), value.to_owned())))
            .collect();
        let blob = match headers.get("x-ms-blob-type") {
            Some("PageBlob") => {
                let size: u64 = headers.get("x-ms-blob-content-length").unwrap().parse().unwrap();
                StoredBlob {
                    data: vec![0; size as usize],
                    blob_type: "PageBlob",
                    ..Default::default()
                }
            }
            Some("BlockBlob") => StoredBlob {
                data: body.to_vec(),
                blob_type: "BlockBlob",
                ..Default::default()
            },
            _ => return error(400, "MissingRequiredHeader", "x-ms-blob-type is required."),
        };
        self.store(key, StoredBlob { metadata, ..blob })
    }

    fn store(&self, key: &str, blob: StoredBlob) -> Response {
        let blob = StoredBlob {
            etag: self.next_etag(),
            ..blob
        };
        let mut response = Response::new(201, "Created");
        stamp(&mut response, blob.etag);
        self.blobs.lock().unwrap().insert(key.to_owned(), blob);
        response
    }

    fn copy(&self, key: &str, source: &str) -> Response {
        if let Some(status) = *self.fail_copies.lock().unwrap() {
            return error(status, "InternalError", "Copy failed.");
        }
        let path = Url::parse(source).unwrap().path().to_owned();
        let Some(original) = self.blob(&path) else {
            return error(404, "CannotVerifyCopySource", "The specified blob does not exist.");
        };
        let mut response = self.store(key, original);
        response.add_header("x-ms-copy-id", "copy-1");
        response.add_header("x-ms-copy-status", "success");
        response
    }

    fn put_page(&self, key: &str, headers: &Headers, body: Bytes) -> Response {
        let mut blobs = self.blobs.lock().unwrap();
        let Some(blob) = blobs.get_mut(key).filter(|b| b.blob_type == "PageBlob") else {
            return error(404, "BlobNotFound", "The specified blob does not exist.");
        };
        let (start, end) = parse_range(headers.get("x-ms-range").unwrap());
        let end = end.unwrap();
        if end >= blob.data.len() as u64 {
            return error(416, "InvalidPageRange", "The page range specified is invalid.");
        }
        let span = start as usize..=end as usize;
        match headers.get("x-ms-page-write") {
            Some("update") => {
                assert_eq!(body.len() as u64, end - start + 1, "page body does not match its range");
                blob.data[span].copy_from_slice(&body);
                blob.pages.extend(start / 512..=end / 512);
            }
            Some("clear") => {
                blob.data[span].fill(0);
                for page in start / 512..=end / 512 {
                    blob.pages.remove(&page);
                }
            }
            _ => return error(400, "InvalidHeaderValue", "x-ms-page-write is invalid."),
        }
        blob.etag = self.next_etag();
        let mut response = Response::new(201, "Created");
        stamp(&mut response, blob.etag);
        response.add_header("x-ms-blob-sequence-number", "0");
        response
    }

    fn resize(&self, key: &str, headers: &Headers) -> Response {
        let mut blobs = self.blobs.lock().unwrap();
        let Some(blob) = blobs.get_mut(key) else {
            return error(404, "BlobNotFound", "The specified blob does not exist.");
        };
        let size: u64 = headers.get("x-ms-blob-content-length").unwrap().parse().unwrap();
        blob.data.resize(size as usize, 0);
        blob.pages.retain(|page| page * 512 < size);
        blob.etag = self.next_etag();
        let mut response = Response::new(200, "OK");
        stamp(&mut response, blob.etag);
        response.add_header("x-ms-blob-sequence-number", "0");
        response
    }

    fn page_list(&self, key: &str) -> Response {
        let blobs = self.blobs.lock().unwrap();
        let Some(blob) = blobs.get(key) else {
            return error(404, "BlobNotFound", "The specified blob does not exist.");
        };
        let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><PageList>"#);
        let mut pages = blob.pages.iter().copied().peekable();
        while let Some(first) = pages.next() {
            let mut last = first;
            while pages.peek() == Some(&(last + 1)) {
                last += 1;
                pages.next();
            }
            xml.push_str(&format!(
                "<PageRange><Start>{}</Start><End>{}</End></PageRange>",
                first * 512,
                (last + 1) * 512 - 1
            ));
        }
        xml.push_str("</PageList>");

        let mut response = Response::new(200, "OK");
        stamp(&mut response, blob.etag);
        response.add_header("x-ms-blob-content-length", blob.data.len().to_string());
        with_body(response, Bytes::from(xml))
    }

    fn stage(&self, key: &str, block_id: &str, body: Bytes) -> Response {
        if let Some((_, status)) = self.fail_block.lock().unwrap().as_ref().filter(|(id, _)| id == block_id) {
            return error(*status, "InternalError", "Staging failed.");
        }
        self.staged
            .lock()
            .unwrap()
            .entry(key.to_owned())
            .or_default()
            .insert(block_id.to_owned(), body);
        Response::new(201, "Created")
    }

    fn commit(&self, key: &str, body: &[u8]) -> Response {
        let xml = std::str::from_utf8(body).unwrap();
        let ids: Vec<&str> = xml
            .split("<Latest>")
            .skip(1)
            .filter_map(|part| part.split_once("</Latest>").map(|(id, _)| id))
            .collect();

        let mut staged = self.staged.lock().unwrap();
        let blocks = staged.entry(key.to_owned()).or_default();
        let mut data = Vec::new();
        for id in &ids {
            let Some(block) = blocks.get(*id) else {
                return error(400, "InvalidBlockList", "The specified block list is invalid.");
            };
            data.extend_from_slice(block);
        }
        blocks.clear();
        drop(staged);

        self.store(
            key,
            StoredBlob {
                data,
                blob_type: "BlockBlob",
                ..Default::default()
            },
        )
    }

    fn snapshot(&self, key: &str) -> Response {
        let Some(blob) = self.blob(key) else {
            return error(404, "BlobNotFound", "The specified blob does not exist.");
        };
        let n = self.snapshots.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("2024-05-01T00:00:{n:02}.0000000Z");
        self.blobs.lock().unwrap().insert(format!("{key}@{id}"), blob.clone());
        let mut response = Response::new(201, "Created");
        stamp(&mut response, blob.etag);
        response.add_header("x-ms-snapshot", id);
        response
    }

    fn delete(&self, key: &str, headers: &Headers) -> Response {
        let mut blobs = self.blobs.lock().unwrap();
        if !blobs.contains_key(key) {
            return error(404, "BlobNotFound", "The specified blob does not exist.");
        }
        let prefix = format!("{key}@");
        let has_snapshots = blobs.keys().any(|k| k.starts_with(&prefix));
        match headers.get("x-ms-delete-snapshots") {
            Some("include") => {
                blobs.retain(|k, _| k != key && !k.starts_with(&prefix));
            }
            Some("only") => {
                blobs.retain(|k, _| !k.starts_with(&prefix));
            }
            _ if has_snapshots => {
                return error(409, "SnapshotsPresent", "This operation is not permitted because the blob has snapshots.");
            }
            _ => {
                blobs.remove(key);
            }
        }
        Response::new(202, "Accepted")
    }
}

#[async_trait]
impl Transport for MockBlobService {
    async fn send(&self, ctx: &Context, request: &mut Request) -> cumulo_http::Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Recorded {
            method:  request.method(),
            url:     request.url().clone(),
            headers: request.headers().clone(),
        });

        let body = match request.take_body() {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes(bytes) => bytes,
            RequestBody::Stream(stream) => stream.read_to_end(ctx).await?,
        };
        let url = request.url().clone();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let key = match query.get("snapshot") {
            Some(snapshot) => format!("{}@{snapshot}", url.path()),
            None => url.path().to_owned(),
        };
        let headers = request.headers();

        let response = match (request.method(), query.get("comp").map(String::as_str)) {
            (Method::Get, None) => self.get(&key, headers),
            (Method::Head, None) => self.head(&key),
            (Method::Get, Some("pagelist")) => self.page_list(&key),
            (Method::Put, None) => self.put_blob(&key, headers, body),
            (Method::Put, Some("page")) => self.put_page(&key, headers, body),
            (Method::Put, Some("properties")) => self.resize(&key, headers),
            (Method::Put, Some("block")) => self.stage(&key, &query["blockid"], body),
            (Method::Put, Some("blocklist")) => self.commit(&key, &body),
            (Method::Put, Some("snapshot")) => self.snapshot(&key),
            (Method::Put, Some("copy")) if headers.get("x-ms-copy-action") == Some("abort") => {
                Response::new(204, "No Content")
            }
            (Method::Delete, None) => self.delete(&key, headers),
            _ => error(400, "UnsupportedQueryParameter", "Unsupported operation."),
        };
        Ok(response)
    }
}

fn etag(n: u64) -> String { format!("\"0x{n:X}\"") }

fn stamp(response: &mut Response, n: u64) {
    response.add_header("ETag", etag(n));
    response.add_header("Last-Modified", "Wed, 01 May 2024 00:00:00 GMT");
    response.add_header("x-ms-request-id", "mock-request");
}

/// Headers describing a stored blob on reads.
fn described(mut response: Response, blob: &StoredBlob) -> Response {
    stamp(&mut response, blob.etag);
    response.add_header("Content-Type", "application/octet-stream");
    response.add_header("x-ms-blob-type", blob.blob_type);
    response.add_header("x-ms-server-encrypted", "true");
    if blob.blob_type == "PageBlob" {
        response.add_header("x-ms-blob-sequence-number", "0");
    }
    for (name, value) in &blob.metadata {
        response.add_header(format!("x-ms-meta-{name}"), value.as_str());
    }
    response
}

fn with_body(mut response: Response, body: Bytes) -> Response {
    response.add_header("Content-Length", body.len().to_string());
    response.with_body_stream(BodyStream::from_bytes(body))
}

fn error(status: u16, code: &str, message: &str) -> Response {
    let body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><Error><Code>{code}</Code><Message>{message}</Message></Error>"#
    );
    let mut response = Response::new(status, "Error");
    response.add_header("x-ms-error-code", code);
    response.add_header("x-ms-request-id", "mock-request");
    with_body(response, Bytes::from(body))
}

fn parse_range(value: &str) -> (u64, Option<u64>) {
    let span = value.strip_prefix("bytes=").unwrap();
    let (start, end) = span.split_once('-').unwrap();
    (start.parse().unwrap(), (!end.is_empty()).then(|| end.parse().unwrap()))
}

pub fn fast_retry() -> RetryOptions {
    RetryOptions::default()
        .max_retries(2)
        .base_delay(Duration::from_millis(1))
        .jitter(false)
}

/// Small chunks so multi-chunk paths run on kilobyte blobs.
pub fn small_chunks() -> TransferOptions {
    TransferOptions::default()
        .initial_chunk_size(2048)
        .chunk_size(1024)
        .max_concurrency(3)
        .single_upload_threshold(4096)
}

pub fn client(service: &Arc<MockBlobService>, path: &str) -> BlobClient {
    client_with(service, path, small_chunks())
}

pub fn client_with(service: &Arc<MockBlobService>, path: &str, transfer: TransferOptions) -> BlobClient {
    let options = ClientOptions::default()
        .retry(fast_retry())
        .transport(service.clone())
        .transfer(transfer);
    BlobClient::new(&format!("{ACCOUNT}{path}"), StorageCredential::Anonymous, options).unwrap()
}
