use bytes::Bytes;
use cumulo_http::{BodyStream, ByteRange, Context, Method, Request};
use cumulo_transfer::core::is_aligned;
use cumulo_transfer::{BufferSource, PAGE_SIZE, check_page_alignment, plan_page_chunks};
use url::Url;

use super::client::BlobClient;
use crate::core::{headers, parse_page_list};
use crate::data::{BlobContentInfo, ClientOptions, PageInfo, PageRangesInfo, StorageCredential};
use crate::error::{Error, Result};

/// Largest body the service accepts in one page write.
pub const MAX_PAGE_WRITE: u64 = 4 * 1024 * 1024;

/// Client for a page blob: a sparse array of 512-byte pages.
///
/// Every offset and length passed to a page operation must be a multiple of
/// 512; misaligned calls fail before anything is sent.
#[derive(Debug, Clone)]
pub struct PageBlobClient {
    blob: BlobClient,
}

impl PageBlobClient {
    pub fn new(url: &str, credential: StorageCredential, options: ClientOptions) -> Result<Self> {
        Ok(Self::from_blob(BlobClient::new(url, credential, options)?))
    }

    pub fn from_blob(blob: BlobClient) -> Self { Self { blob } }

    pub fn blob(&self) -> &BlobClient { &self.blob }

    pub fn url(&self) -> &Url { self.blob.url() }

    /// Create (or replace) an empty page blob of `size` bytes.
    pub async fn create(&self, ctx: &Context, size: u64) -> Result<BlobContentInfo> {
        check_size(size)?;
        let mut request = self
            .blob
            .request(Method::Put, &[])
            .with_header("x-ms-blob-type", "PageBlob")
            .with_header("x-ms-blob-content-length", size.to_string());
        let response = self.blob.send(ctx, &mut request).await?;
        Ok(headers::content_info(response.headers()))
    }

    /// Write `data` at `offset`.
    ///
    /// Bodies above [`MAX_PAGE_WRITE`] are split into aligned chunks and
    /// written concurrently; the returned info then comes from a properties
    /// call made after the last chunk.
    pub async fn upload_pages(&self, ctx: &Context, offset: u64, data: Bytes) -> Result<PageInfo> {
        let length = data.len() as u64;
        check_page_alignment(offset, length)?;

        if length <= MAX_PAGE_WRITE {
            let mut request = self.page_write(offset, length, "update").with_body(data);
            let response = self.blob.send(ctx, &mut request).await?;
            return Ok(headers::page_info(response.headers()));
        }

        let transfer = self.blob.transfer_options().clone();
        let plan = plan_page_chunks(offset, length, transfer.effective_chunk_size().min(MAX_PAGE_WRITE))?;
        let source = BufferSource::new(data);
        self.blob
            .engine(transfer)
            .upload_from(ctx, &plan, &source, offset, |chunk, bytes| {
                Ok(self.page_write(chunk.offset, chunk.length, "update").with_body(bytes))
            })
            .await?;

        let properties = self.blob.get_properties(ctx).await?;
        Ok(PageInfo {
            etag:            properties.etag,
            last_modified:   properties.last_modified,
            sequence_number: properties.sequence_number,
        })
    }

    /// Write a stream of known length at `offset` in one request.
    ///
    /// A streamed body cannot be replayed, so this request is not retried.
    pub async fn upload_pages_from_stream(&self, ctx: &Context, offset: u64, body: BodyStream) -> Result<PageInfo> {
        let length = body
            .remaining()
            .ok_or_else(|| Error::precondition("page stream must declare its length"))?;
        check_page_alignment(offset, length)?;
        if length > MAX_PAGE_WRITE {
            return Err(Error::precondition(format!(
                "streamed page write of {length} bytes exceeds the {MAX_PAGE_WRITE} byte limit"
            )));
        }
        let mut request = self.page_write(offset, length, "update").with_stream(body);
        let response = self.blob.send(ctx, &mut request).await?;
        Ok(headers::page_info(response.headers()))
    }

    /// Release the pages in `[offset, offset + length)`.
    pub async fn clear_pages(&self, ctx: &Context, offset: u64, length: u64) -> Result<PageInfo> {
        check_page_alignment(offset, length)?;
        let mut request = self.page_write(offset, length, "clear");
        let response = self.blob.send(ctx, &mut request).await?;
        Ok(headers::page_info(response.headers()))
    }

    /// Grow or shrink the blob to `size` bytes.
    pub async fn resize(&self, ctx: &Context, size: u64) -> Result<PageInfo> {
        check_size(size)?;
        let mut request = self
            .blob
            .request(Method::Put, &[("comp", "properties")])
            .with_header("x-ms-blob-content-length", size.to_string());
        let response = self.blob.send(ctx, &mut request).await?;
        Ok(headers::page_info(response.headers()))
    }

    /// Pages holding data, optionally limited to `range`.
    pub async fn get_page_ranges(&self, ctx: &Context, range: Option<ByteRange>) -> Result<PageRangesInfo> {
        let mut request = self.blob.request(Method::Get, &[("comp", "pagelist")]);
        if let Some(range) = range {
            match range.length {
                Some(length) => check_page_alignment(range.offset, length)?,
                None => check_size(range.offset)?,
            }
            request.headers_mut().set("x-ms-range", range.to_header());
        }

        let mut response = self.blob.send(ctx, &mut request).await?;
        let body = response.take_body().read_to_end(ctx).await?;
        let (page_ranges, clear_ranges) = parse_page_list(&body)?;
        let reply = response.headers();
        Ok(PageRangesInfo {
            page_ranges,
            clear_ranges,
            blob_content_length: headers::blob_content_length(reply),
            etag: reply.get("ETag").unwrap_or_default().to_owned(),
            last_modified: reply.get("Last-Modified").unwrap_or_default().to_owned(),
        })
    }

    fn page_write(&self, offset: u64, length: u64, action: &str) -> Request {
        self.blob
            .request(Method::Put, &[("comp", "page")])
            .with_header("x-ms-page-write", action)
            .with_header("x-ms-range", ByteRange::new(offset, length).to_header())
    }
}

fn check_size(size: u64) -> Result<()> {
    if !is_aligned(size, PAGE_SIZE) {
        return Err(Error::precondition(format!("{size} is not a multiple of {PAGE_SIZE}")));
    }
    Ok(())
}
