use std::path::Path;

use cumulo_http::{ByteRange, Context, Method, Pipeline, Request, Response};
use cumulo_transfer::{BufferSink, FileSink, Sink, TransferEngine, TransferOptions, plan_chunks};
use tracing::debug;
use url::Url;

use super::block::BlockBlobClient;
use super::page::PageBlobClient;
use super::pipeline::build_pipeline;
use crate::core::headers;
use crate::core::parse_error_body;
use crate::data::{
    BlobDownloadInfo, BlobDownloadResponse, BlobProperties, ClientOptions, CopyInfo, DeleteSnapshots,
    DownloadOptions, StorageCredential,
};
use crate::error::{Error, Result};

/// First ranged response of a parallel download, plus the span it opens.
struct Probe {
    response: Response,
    /// Object offset of the first byte the caller asked for.
    offset:   u64,
    /// Bytes the whole download will deliver.
    length:   u64,
}

/// Client for one blob.
///
/// Cloning is cheap and every clone, including the page and block clients
/// derived from it, sends through the same pipeline.
#[derive(Debug, Clone)]
pub struct BlobClient {
    url:      Url,
    pipeline: Pipeline,
    transfer: TransferOptions,
}

impl BlobClient {
    /// Build a client and its pipeline for the blob at `url`.
    pub fn new(url: &str, credential: StorageCredential, options: ClientOptions) -> Result<Self> {
        let url = Url::parse(url).map_err(cumulo_http::Error::from)?;
        let pipeline = build_pipeline(&options, &credential)?;
        Ok(Self::from_pipeline(url, pipeline, options.transfer))
    }

    /// Wrap an existing pipeline.
    pub fn from_pipeline(url: Url, pipeline: Pipeline, transfer: TransferOptions) -> Self {
        Self { url, pipeline, transfer }
    }

    pub fn url(&self) -> &Url { &self.url }

    pub fn pipeline(&self) -> &Pipeline { &self.pipeline }

    pub fn transfer_options(&self) -> &TransferOptions { &self.transfer }

    /// Same blob, addressed at `snapshot`. An empty snapshot addresses the
    /// base blob.
    #[must_use]
    pub fn with_snapshot(&self, snapshot: &str) -> Self {
        let mut url = self.url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "snapshot")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.set_query(None);
        if !kept.is_empty() || !snapshot.is_empty() {
            let mut pairs = url.query_pairs_mut();
            pairs.extend_pairs(kept);
            if !snapshot.is_empty() {
                pairs.append_pair("snapshot", snapshot);
            }
        }
        Self {
            url,
            pipeline: self.pipeline.clone(),
            transfer: self.transfer.clone(),
        }
    }

    pub fn page_blob_client(&self) -> PageBlobClient { PageBlobClient::from_blob(self.clone()) }

    pub fn block_blob_client(&self) -> BlockBlobClient { BlockBlobClient::from_blob(self.clone()) }

    pub(crate) fn request(&self, method: Method, query: &[(&str, &str)]) -> Request {
        let mut url = self.url.clone();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Request::new(method, url)
    }

    pub(crate) fn engine(&self, transfer: TransferOptions) -> TransferEngine {
        TransferEngine::new(self.pipeline.clone(), transfer)
    }

    /// Send `request` and decode a non-2xx reply into a service error.
    pub(crate) async fn send(&self, ctx: &Context, request: &mut Request) -> Result<Response> {
        let mut response = self.pipeline.send(ctx, request).await?;
        if response.is_success() {
            return Ok(response);
        }

        // The XML body is best effort; the status alone is still an error.
        let body = response.take_body().read_to_end(ctx).await.unwrap_or_default();
        let (xml_code, message) = parse_error_body(&body);
        let header = |name: &str| response.headers().get(name).map(str::to_owned);
        Err(Error::Http(cumulo_http::Error::Service {
            status: response.status(),
            code: header("x-ms-error-code").or(xml_code),
            message,
            request_id: header("x-ms-request-id"),
        }))
    }

    /// One GET whose body the caller streams.
    pub async fn download(&self, ctx: &Context, options: &DownloadOptions) -> Result<BlobDownloadResponse> {
        let mut request = self.request(Method::Get, &[]);
        if let Some(range) = options.range {
            check_range(range)?;
            request.headers_mut().set("x-ms-range", range.to_header());
        }
        let mut response = self.send(ctx, &mut request).await?;
        let range = response.content_range();
        let length = range
            .map(|r| r.len())
            .or_else(|| response.content_length())
            .unwrap_or(0);
        Ok(BlobDownloadResponse {
            info: headers::download_info(response.headers(), length),
            range,
            body: response.take_body(),
        })
    }

    /// Download the blob, or `options.range` of it, into `buffer`.
    ///
    /// The first `initial_chunk_size` bytes come from one probing request
    /// that also reports the blob size; anything beyond is fetched in
    /// parallel chunks pinned to the probe's ETag.
    pub async fn download_to_buffer(
        &self,
        ctx: &Context,
        buffer: &mut [u8],
        options: &DownloadOptions,
    ) -> Result<BlobDownloadInfo> {
        let range = options.range.unwrap_or_default();
        check_range(range)?;
        if let Some(length) = range.length {
            if (buffer.len() as u64) < length {
                return Err(Error::precondition(format!(
                    "buffer of {} bytes cannot hold the requested {length} bytes",
                    buffer.len()
                )));
            }
        }

        let transfer = options.transfer.as_ref().unwrap_or(&self.transfer);
        let probe = self.probe(ctx, range, transfer).await?;
        if (buffer.len() as u64) < probe.length {
            return Err(Error::precondition(format!(
                "buffer of {} bytes cannot hold the {} byte blob",
                buffer.len(),
                probe.length
            )));
        }
        let sink = BufferSink::new(&mut buffer[..probe.length as usize]);
        self.finish_download(ctx, probe, &sink, transfer).await
    }

    /// Download the blob, or `options.range` of it, into a file created or
    /// truncated at `path`.
    pub async fn download_to_file(
        &self,
        ctx: &Context,
        path: impl AsRef<Path>,
        options: &DownloadOptions,
    ) -> Result<BlobDownloadInfo> {
        let range = options.range.unwrap_or_default();
        check_range(range)?;

        let transfer = options.transfer.as_ref().unwrap_or(&self.transfer);
        let probe = self.probe(ctx, range, transfer).await?;
        let sink = FileSink::create(path, probe.length).await?;
        let info = self.finish_download(ctx, probe, &sink, transfer).await?;
        sink.sync().await?;
        Ok(info)
    }

    async fn probe(&self, ctx: &Context, range: ByteRange, transfer: &TransferOptions) -> Result<Probe> {
        let first = range
            .length
            .map_or(transfer.initial_chunk_size, |len| len.min(transfer.initial_chunk_size));
        let mut request = self.request(Method::Get, &[]);
        request
            .headers_mut()
            .set("x-ms-range", ByteRange::new(range.offset, first).to_header());

        let whole_blob = range.offset == 0 && range.length.is_none();
        let response = match self.send(ctx, &mut request).await {
            Ok(response) => response,
            // Any range of an empty blob is unsatisfiable.
            Err(e) if whole_blob && e.status() == Some(416) => {
                debug!(url = %cumulo_http::redact_url(&self.url), "empty blob, fetching without a range");
                let mut request = self.request(Method::Get, &[]);
                let response = self.send(ctx, &mut request).await?;
                return Ok(Probe {
                    response,
                    offset: 0,
                    length: 0,
                });
            }
            Err(e) => return Err(e),
        };

        let Some(content_range) = response.content_range() else {
            // Ranges are optional for servers; a full reply is only usable
            // when the whole blob was wanted.
            let length = response.content_length().filter(|_| whole_blob).ok_or_else(|| {
                cumulo_http::Error::Parse("ranged download returned no Content-Range".into())
            })?;
            return Ok(Probe {
                response,
                offset: 0,
                length,
            });
        };
        let total = content_range
            .total
            .ok_or_else(|| cumulo_http::Error::Parse("Content-Range without a total size".into()))?;
        let end = range
            .length
            .map_or(total, |len| range.offset.saturating_add(len).min(total));
        let length = end.saturating_sub(range.offset);
        debug!(offset = range.offset, length, total, first = content_range.len(), "probed blob");
        Ok(Probe {
            response,
            offset: range.offset,
            length,
        })
    }

    /// Drain the probe body into `sink`, then fetch whatever is left through
    /// the transfer engine.
    async fn finish_download(
        &self,
        ctx: &Context,
        probe: Probe,
        sink: &dyn Sink,
        transfer: &TransferOptions,
    ) -> Result<BlobDownloadInfo> {
        let Probe {
            mut response,
            offset,
            length,
        } = probe;
        let info = headers::download_info(response.headers(), length);

        let mut body = response.take_body();
        let mut written = 0u64;
        loop {
            match body.next_chunk(ctx).await {
                Ok(Some(bytes)) => {
                    let n = bytes.len() as u64;
                    if written + n > length {
                        return Err(Error::Http(cumulo_http::Error::Body(format!(
                            "first response returned more than {length} bytes"
                        ))));
                    }
                    sink.write_at(written, &bytes).await?;
                    written += n;
                }
                Ok(None) => break,
                // A broken first body is picked up by the chunked remainder.
                Err(e) if e.is_retryable() => {
                    debug!(written, error = %e, "first response body broke");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let rest = length - written;
        if rest == 0 {
            return Ok(info);
        }
        let plan = plan_chunks(offset + written, rest, transfer.effective_chunk_size())?;
        let etag = info.etag.as_str();
        self.engine(transfer.clone())
            .download_into(ctx, &plan, sink, offset, |chunk| {
                let mut request = self.request(Method::Get, &[]);
                request.headers_mut().set("x-ms-range", chunk.range().to_header());
                if !etag.is_empty() {
                    request.headers_mut().set("If-Match", etag);
                }
                Ok(request)
            })
            .await?;
        Ok(info)
    }

    pub async fn get_properties(&self, ctx: &Context) -> Result<BlobProperties> {
        let mut request = self.request(Method::Head, &[]);
        let response = self.send(ctx, &mut request).await?;
        Ok(headers::properties(response.headers()))
    }

    pub async fn delete(&self, ctx: &Context, snapshots: Option<DeleteSnapshots>) -> Result<()> {
        let mut request = self.request(Method::Delete, &[]);
        if let Some(snapshots) = snapshots {
            request.headers_mut().set("x-ms-delete-snapshots", snapshots.as_str());
        }
        self.send(ctx, &mut request).await?;
        Ok(())
    }

    /// Start a server-side copy from `source`.
    ///
    /// The request is never retried: a lost reply may still have started a
    /// copy, and a second start would replace it.
    pub async fn start_copy_from_uri(&self, ctx: &Context, source: &Url) -> Result<CopyInfo> {
        let mut request = self
            .request(Method::Put, &[])
            .with_header("x-ms-copy-source", source.as_str())
            .non_idempotent();
        let response = self.send(ctx, &mut request).await?;
        Ok(headers::copy_info(response.headers()))
    }

    pub async fn abort_copy_from_uri(&self, ctx: &Context, copy_id: &str) -> Result<()> {
        let mut request = self
            .request(Method::Put, &[("comp", "copy"), ("copyid", copy_id)])
            .with_header("x-ms-copy-action", "abort");
        self.send(ctx, &mut request).await?;
        Ok(())
    }

    /// Snapshot the blob and return the snapshot identifier.
    pub async fn create_snapshot(&self, ctx: &Context) -> Result<String> {
        let mut request = self.request(Method::Put, &[("comp", "snapshot")]);
        let response = self.send(ctx, &mut request).await?;
        response
            .headers()
            .get("x-ms-snapshot")
            .map(str::to_owned)
            .ok_or_else(|| cumulo_http::Error::Parse("snapshot response without x-ms-snapshot".into()).into())
    }
}

fn check_range(range: ByteRange) -> Result<()> {
    if range.length == Some(0) {
        return Err(Error::precondition("download range has zero length"));
    }
    Ok(())
}
