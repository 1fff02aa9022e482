use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use cumulo_http::{Context, Method, Request};
use cumulo_transfer::{BufferSource, FileSource, Source};
use tracing::debug;
use url::Url;

use super::client::BlobClient;
use crate::core::{headers, render_block_list};
use crate::data::{BlobContentInfo, ClientOptions, StorageCredential};
use crate::error::Result;

/// Block id for the block at `index` of a staged upload.
///
/// Ids of one blob must all have the same encoded length, hence the
/// zero-padded index.
pub fn block_id(index: u32) -> String { STANDARD.encode(format!("block-{index:08}")) }

/// Client for a block blob.
#[derive(Debug, Clone)]
pub struct BlockBlobClient {
    blob: BlobClient,
}

impl BlockBlobClient {
    pub fn new(url: &str, credential: StorageCredential, options: ClientOptions) -> Result<Self> {
        Ok(Self::from_blob(BlobClient::new(url, credential, options)?))
    }

    pub fn from_blob(blob: BlobClient) -> Self { Self { blob } }

    pub fn blob(&self) -> &BlobClient { &self.blob }

    pub fn url(&self) -> &Url { self.blob.url() }

    /// Replace the blob with `data` in a single request.
    pub async fn upload(&self, ctx: &Context, data: Bytes) -> Result<BlobContentInfo> {
        let mut request = self
            .blob
            .request(Method::Put, &[])
            .with_header("x-ms-blob-type", "BlockBlob")
            .with_body(data);
        let response = self.blob.send(ctx, &mut request).await?;
        Ok(headers::content_info(response.headers()))
    }

    /// Stage one uncommitted block.
    pub async fn stage_block(&self, ctx: &Context, block_id: &str, data: Bytes) -> Result<()> {
        let mut request = self.stage_request(block_id, data);
        self.blob.send(ctx, &mut request).await?;
        Ok(())
    }

    /// Make `block_ids`, in order, the content of the blob.
    pub async fn commit_block_list(&self, ctx: &Context, block_ids: &[String]) -> Result<BlobContentInfo> {
        let mut request = self
            .blob
            .request(Method::Put, &[("comp", "blocklist")])
            .with_header("Content-Type", "application/xml")
            .with_body(render_block_list(block_ids));
        let response = self.blob.send(ctx, &mut request).await?;
        Ok(headers::content_info(response.headers()))
    }

    /// Upload `data`, staging blocks in parallel once it exceeds the single
    /// upload threshold.
    pub async fn upload_from_buffer(&self, ctx: &Context, data: Bytes) -> Result<BlobContentInfo> {
        if data.len() as u64 <= self.blob.transfer_options().single_upload_threshold {
            return self.upload(ctx, data).await;
        }
        self.upload_staged(ctx, &BufferSource::new(data)).await
    }

    /// Upload the file at `path`, staging blocks in parallel once it exceeds
    /// the single upload threshold.
    pub async fn upload_from_file(&self, ctx: &Context, path: impl AsRef<Path>) -> Result<BlobContentInfo> {
        let source = FileSource::open(path).await?;
        if source.len() <= self.blob.transfer_options().single_upload_threshold {
            let data = source.read_at(0, source.len()).await?;
            return self.upload(ctx, data).await;
        }
        self.upload_staged(ctx, &source).await
    }

    /// Stage every chunk of `source` as a block, then commit them in order.
    /// Nothing is committed unless every block was staged.
    async fn upload_staged(&self, ctx: &Context, source: &dyn Source) -> Result<BlobContentInfo> {
        let engine = self.blob.engine(self.blob.transfer_options().clone());
        let report = engine
            .upload(ctx, source, |chunk, data| Ok(self.stage_request(&block_id(chunk.index), data)))
            .await?;

        let ids: Vec<String> = report.chunks.iter().map(|c| block_id(c.chunk.index)).collect();
        debug!(blocks = ids.len(), bytes = report.bytes_transferred, "committing staged blocks");
        self.commit_block_list(ctx, &ids).await
    }

    fn stage_request(&self, block_id: &str, data: Bytes) -> Request {
        self.blob
            .request(Method::Put, &[("comp", "block"), ("blockid", block_id)])
            .with_body(data)
    }
}
