use std::future::Future;
use std::path::Path;

use bytes::Bytes;
use cumulo_http::{Context, Pipeline, Request, Response};
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tracing::{Instrument, debug, info_span, warn};

use super::sink::{BufferSink, FileSink, Sink};
use super::source::Source;
use crate::core::plan_chunks;
use crate::data::{Chunk, ChunkFailureMode, ChunkOutcome, ChunkPlan, ChunkStatus, TransferOptions, TransferReport};
use crate::error::{Error, Result};

/// Runs chunk plans through a shared pipeline with bounded concurrency.
///
/// Every chunk is an independent [`Request`] built by the caller, so each
/// one gets its own retry budget from the pipeline's retry policy. Chunks
/// finish in any order; the only guarantee is that each chunk's bytes land
/// at its own offset. The caller sees one result once every dispatched
/// chunk has resolved.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    pipeline: Pipeline,
    options:  TransferOptions,
}

impl TransferEngine {
    pub fn new(pipeline: Pipeline, options: TransferOptions) -> Self { Self { pipeline, options } }

    pub fn options(&self) -> &TransferOptions { &self.options }

    pub fn pipeline(&self) -> &Pipeline { &self.pipeline }

    /// Download `total` bytes into `buffer`, starting at object offset 0.
    ///
    /// `build` turns a chunk into a ranged request. Nothing is sent when the
    /// buffer is smaller than `total`.
    pub async fn download_to_buffer<F>(
        &self,
        ctx: &Context,
        buffer: &mut [u8],
        total: u64,
        build: F,
    ) -> Result<TransferReport>
    where
        F: Fn(&Chunk) -> cumulo_http::Result<Request> + Send + Sync,
    {
        if (buffer.len() as u64) < total {
            return Err(Error::precondition(format!(
                "buffer of {} bytes cannot hold {total} bytes",
                buffer.len()
            )));
        }
        let plan = plan_chunks(0, total, self.options.effective_chunk_size())?;
        let sink = BufferSink::new(buffer);
        self.download_into(ctx, &plan, &sink, 0, build).await
    }

    /// Download `total` bytes into a file created (or truncated) at `path`.
    pub async fn download_to_file<F>(
        &self,
        ctx: &Context,
        path: &Path,
        total: u64,
        build: F,
    ) -> Result<TransferReport>
    where
        F: Fn(&Chunk) -> cumulo_http::Result<Request> + Send + Sync,
    {
        let plan = plan_chunks(0, total, self.options.effective_chunk_size())?;
        let sink = FileSink::create(path, total).await?;
        let report = self.download_into(ctx, &plan, &sink, 0, build).await?;
        sink.sync().await?;
        Ok(report)
    }

    /// Download every chunk of `plan` into `sink`.
    ///
    /// A chunk at object offset `o` is written at sink offset `o - base`.
    pub async fn download_into<F>(
        &self,
        ctx: &Context,
        plan: &ChunkPlan,
        sink: &dyn Sink,
        base: u64,
        build: F,
    ) -> Result<TransferReport>
    where
        F: Fn(&Chunk) -> cumulo_http::Result<Request> + Send + Sync,
    {
        if plan.start < base {
            return Err(Error::precondition(format!("plan starts at {} before sink base {base}", plan.start)));
        }
        if let Some(capacity) = sink.capacity() {
            if plan.end() - base > capacity {
                return Err(Error::precondition(format!(
                    "destination of {capacity} bytes cannot hold {} bytes",
                    plan.end() - base
                )));
            }
        }
        let span = info_span!("download", chunks = plan.len(), bytes = plan.length);
        self.execute(ctx, plan, |scope, chunk| self.download_chunk(scope, chunk, sink, base, &build))
            .instrument(span)
            .await
    }

    /// Upload `source` as one chunk plan starting at remote offset 0.
    pub async fn upload<F>(&self, ctx: &Context, source: &dyn Source, build: F) -> Result<TransferReport>
    where
        F: Fn(&Chunk, Bytes) -> cumulo_http::Result<Request> + Send + Sync,
    {
        let plan = plan_chunks(0, source.len(), self.options.effective_chunk_size())?;
        self.upload_from(ctx, &plan, source, 0, build).await
    }

    /// Upload every chunk of `plan`, reading chunk `o` from source offset
    /// `o - base`.
    pub async fn upload_from<F>(
        &self,
        ctx: &Context,
        plan: &ChunkPlan,
        source: &dyn Source,
        base: u64,
        build: F,
    ) -> Result<TransferReport>
    where
        F: Fn(&Chunk, Bytes) -> cumulo_http::Result<Request> + Send + Sync,
    {
        if plan.start < base || plan.end() - base > source.len() {
            return Err(Error::precondition(format!(
                "plan [{}, {}) is outside the {} byte source",
                plan.start,
                plan.end(),
                source.len()
            )));
        }
        let span = info_span!("upload", chunks = plan.len(), bytes = plan.length);
        self.execute(ctx, plan, |scope, chunk| self.upload_chunk(scope, chunk, source, base, &build))
            .instrument(span)
            .await
    }

    /// Dispatch chunks with at most `max_concurrency` in flight and collect
    /// their outcomes in plan order.
    async fn execute<R, Fut>(&self, ctx: &Context, plan: &ChunkPlan, run: R) -> Result<TransferReport>
    where
        R: Fn(Context, Chunk) -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        let scope = ctx.child();
        let limit = self.options.concurrency();
        let mut statuses: Vec<Option<ChunkStatus>> = vec![None; plan.len()];
        let mut pending = plan.iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut bytes_transferred = 0;

        loop {
            while in_flight.len() < limit && !scope.is_cancelled() {
                let Some((slot, chunk)) = pending.next() else {
                    break;
                };
                let chunk = *chunk;
                let fut = run(scope.clone(), chunk);
                in_flight.push(async move { (slot, chunk, fut.await) });
            }

            let Some((slot, chunk, result)) = in_flight.next().await else {
                break;
            };
            let status = match result {
                Ok(n) => {
                    bytes_transferred += n;
                    debug!(index = chunk.index, offset = chunk.offset, length = chunk.length, "chunk done");
                    ChunkStatus::Succeeded
                }
                Err(e) if scope.is_cancelled() && e.is_cancelled() => ChunkStatus::Cancelled,
                Err(e) => {
                    warn!(
                        index = chunk.index,
                        offset = chunk.offset,
                        length = chunk.length,
                        error = %e,
                        "chunk failed"
                    );
                    if self.options.failure_mode == ChunkFailureMode::CancelRemaining {
                        scope.cancel();
                    }
                    ChunkStatus::Failed {
                        status: chunk_error_status(&e),
                        reason: e.to_string(),
                    }
                }
            };
            statuses[slot] = Some(status);
        }

        // The caller's own cancellation or deadline wins over partial results.
        ctx.check()?;

        let report = TransferReport {
            chunks: plan
                .iter()
                .zip(statuses)
                .map(|(chunk, status)| ChunkOutcome {
                    chunk:  *chunk,
                    status: status.unwrap_or(ChunkStatus::Skipped),
                })
                .collect(),
            bytes_transferred,
        };
        if report.is_success() {
            Ok(report)
        } else {
            Err(Error::Incomplete(report))
        }
    }

    async fn download_chunk<F>(&self, ctx: Context, chunk: Chunk, sink: &dyn Sink, base: u64, build: &F) -> Result<u64>
    where
        F: Fn(&Chunk) -> cumulo_http::Result<Request>,
    {
        let mut done = 0;
        let mut resumes = 0;
        while let Some(rest) = chunk.remainder(done) {
            match self.fetch_range(&ctx, rest, sink, base, build, &mut done).await? {
                Fetch::Complete => {}
                Fetch::Broken(e) if resumes < self.options.body_retries => {
                    resumes += 1;
                    debug!(index = chunk.index, done, resumes, error = %e, "resuming chunk body");
                }
                Fetch::Broken(e) => return Err(e.into()),
            }
        }
        Ok(chunk.length)
    }

    /// Request `range` and stream its body into the sink, advancing `done`
    /// as bytes are written so a broken stream can resume where it stopped.
    ///
    /// Failures of the request itself already went through the pipeline's
    /// retry policy and are returned as errors. Only a body that breaks
    /// while draining comes back as [`Fetch::Broken`].
    async fn fetch_range<F>(
        &self,
        ctx: &Context,
        range: Chunk,
        sink: &dyn Sink,
        base: u64,
        build: &F,
        done: &mut u64,
    ) -> Result<Fetch>
    where
        F: Fn(&Chunk) -> cumulo_http::Result<Request>,
    {
        let mut request = build(&range)?;
        let response = self.pipeline.send(ctx, &mut request).await?.error_for_status()?;
        check_served_range(&response, range)?;
        let mut body = response.into_body();

        let mut offset = range.offset;
        loop {
            let bytes = match body.next_chunk(ctx).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break,
                Err(e) if e.is_retryable() => return Ok(Fetch::Broken(e)),
                Err(e) => return Err(e.into()),
            };
            let len = bytes.len() as u64;
            if offset + len > range.end() {
                return Err(Error::Http(cumulo_http::Error::Parse(format!(
                    "chunk at {} returned more than {} bytes",
                    range.offset, range.length
                ))));
            }
            sink.write_at(offset - base, &bytes).await?;
            offset += len;
            *done += len;
        }
        if offset != range.end() {
            return Ok(Fetch::Broken(cumulo_http::Error::Body(format!(
                "chunk at {} ended after {} of {} bytes",
                range.offset,
                offset - range.offset,
                range.length
            ))));
        }
        Ok(Fetch::Complete)
    }

    async fn upload_chunk<F>(&self, ctx: Context, chunk: Chunk, source: &dyn Source, base: u64, build: &F) -> Result<u64>
    where
        F: Fn(&Chunk, Bytes) -> cumulo_http::Result<Request>,
    {
        let data = source.read_at(chunk.offset - base, chunk.length).await?;
        let mut request = build(&chunk, data)?;
        self.pipeline.send(&ctx, &mut request).await?.error_for_status()?;
        Ok(chunk.length)
    }
}

/// How one ranged request for a chunk ended.
enum Fetch {
    Complete,
    /// The body broke mid-stream; bytes written so far are kept.
    Broken(cumulo_http::Error),
}

/// A ranged read must come back as a 206 covering exactly `range`. A server
/// that ignores the range header would otherwise land the wrong bytes.
fn check_served_range(response: &Response, range: Chunk) -> Result<()> {
    if response.status() != 206 {
        return Err(Error::Http(cumulo_http::Error::Parse(format!(
            "chunk at {} answered with status {} instead of 206",
            range.offset,
            response.status()
        ))));
    }
    match response.content_range() {
        Some(served) if served.start == range.offset && served.end + 1 == range.end() => Ok(()),
        Some(served) => Err(Error::Http(cumulo_http::Error::Parse(format!(
            "chunk [{}, {}) was served as bytes {}-{}",
            range.offset,
            range.end(),
            served.start,
            served.end
        )))),
        None => Err(Error::Http(cumulo_http::Error::Parse(format!(
            "chunk at {} has no Content-Range",
            range.offset
        )))),
    }
}

fn chunk_error_status(error: &Error) -> Option<u16> {
    match error {
        Error::Http(e) => e.status(),
        _ => None,
    }
}
