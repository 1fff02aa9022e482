use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream};

use crate::data::Context;
use crate::error::{Error, Result};

/// A boxed stream type for request and response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// One-way, pull-based byte source with an optional declared length.
///
/// The stream is never copied; it moves from the transport into the
/// response and from there to whoever drains it. Dropping it releases the
/// underlying connection. The read position only moves forward.
///
/// When a length is declared, ending early or producing extra bytes is a
/// [`Error::Body`] failure rather than a silent short read.
pub struct BodyStream {
    inner:    BoxStream<'static, Result<Bytes>>,
    length:   Option<u64>,
    position: u64,
    pending:  Bytes,
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream")
            .field("length", &self.length)
            .field("position", &self.position)
            .field("inner", &"{ ... }")
            .finish()
    }
}

impl BodyStream {
    pub fn new<S>(stream: S, length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            length,
            position: 0,
            pending: Bytes::new(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes: Bytes = bytes.into();
        let length = bytes.len() as u64;
        Self::new(stream::iter((!bytes.is_empty()).then_some(Ok(bytes))), Some(length))
    }

    pub fn empty() -> Self { Self::from_bytes(Bytes::new()) }

    /// Declared total length, if known.
    pub fn length(&self) -> Option<u64> { self.length }

    /// Bytes handed out so far.
    pub fn position(&self) -> u64 { self.position }

    pub fn remaining(&self) -> Option<u64> { self.length.map(|len| len.saturating_sub(self.position)) }

    /// Next run of bytes, or `None` at the end of the stream.
    ///
    /// Waits race the context, so a cancelled transfer stops at the next read.
    pub async fn next_chunk(&mut self, ctx: &Context) -> Result<Option<Bytes>> {
        if !self.pending.is_empty() {
            let chunk = std::mem::take(&mut self.pending);
            self.position += chunk.len() as u64;
            return Ok(Some(chunk));
        }
        loop {
            let next = ctx.run(async { Ok(self.inner.next().await) }).await?;
            match next {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => {
                    let position = self.position + chunk.len() as u64;
                    if let Some(len) = self.length {
                        if position > len {
                            return Err(Error::Body(format!("stream produced more than the declared {len} bytes")));
                        }
                    }
                    self.position = position;
                    return Ok(Some(chunk));
                }
                Some(Err(e)) => return Err(e),
                None => {
                    if let Some(len) = self.length {
                        if self.position < len {
                            return Err(Error::Body(format!(
                                "stream ended after {} of {len} bytes",
                                self.position
                            )));
                        }
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Read at most `buf.len()` bytes. Returns 0 only at the end of the stream.
    pub async fn read(&mut self, ctx: &Context, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(mut chunk) = self.next_chunk(ctx).await? else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            let rest = chunk.split_off(n);
            self.position -= rest.len() as u64;
            self.pending = rest;
        }
        Ok(n)
    }

    /// Drain the stream into one contiguous buffer.
    pub async fn read_to_end(mut self, ctx: &Context) -> Result<Bytes> {
        let capacity = self.remaining().unwrap_or(0).min(64 * 1024 * 1024) as usize;
        let mut first: Option<Bytes> = None;
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next_chunk(ctx).await? {
            // A single-chunk body is returned without copying.
            if first.is_none() && buf.is_empty() {
                first = Some(chunk);
                continue;
            }
            if let Some(prev) = first.take() {
                buf.reserve(capacity.max(prev.len() + chunk.len()));
                buf.extend_from_slice(&prev);
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(first.unwrap_or_else(|| buf.freeze()))
    }

    /// Hand the remaining bytes to a transport as a plain stream.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        let pending = (!self.pending.is_empty()).then_some(Ok(self.pending));
        Box::pin(stream::iter(pending).chain(self.inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(parts: &[&'static [u8]], length: Option<u64>) -> BodyStream {
        let items: Vec<Result<Bytes>> = parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        BodyStream::new(stream::iter(items), length)
    }

    #[tokio::test]
    async fn test_read_to_end_joins_chunks() {
        let ctx = Context::new();
        let body = chunked(&[b"ab", b"", b"cd", b"e"], Some(5));
        assert_eq!(&body.read_to_end(&ctx).await.unwrap()[..], b"abcde");
    }

    #[tokio::test]
    async fn test_bounded_read_keeps_remainder() {
        let ctx = Context::new();
        let mut body = chunked(&[b"hello world"], None);
        let mut buf = [0u8; 4];

        assert_eq!(body.read(&ctx, &mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"hell");
        assert_eq!(body.position(), 4);

        let rest = body.read_to_end(&ctx).await.unwrap();
        assert_eq!(&rest[..], b"o world");
    }

    #[tokio::test]
    async fn test_read_returns_zero_at_end() {
        let ctx = Context::new();
        let mut body = BodyStream::empty();
        let mut buf = [0u8; 8];
        assert_eq!(body.read(&ctx, &mut buf).await.unwrap(), 0);
        assert_eq!(body.length(), Some(0));
    }

    #[tokio::test]
    async fn test_short_stream_is_an_error() {
        let ctx = Context::new();
        let body = chunked(&[b"abc"], Some(10));
        let err = body.read_to_end(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Body(_)));
    }

    #[tokio::test]
    async fn test_long_stream_is_an_error() {
        let ctx = Context::new();
        let body = chunked(&[b"abc", b"def"], Some(4));
        assert!(matches!(body.read_to_end(&ctx).await, Err(Error::Body(_))));
    }

    #[tokio::test]
    async fn test_cancelled_read_stops() {
        let ctx = Context::new();
        let mut body = BodyStream::new(stream::pending::<Result<Bytes>>(), None);
        ctx.cancel();
        assert!(matches!(body.next_chunk(&ctx).await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_into_stream_keeps_pending_bytes() {
        let ctx = Context::new();
        let mut body = chunked(&[b"abcdef"], Some(6));
        let mut buf = [0u8; 2];
        body.read(&ctx, &mut buf).await.unwrap();

        let rest: Vec<Bytes> = body.into_stream().map(|r| r.unwrap()).collect().await;
        assert_eq!(rest.concat(), b"cdef");
    }
}
