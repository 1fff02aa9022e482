use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{Error, Result};

/// Random-access origin of uploaded bytes.
#[async_trait]
pub trait Source: Send + Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool { self.len() == 0 }

    /// Exactly `length` bytes starting at `offset`.
    async fn read_at(&self, offset: u64, length: u64) -> Result<Bytes>;
}

fn check_bounds(offset: u64, length: u64, total: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= total => Ok(()),
        _ => Err(Error::precondition(format!(
            "read of {length} bytes at {offset} exceeds source length {total}"
        ))),
    }
}

/// In-memory source. Reads are zero-copy slices.
#[derive(Debug, Clone)]
pub struct BufferSource(Bytes);

impl BufferSource {
    pub fn new(data: impl Into<Bytes>) -> Self { Self(data.into()) }
}

#[async_trait]
impl Source for BufferSource {
    fn len(&self) -> u64 { self.0.len() as u64 }

    async fn read_at(&self, offset: u64, length: u64) -> Result<Bytes> {
        check_bounds(offset, length, self.len())?;
        Ok(self.0.slice(offset as usize..(offset + length) as usize))
    }
}

/// File-backed source; reads are serialized on one handle.
#[derive(Debug)]
pub struct FileSource {
    file:   tokio::sync::Mutex<File>,
    length: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path).await?;
        let length = file.metadata().await?.len();
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
            length,
        })
    }
}

#[async_trait]
impl Source for FileSource {
    fn len(&self) -> u64 { self.length }

    async fn read_at(&self, offset: u64, length: u64) -> Result<Bytes> {
        check_bounds(offset, length, self.length)?;
        let mut buf = BytesMut::zeroed(length as usize);
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(&mut buf).await?;
        Ok(buf.freeze())
    }
}
