use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::{Error, Result};

/// Random-access destination for downloaded bytes.
///
/// Concurrent chunks call `write_at` with disjoint ranges. Implementations
/// that cannot write concurrently serialize the write call only.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Bytes the sink can hold, if bounded.
    fn capacity(&self) -> Option<u64>;
}

/// Writes into a caller-owned buffer.
#[derive(Debug)]
pub struct BufferSink<'a> {
    buffer:   Mutex<&'a mut [u8]>,
    capacity: u64,
}

impl<'a> BufferSink<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let capacity = buffer.len() as u64;
        Self {
            buffer: Mutex::new(buffer),
            capacity,
        }
    }
}

#[async_trait]
impl Sink for BufferSink<'_> {
    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .filter(|end| *end <= self.capacity)
            .ok_or_else(|| {
                Error::precondition(format!(
                    "write of {} bytes at {offset} exceeds buffer capacity {}",
                    data.len(),
                    self.capacity
                ))
            })?;
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn capacity(&self) -> Option<u64> { Some(self.capacity) }
}

/// Writes into a file pre-sized to the transfer length.
#[derive(Debug)]
pub struct FileSink {
    file:   tokio::sync::Mutex<File>,
    path:   PathBuf,
    length: u64,
}

impl FileSink {
    /// Create or truncate `path` and size it to `length` bytes, so chunk
    /// writes at any offset are plain random-access writes.
    pub async fn create(path: impl AsRef<Path>, length: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        file.set_len(length).await?;
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
            path,
            length,
        })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Flush buffered writes and sync file contents to disk.
    pub async fn sync(&self) -> Result<()> {
        let mut file = self.file.lock().await;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset.saturating_add(data.len() as u64) > self.length {
            return Err(Error::precondition(format!(
                "write of {} bytes at {offset} runs past file length {}",
                data.len(),
                self.length
            )));
        }
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        Ok(())
    }

    fn capacity(&self) -> Option<u64> { Some(self.length) }
}
