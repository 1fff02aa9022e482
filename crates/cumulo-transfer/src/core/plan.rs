use crate::data::{Chunk, ChunkPlan};
use crate::error::{Error, Result};

/// Clamp a requested chunk size into `[min, max]`.
///
/// A `min` above `max` is treated as `max`.
pub fn clamp_chunk_size(hint: u64, min: u64, max: u64) -> u64 {
    let max = max.max(1);
    hint.clamp(min.min(max), max).max(1)
}

/// Split `[start, start + length)` into chunks of `chunk_size` bytes.
///
/// Chunks are contiguous and non-overlapping. Every chunk but the last is
/// exactly `chunk_size` long; the last one holds the remainder. An empty
/// range yields an empty plan.
///
/// # Errors
///
/// Returns a precondition error when `chunk_size` is zero, when the range
/// overflows `u64`, or when it needs more than `u32::MAX` chunks.
///
/// # Examples
///
/// ```
/// use cumulo_transfer::plan_chunks;
///
/// const MB: u64 = 1024 * 1024;
/// let plan = plan_chunks(0, 10 * MB, 4 * MB).unwrap();
/// let spans: Vec<_> = plan.iter().map(|c| (c.offset, c.length)).collect();
/// assert_eq!(spans, [(0, 4 * MB), (4 * MB, 4 * MB), (8 * MB, 2 * MB)]);
/// ```
pub fn plan_chunks(start: u64, length: u64, chunk_size: u64) -> Result<ChunkPlan> {
    if chunk_size == 0 {
        return Err(Error::precondition("chunk size must be greater than 0"));
    }
    let end = start
        .checked_add(length)
        .ok_or_else(|| Error::precondition("range end overflows u64"))?;

    let count = length.div_ceil(chunk_size);
    let count = u32::try_from(count).map_err(|_| Error::precondition(format!("{count} chunks exceed the plan limit")))?;

    let mut chunks = Vec::with_capacity(count as usize);
    let mut offset = start;
    for index in 0..count {
        let len = chunk_size.min(end - offset);
        chunks.push(Chunk { index, offset, length: len });
        offset += len;
    }

    Ok(ChunkPlan { start, length, chunks })
}
