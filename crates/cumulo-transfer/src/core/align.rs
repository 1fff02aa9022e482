use super::plan_chunks;
use crate::data::ChunkPlan;
use crate::error::{Error, Result};

/// Page blob write granularity.
pub const PAGE_SIZE: u64 = 512;

/// `align` must be a power of two.
pub fn align_down(n: u64, align: u64) -> u64 { n & !(align - 1) }

/// `align` must be a power of two. Saturates at the largest aligned `u64`.
pub fn align_up(n: u64, align: u64) -> u64 {
    match n.checked_add(align - 1) {
        Some(n) => n & !(align - 1),
        None => align_down(u64::MAX, align),
    }
}

pub fn is_aligned(n: u64, align: u64) -> bool { n & (align - 1) == 0 }

/// Reject a page range whose offset or length is not a multiple of
/// [`PAGE_SIZE`], or which is empty.
pub fn check_page_alignment(offset: u64, length: u64) -> Result<()> {
    if !is_aligned(offset, PAGE_SIZE) {
        return Err(Error::precondition(format!("page offset {offset} is not a multiple of {PAGE_SIZE}")));
    }
    if length == 0 || !is_aligned(length, PAGE_SIZE) {
        return Err(Error::precondition(format!("page length {length} is not a positive multiple of {PAGE_SIZE}")));
    }
    Ok(())
}

/// Plan a page range in chunks that are themselves page aligned.
///
/// The range is validated first; `chunk_size` is rounded down to a page
/// multiple (at least one page).
pub fn plan_page_chunks(offset: u64, length: u64, chunk_size: u64) -> Result<ChunkPlan> {
    check_page_alignment(offset, length)?;
    let chunk_size = align_down(chunk_size, PAGE_SIZE).max(PAGE_SIZE);
    plan_chunks(offset, length, chunk_size)
}
