//! Pure planning for chunked transfers.

mod align;
mod plan;

pub use align::{PAGE_SIZE, align_down, align_up, check_page_alignment, is_aligned, plan_page_chunks};
pub use plan::{clamp_chunk_size, plan_chunks};
