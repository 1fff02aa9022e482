//! Pure decoding of service responses.

pub mod headers;
pub mod xml;

pub use xml::{parse_error_body, parse_page_list, render_block_list};
