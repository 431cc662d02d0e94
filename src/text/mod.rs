//! Document text: extraction, cleanup and pagination into speech pages.
//!
//! ```text
//! TextExtractor::extract(source)  ──▶ ExtractedText { blocks, physical_page_count }
//!        │
//!        ▼
//! clean_blocks(blocks, min_chars) ──▶ joined, de-hyphenated, non-empty blocks
//!        │
//!        ▼
//! Paginator::paginate_blocks      ──▶ Vec<SpeechPage>   (≤ max_page_bytes each)
//! ```
//!
//! [`prepare_pages`] runs the two pure steps in one call.

pub mod clean;
pub mod document;
pub mod extract;
pub mod paginate;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use clean::{clean_block, clean_blocks, normalize_whitespace, DEFAULT_MIN_BLOCK_CHARS};
pub use document::{Document, ExtractedText};
pub use extract::{
    extractor_for, html_to_text, ExtractionError, HtmlExtractor, PagedTextExtractor,
    TextExtractor,
};
pub use paginate::{Paginator, SpeechPage, DEFAULT_MAX_PAGE_BYTES};

use crate::config::PaginatorConfig;

/// Clean extracted blocks and paginate them with the configured limits.
pub fn prepare_pages(text: &ExtractedText, config: &PaginatorConfig) -> Vec<SpeechPage> {
    let blocks = clean_blocks(&text.blocks, config.min_block_chars);
    Paginator::new(config.max_page_bytes).paginate_blocks(&blocks)
}
