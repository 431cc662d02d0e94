//! Greedy word-wise splitting of document text into speech pages.
//!
//! A speech page is the unit handed to one synthesis request, so its UTF-8
//! size is capped by the synthesis service's request limit.  Words are never
//! split: a single word longer than the ceiling becomes its own over-limit
//! page rather than being truncated or dropped.
//!
//! # Example
//!
//! ```rust
//! use page_narrator::text::Paginator;
//!
//! let pages = Paginator::new(11).paginate("alpha beta gamma delta");
//! let texts: Vec<&str> = pages.iter().map(|p| p.text.as_str()).collect();
//! assert_eq!(texts, vec!["alpha beta", "gamma delta"]);
//! ```

use serde::{Deserialize, Serialize};

/// Default byte ceiling per page.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 4_800;

// ---------------------------------------------------------------------------
// SpeechPage
// ---------------------------------------------------------------------------

/// One bounded chunk of text, sized for a single synthesis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechPage {
    /// 0-based position in the page sequence.
    pub index: usize,
    /// Page text, single-space separated, never starting or ending in
    /// whitespace.
    pub text: String,
    /// UTF-8 byte length of `text`.
    pub byte_length: usize,
}

impl SpeechPage {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let byte_length = text.len();
        Self {
            index,
            text,
            byte_length,
        }
    }

    /// `true` when the page holds nothing to speak.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// `true` when the page exceeds `ceiling`, which only happens for a page
    /// made of one oversized word.
    pub fn is_oversized(&self, ceiling: usize) -> bool {
        self.byte_length > ceiling
    }
}

// ---------------------------------------------------------------------------
// Paginator
// ---------------------------------------------------------------------------

/// Splits text into [`SpeechPage`]s no larger than `max_page_bytes`.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    max_page_bytes: usize,
}

impl Paginator {
    pub fn new(max_page_bytes: usize) -> Self {
        Self { max_page_bytes }
    }

    pub fn max_page_bytes(&self) -> usize {
        self.max_page_bytes
    }

    /// Split `text` into pages.
    ///
    /// Whitespace of any kind separates words and is normalised to single
    /// spaces.  Empty or whitespace-only input yields no pages.
    pub fn paginate(&self, text: &str) -> Vec<SpeechPage> {
        let mut pages = Vec::new();
        let mut acc = String::new();

        for word in text.split_whitespace() {
            if acc.is_empty() {
                acc.push_str(word);
                continue;
            }

            // Length of `acc + " " + word`.
            let candidate = acc.len() + 1 + word.len();
            if candidate > self.max_page_bytes {
                self.close_page(&mut pages, std::mem::take(&mut acc));
                acc.push_str(word);
            } else {
                acc.push(' ');
                acc.push_str(word);
            }
        }

        if !acc.is_empty() {
            self.close_page(&mut pages, acc);
        }

        log::debug!(
            "paginate: {} bytes -> {} pages (ceiling {})",
            text.len(),
            pages.len(),
            self.max_page_bytes
        );
        pages
    }

    /// Join cleaned physical-page blocks into one word stream and paginate.
    ///
    /// Physical page boundaries do not survive this step: a speech page may
    /// span the end of one physical page and the start of the next.
    pub fn paginate_blocks<S: AsRef<str>>(&self, blocks: &[S]) -> Vec<SpeechPage> {
        let joined = blocks
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        self.paginate(&joined)
    }

    fn close_page(&self, pages: &mut Vec<SpeechPage>, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        if text.len() > self.max_page_bytes {
            log::warn!(
                "paginate: word of {} bytes exceeds the {}-byte ceiling; kept as its own page",
                text.len(),
                self.max_page_bytes
            );
        }
        pages.push(SpeechPage::new(pages.len(), text));
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGE_BYTES)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
