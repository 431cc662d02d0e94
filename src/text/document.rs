//! Resolved document metadata and raw extractor output.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A document resolved from a source URL or path.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Source URL or filesystem path; also the key for stored progress.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Number of physical pages in the source.  Display-only: resume is
    /// addressed by logical speech page, never by physical page.
    pub physical_page_count: usize,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, physical_page_count: usize) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            physical_page_count,
        }
    }

    /// Build a document whose title is derived from the last path/URL
    /// segment, without its extension.
    ///
    /// ```rust
    /// use page_narrator::text::Document;
    ///
    /// let doc = Document::from_source("https://example.org/books/nutuk.txt", 3);
    /// assert_eq!(doc.title, "nutuk");
    /// ```
    pub fn from_source(source: &str, physical_page_count: usize) -> Self {
        let last_segment = source
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(source);
        let title = Path::new(last_segment)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(source);
        Self::new(source, title, physical_page_count)
    }
}

/// Output of a page-oriented extraction: one raw text block per physical
/// page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub blocks: Vec<String>,
    pub physical_page_count: usize,
}

impl ExtractedText {
    pub fn new(blocks: Vec<String>) -> Self {
        let physical_page_count = blocks.len();
        Self {
            blocks,
            physical_page_count,
        }
    }

    /// `true` when no block contains any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_local_path() {
        let doc = Document::from_source("/home/me/books/Kuyucakli Yusuf.txt", 12);
        assert_eq!(doc.title, "Kuyucakli Yusuf");
        assert_eq!(doc.id, "/home/me/books/Kuyucakli Yusuf.txt");
        assert_eq!(doc.physical_page_count, 12);
    }

    #[test]
    fn title_from_url_with_trailing_slash() {
        let doc = Document::from_source("https://example.org/read/sefiller/", 0);
        assert_eq!(doc.title, "sefiller");
    }

    #[test]
    fn extracted_text_counts_physical_pages() {
        let text = ExtractedText::new(vec!["a".into(), "".into(), "b".into()]);
        assert_eq!(text.physical_page_count, 3);
        assert!(!text.is_empty());
        assert!(ExtractedText::new(vec!["  ".into(), "\n".into()]).is_empty());
    }
}
