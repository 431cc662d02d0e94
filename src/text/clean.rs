//! Cleanup of raw extractor output before pagination.
//!
//! Page-oriented sources (PDF text dumps) arrive as one block per physical
//! page, with hard line breaks, words hyphenated across lines, and the odd
//! blank or image-only page.  [`clean_blocks`] turns those into flat,
//! speakable paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default threshold for [`clean_blocks`]: cleaned blocks of this many
/// characters or fewer are dropped.
pub const DEFAULT_MIN_BLOCK_CHARS: usize = 10;

/// A word broken with a hyphen at the end of a line: `foo-\nbar`.
static LINE_BREAK_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w)-[ \t]*\r?\n\s*(\w)").expect("static regex"));

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Collapse every whitespace run to a single space and trim the ends.
///
/// ```rust
/// use page_narrator::text::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("  a\n\n b\tc "), "a b c");
/// ```
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Join hyphenated line breaks, then flatten the block to one line.
///
/// ```rust
/// use page_narrator::text::clean_block;
///
/// assert_eq!(clean_block("a hyphen-\nated word\nwraps"), "a hyphenated word wraps");
/// ```
pub fn clean_block(raw: &str) -> String {
    let joined = LINE_BREAK_HYPHEN.replace_all(raw, "$1$2");
    normalize_whitespace(&joined)
}

/// Clean every physical-page block and drop the ones with no real content.
///
/// A block survives only when its cleaned form is longer than
/// `min_block_chars` characters (not bytes).
pub fn clean_blocks<S: AsRef<str>>(blocks: &[S], min_block_chars: usize) -> Vec<String> {
    let cleaned: Vec<String> = blocks
        .iter()
        .map(|b| clean_block(b.as_ref()))
        .filter(|b| b.chars().count() > min_block_chars)
        .collect();

    let dropped = blocks.len() - cleaned.len();
    if dropped > 0 {
        log::debug!("clean: dropped {dropped} of {} blocks as non-content", blocks.len());
    }
    cleaned
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_line_break_is_joined() {
        assert_eq!(clean_block("foo-\nbar"), "foobar");
        assert_eq!(clean_block("foo-  \r\n   bar baz"), "foobar baz");
    }

    #[test]
    fn inline_hyphen_is_kept() {
        assert_eq!(clean_block("well-known fact"), "well-known fact");
    }

    #[test]
    fn dash_between_spaced_words_is_kept() {
        assert_eq!(clean_block("yes -\nno"), "yes - no");
    }

    #[test]
    fn line_fragments_are_joined_with_spaces() {
        assert_eq!(
            clean_block("first line\nsecond line\n\n  third"),
            "first line second line third"
        );
    }

    #[test]
    fn hyphenation_works_with_non_ascii_letters() {
        assert_eq!(clean_block("güzel-\nlik"), "güzellik");
    }

    #[test]
    fn short_blocks_are_dropped() {
        let blocks = [
            "",
            "   \n  ",
            "12",
            "exactly10c",
            "a page with enough words to keep",
        ];
        let cleaned = clean_blocks(&blocks, DEFAULT_MIN_BLOCK_CHARS);
        assert_eq!(cleaned, vec!["a page with enough words to keep".to_string()]);
    }

    #[test]
    fn threshold_counts_characters_not_bytes() {
        // 11 characters, 22 bytes.
        let block = "şşşşşşşşşşş";
        assert_eq!(clean_blocks(&[block], 10), vec![block.to_string()]);
    }

    #[test]
    fn block_order_is_preserved() {
        let blocks = ["page one has text", "x", "page three has text"];
        let cleaned = clean_blocks(&blocks, DEFAULT_MIN_BLOCK_CHARS);
        assert_eq!(cleaned, vec!["page one has text", "page three has text"]);
    }
}
