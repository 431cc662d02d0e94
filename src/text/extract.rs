//! Text extractors — turn a document source into raw text.
//!
//! [`TextExtractor`] is the seam the rest of the crate depends on.  Two
//! implementations ship with the crate:
//!
//! * [`PagedTextExtractor`] reads plain text in which physical pages are
//!   separated by form feeds (`\x0C`), the format written by `pdftotext`.
//!   Sources may be local paths or `http(s)` URLs.
//! * [`HtmlExtractor`] downloads an HTML page and strips it to visible text.
//!
//! An extraction that yields no text is an error: callers must not create a
//! playback session for it.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::clean::normalize_whitespace;
use super::document::ExtractedText;

const FORM_FEED: char = '\x0C';
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const FETCH_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// ExtractionError
// ---------------------------------------------------------------------------

/// Errors raised while turning a source into text.
///
/// None of these are retryable against the same source.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// The local file could not be read.
    #[error("could not read {path}: {message}")]
    Io { path: String, message: String },

    /// The remote source could not be fetched.
    #[error("could not fetch {url}: {message}")]
    Http { url: String, message: String },

    /// The source was readable but contained no usable text.
    #[error("no readable text found in {0}")]
    Empty(String),
}

// ---------------------------------------------------------------------------
// TextExtractor trait
// ---------------------------------------------------------------------------

/// Async interface for page-oriented text extraction.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract one raw block per physical page from `source`.
    async fn extract(&self, source: &str) -> Result<ExtractedText, ExtractionError>;

    /// Fetch a web page and return its visible text as one flat string.
    async fn extract_html(&self, url: &str) -> Result<String, ExtractionError> {
        fetch_html_text(&http_client(), url).await
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, ExtractionError> {
    let http_err = |e: reqwest::Error| ExtractionError::Http {
        url: url.to_string(),
        message: e.to_string(),
    };

    client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(http_err)?
        .text()
        .await
        .map_err(http_err)
}

async fn fetch_html_text(client: &reqwest::Client, url: &str) -> Result<String, ExtractionError> {
    let html = fetch_text(client, url).await?;
    let text = html_to_text(&html);
    if text.is_empty() {
        return Err(ExtractionError::Empty(url.to_string()));
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// PagedTextExtractor
// ---------------------------------------------------------------------------

/// Reads form-feed separated plain text from a path or URL.
pub struct PagedTextExtractor {
    client: reqwest::Client,
}

impl PagedTextExtractor {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    /// Split `raw` into physical-page blocks.
    ///
    /// A trailing form feed (as `pdftotext` writes after the last page) does
    /// not count as an extra page.
    pub fn split_pages(raw: &str) -> ExtractedText {
        let mut blocks: Vec<String> = raw.split(FORM_FEED).map(str::to_string).collect();
        if blocks.len() > 1 && blocks.last().is_some_and(|b| b.trim().is_empty()) {
            blocks.pop();
        }
        ExtractedText::new(blocks)
    }
}

impl Default for PagedTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PagedTextExtractor {
    async fn extract(&self, source: &str) -> Result<ExtractedText, ExtractionError> {
        let raw = if is_url(source) {
            fetch_text(&self.client, source).await?
        } else {
            tokio::fs::read_to_string(source)
                .await
                .map_err(|e| ExtractionError::Io {
                    path: source.to_string(),
                    message: e.to_string(),
                })?
        };

        let text = Self::split_pages(&raw);
        if text.is_empty() {
            return Err(ExtractionError::Empty(source.to_string()));
        }

        log::info!(
            "extract: {} physical pages from {source}",
            text.physical_page_count
        );
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// HtmlExtractor
// ---------------------------------------------------------------------------

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("static regex")
});

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));

/// Reduce an HTML document to its visible text, space-separated.
///
/// ```rust
/// use page_narrator::text::html_to_text;
///
/// let html = "<p>Hello <b>world</b></p><script>var x = 1;</script>";
/// assert_eq!(html_to_text(html), "Hello world");
/// ```
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_OR_STYLE.replace_all(html, " ");
    let without_comments = COMMENT.replace_all(&without_scripts, " ");
    let without_tags = TAG.replace_all(&without_comments, " ");
    normalize_whitespace(&decode_entities(&without_tags))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        // Last, so "&amp;lt;" decodes to "&lt;" and not "<".
        .replace("&amp;", "&")
}

/// Downloads an HTML page and extracts its visible text.
pub struct HtmlExtractor {
    client: reqwest::Client,
}

impl HtmlExtractor {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for HtmlExtractor {
    /// An HTML page is a single physical page.  Local files are read from
    /// disk; anything else is fetched.
    async fn extract(&self, source: &str) -> Result<ExtractedText, ExtractionError> {
        let text = if is_url(source) {
            self.extract_html(source).await?
        } else {
            let html = tokio::fs::read_to_string(source)
                .await
                .map_err(|e| ExtractionError::Io {
                    path: source.to_string(),
                    message: e.to_string(),
                })?;
            html_to_text(&html)
        };
        if text.is_empty() {
            return Err(ExtractionError::Empty(source.to_string()));
        }
        Ok(ExtractedText::new(vec![text]))
    }

    async fn extract_html(&self, url: &str) -> Result<String, ExtractionError> {
        fetch_html_text(&self.client, url).await
    }
}

// ---------------------------------------------------------------------------
// Source routing
// ---------------------------------------------------------------------------

/// `true` for `.html`/`.htm` sources and for URLs that do not name a `.txt`
/// file.
fn looks_like_html(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    path.ends_with(".html") || path.ends_with(".htm") || (is_url(path) && !path.ends_with(".txt"))
}

/// Pick an extractor for `source`: web pages go to [`HtmlExtractor`],
/// everything else to [`PagedTextExtractor`].
pub fn extractor_for(source: &str) -> Box<dyn TextExtractor> {
    if looks_like_html(source) {
        Box::new(HtmlExtractor::new())
    } else {
        Box::new(PagedTextExtractor::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
