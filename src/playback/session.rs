//! Per-session mutable state, owned by the driver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::error::PlaybackError;
use super::state::PlaybackState;
use crate::text::{Document, SpeechPage};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Audio for one page, kept so `resume` and retries skip synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCache {
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// One user's traversal of a document's speech pages.
///
/// The driver owns the session and passes it by `&mut` into every
/// [`PlaybackController`](super::PlaybackController) call.  The controller
/// holds the audio device on the session's behalf until `stop()` or
/// `Finished`, so a driver discarding a session should `stop()` it first.
#[derive(Debug)]
pub struct PlaybackSession {
    pub(super) id: u64,
    pub(super) document: Document,
    pub(super) pages: Vec<SpeechPage>,
    pub(super) current_index: usize,
    pub(super) state: PlaybackState,
    pub(super) audio_cache: Option<AudioCache>,
    pub(super) generation: u64,
    pub(super) last_transition_at: Option<Instant>,
    pub(super) playback_started_at: Option<Instant>,
    pub(super) last_error: Option<PlaybackError>,
}

impl PlaybackSession {
    /// Create an `Idle` session positioned at the first page.
    pub fn new(document: Document, pages: Vec<SpeechPage>) -> Self {
        Self::new_at(document, pages, 0)
    }

    /// Create an `Idle` session positioned at `index`, usually a resume
    /// point.  Out-of-range indices fall back to the first page.
    pub fn new_at(document: Document, pages: Vec<SpeechPage>, index: usize) -> Self {
        let current_index = if index < pages.len() { index } else { 0 };
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "session {id}: {} ({} speech pages, {} physical)",
            document.title,
            pages.len(),
            document.physical_page_count
        );
        Self {
            id,
            document,
            pages,
            current_index,
            state: PlaybackState::Idle,
            audio_cache: None,
            generation: 0,
            last_transition_at: None,
            playback_started_at: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn pages(&self) -> &[SpeechPage] {
        &self.pages
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn last_transition_at(&self) -> Option<Instant> {
        self.last_transition_at
    }

    pub fn current_page(&self) -> Option<&SpeechPage> {
        self.pages.get(self.current_index)
    }

    /// 1-indexed position for display and progress; `total_pages` once
    /// finished.
    pub fn page_number(&self) -> usize {
        if self.state == PlaybackState::Finished {
            return self.total_pages();
        }
        (self.current_index + 1).min(self.total_pages())
    }

    /// First non-blank page at or after `index`.
    pub(super) fn first_readable_from(&self, index: usize) -> Option<usize> {
        (index..self.pages.len()).find(|&i| !self.pages[i].is_blank())
    }

    pub(super) fn cached_audio(&self, index: usize) -> Option<&[u8]> {
        self.audio_cache
            .as_ref()
            .filter(|c| c.index == index)
            .map(|c| c.bytes.as_slice())
    }

    pub fn observation(&self) -> Observation {
        Observation {
            current_index: self.current_index,
            state: self.state,
            total_pages: self.total_pages(),
            current_page: self.page_number(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}

/// Read-only view of a session handed to drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub current_index: usize,
    pub state: PlaybackState,
    pub total_pages: usize,
    /// 1-indexed; equals `total_pages` when finished.
    pub current_page: usize,
    pub last_error: Option<String>,
}

impl Observation {
    /// Completed fraction for a progress bar.
    pub fn fraction(&self) -> f32 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.current_page as f32 / self.total_pages as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Paginator;

    fn session(text: &str) -> PlaybackSession {
        let pages = Paginator::new(12).paginate(text);
        PlaybackSession::new(Document::new("doc", "Doc", 1), pages)
    }

    #[test]
    fn ids_are_unique() {
        let a = session("one");
        let b = session("two");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn new_session_is_idle_at_first_page() {
        let s = session("alpha beta gamma delta");
        let obs = s.observation();
        assert_eq!(obs.state, PlaybackState::Idle);
        assert_eq!(obs.current_index, 0);
        assert_eq!(obs.current_page, 1);
        assert_eq!(obs.total_pages, s.total_pages());
        assert!(obs.last_error.is_none());
    }

    #[test]
    fn session_can_open_at_a_resume_point() {
        let pages = (0..4).map(|i| SpeechPage::new(i, format!("page {i}"))).collect();
        let s = PlaybackSession::new_at(Document::new("doc", "Doc", 4), pages, 2);
        assert_eq!(s.current_index(), 2);
        assert_eq!(s.page_number(), 3);
        assert_eq!(s.state(), PlaybackState::Idle);

        let pages = (0..4).map(|i| SpeechPage::new(i, format!("page {i}"))).collect();
        let s = PlaybackSession::new_at(Document::new("doc", "Doc", 4), pages, 9);
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn empty_session_reports_zero_pages() {
        let s = session("   ");
        assert_eq!(s.total_pages(), 0);
        assert_eq!(s.page_number(), 0);
        assert_eq!(s.observation().fraction(), 0.0);
    }

    #[test]
    fn blank_pages_are_skipped_forward() {
        let pages = vec![
            SpeechPage::new(0, "first page"),
            SpeechPage::new(1, "   "),
            SpeechPage::new(2, "third page"),
        ];
        let s = PlaybackSession::new(Document::new("doc", "Doc", 3), pages);
        assert_eq!(s.first_readable_from(1), Some(2));
        assert_eq!(s.first_readable_from(3), None);
    }

    #[test]
    fn cache_only_matches_its_index() {
        let mut s = session("alpha beta");
        s.audio_cache = Some(AudioCache {
            index: 0,
            bytes: vec![1, 2],
        });
        assert_eq!(s.cached_audio(0), Some(&[1u8, 2][..]));
        assert_eq!(s.cached_audio(1), None);
    }
}
