//! Playback error taxonomy.

use thiserror::Error;

use crate::audio::RendererError;
use crate::text::ExtractionError;
use crate::tts::SynthesisError;

/// Coarse error category, used by drivers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source produced no text.  Pick a different source.
    Extraction,
    /// A page could not be synthesized.  Retry with `start(index)`.
    Synthesis,
    /// The audio device could not be opened.  No session can exist.
    RendererInit,
    /// A page could not be loaded or controlled.  Retry with `start(index)`.
    RendererRuntime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Extraction => "extraction",
            ErrorKind::Synthesis => "synthesis",
            ErrorKind::RendererInit => "renderer-init",
            ErrorKind::RendererRuntime => "renderer-runtime",
        }
    }
}

/// Every error a driver can see, tagged with its [`ErrorKind`].
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("page {page}: {source}", page = .index + 1)]
    Synthesis {
        index: usize,
        #[source]
        source: SynthesisError,
    },

    #[error("{0}")]
    RendererInit(RendererError),

    #[error("page {page}: {source}", page = .index + 1)]
    RendererRuntime {
        index: usize,
        #[source]
        source: RendererError,
    },
}

impl PlaybackError {
    /// Classify a renderer failure that happened while handling page `index`.
    pub fn from_renderer(index: usize, error: RendererError) -> Self {
        match error {
            RendererError::Init(_) => PlaybackError::RendererInit(error),
            source => PlaybackError::RendererRuntime { index, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::Extraction(_) => ErrorKind::Extraction,
            PlaybackError::Synthesis { .. } => ErrorKind::Synthesis,
            PlaybackError::RendererInit(_) => ErrorKind::RendererInit,
            PlaybackError::RendererRuntime { .. } => ErrorKind::RendererRuntime,
        }
    }

    /// `true` when re-entering `start` at the failing page may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Synthesis | ErrorKind::RendererRuntime
        )
    }

    /// The page the error is attached to, for per-page failures.
    pub fn page_index(&self) -> Option<usize> {
        match self {
            PlaybackError::Synthesis { index, .. }
            | PlaybackError::RendererRuntime { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_retryability() {
        let synth = PlaybackError::Synthesis {
            index: 3,
            source: SynthesisError::Timeout,
        };
        assert_eq!(synth.kind(), ErrorKind::Synthesis);
        assert!(synth.is_retryable());
        assert_eq!(synth.page_index(), Some(3));

        let extraction = PlaybackError::from(ExtractionError::Empty("x.txt".into()));
        assert_eq!(extraction.kind(), ErrorKind::Extraction);
        assert!(!extraction.is_retryable());
        assert_eq!(extraction.page_index(), None);
    }

    #[test]
    fn renderer_errors_are_split_by_phase() {
        let init = PlaybackError::from_renderer(0, RendererError::Init("no device".into()));
        assert_eq!(init.kind(), ErrorKind::RendererInit);
        assert!(!init.is_retryable());

        let runtime = PlaybackError::from_renderer(2, RendererError::Runtime("decode".into()));
        assert_eq!(runtime.kind(), ErrorKind::RendererRuntime);
        assert!(runtime.is_retryable());
        assert_eq!(runtime.page_index(), Some(2));
    }

    #[test]
    fn message_uses_one_based_page() {
        let err = PlaybackError::Synthesis {
            index: 3,
            source: SynthesisError::Timeout,
        };
        assert!(err.to_string().starts_with("page 4: "), "{err}");
    }
}
