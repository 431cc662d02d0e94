//! Core `SynthesisGateway` trait and its error type.
//!
//! # Overview
//!
//! [`SynthesisGateway`] is the interface the playback controller depends on
//! (through a [`SynthesisDispatcher`](crate::tts::SynthesisDispatcher)).  It
//! is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SynthesisGateway>` and moved onto a worker thread.
//!
//! [`GoogleTtsGateway`](crate::tts::GoogleTtsGateway) is the production
//! implementation.  [`MockSynthesisGateway`] (available under `#[cfg(test)]`)
//! records every request and fails on demand.

use async_trait::async_trait;
use thiserror::Error;

use super::voice::VoiceParams;

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Errors from a synthesis request.
///
/// All variants are retryable: re-issuing the request for the same page is
/// always safe.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    /// No API key configured for the synthesis service.
    #[error("synthesis service is not configured: {0}")]
    NotConfigured(String),

    /// HTTP transport or connection error.
    #[error("synthesis request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("synthesis service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request did not complete in time.
    #[error("synthesis request timed out")]
    Timeout,

    /// The response could not be decoded into audio bytes.
    #[error("failed to decode synthesis response: {0}")]
    Decode(String),

    /// The service returned no audio.
    #[error("synthesis service returned no audio")]
    EmptyAudio,

    /// The worker running synthesis jobs is gone.
    #[error("synthesis worker unavailable: {0}")]
    WorkerGone(String),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else if let Some(status) = e.status() {
            SynthesisError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SynthesisGateway trait
// ---------------------------------------------------------------------------

/// Async text-to-speech interface.
///
/// # Contract
///
/// - Returns encoded audio (MP3 for the Google gateway) ready for
///   [`AudioRenderer::load`](crate::audio::AudioRenderer::load).
/// - Never returns `Ok` with an empty buffer.
#[async_trait]
pub trait SynthesisGateway: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError>;
}

// Compile-time assertion: Box<dyn SynthesisGateway> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SynthesisGateway>) {}
};

// ---------------------------------------------------------------------------
// MockSynthesisGateway  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockSynthesisGateway;

#[cfg(test)]
mod mock {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct MockState {
        calls: Vec<String>,
        failing: HashSet<String>,
    }

    /// A test double that returns `b"audio:<text>"` for every request and
    /// records what it was asked to say.
    ///
    /// Clones share state, so a test can keep one handle while the
    /// dispatcher owns another.
    #[derive(Clone, Default)]
    pub struct MockSynthesisGateway {
        state: Arc<Mutex<MockState>>,
    }

    impl MockSynthesisGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every request for `text` fail until [`heal`](Self::heal).
        pub fn fail_on(&self, text: &str) {
            self.state.lock().unwrap().failing.insert(text.to_string());
        }

        pub fn heal(&self, text: &str) {
            self.state.lock().unwrap().failing.remove(text);
        }

        /// Texts requested so far, in order.
        pub fn calls(&self) -> Vec<String> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn call_count(&self) -> usize {
            self.state.lock().unwrap().calls.len()
        }
    }

    #[async_trait]
    impl SynthesisGateway for MockSynthesisGateway {
        async fn synthesize(
            &self,
            text: &str,
            _voice: &VoiceParams,
        ) -> Result<Vec<u8>, SynthesisError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(text.to_string());
            if state.failing.contains(text) {
                return Err(SynthesisError::Request(format!("refused: {text}")));
            }
            Ok(format!("audio:{text}").into_bytes())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_calls_and_returns_audio() {
        let gateway = MockSynthesisGateway::new();
        let audio = gateway
            .synthesize("merhaba", &VoiceParams::default())
            .await
            .unwrap();
        assert_eq!(audio, b"audio:merhaba");
        assert_eq!(gateway.calls(), vec!["merhaba"]);
    }

    #[tokio::test]
    async fn mock_fails_until_healed() {
        let gateway = MockSynthesisGateway::new();
        gateway.fail_on("page");
        assert!(gateway.synthesize("page", &VoiceParams::default()).await.is_err());

        gateway.heal("page");
        assert!(gateway.synthesize("page", &VoiceParams::default()).await.is_ok());
        assert_eq!(gateway.call_count(), 2);
    }

    #[test]
    fn errors_render_human_readable_messages() {
        let err = SynthesisError::Status {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(
            err.to_string(),
            "synthesis service returned HTTP 403: forbidden"
        );
        assert_eq!(SynthesisError::Timeout.to_string(), "synthesis request timed out");
    }
}
