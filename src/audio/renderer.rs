//! The `AudioRenderer` trait — a poll-only playback device.
//!
//! A renderer plays one loaded clip at a time and cannot notify anyone when
//! the clip ends; callers learn about completion by polling
//! [`is_busy`](AudioRenderer::is_busy).

use thiserror::Error;

// ---------------------------------------------------------------------------
// RendererError
// ---------------------------------------------------------------------------

/// Errors raised by the audio output path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendererError {
    /// The output device could not be opened (missing hardware, denied
    /// permission).  Fatal: no playback session can be created.
    #[error("audio output unavailable: {0}")]
    Init(String),

    /// Loading or controlling a clip failed.  Retryable.
    #[error("audio playback failed: {0}")]
    Runtime(String),

    /// Another session currently holds the device.
    #[error("audio device is in use by session {holder}")]
    Busy { holder: u64 },

    /// The caller tried to control a device it does not hold.
    #[error("session {0} does not hold the audio device")]
    NotHolder(u64),
}

// ---------------------------------------------------------------------------
// AudioRenderer trait
// ---------------------------------------------------------------------------

/// Single-clip audio output.
///
/// Implementations must be `Send` so the shared [`AudioDevice`] can move
/// between threads.
///
/// [`AudioDevice`]: crate::audio::AudioDevice
pub trait AudioRenderer: Send {
    /// Replace the current clip with `audio` (encoded, e.g. MP3).  The clip
    /// is loaded paused; call [`play`](Self::play) to start it.
    fn load(&mut self, audio: Vec<u8>) -> Result<(), RendererError>;

    fn play(&mut self) -> Result<(), RendererError>;

    fn pause(&mut self) -> Result<(), RendererError>;

    /// Continue a paused clip from where it stopped.
    fn resume(&mut self) -> Result<(), RendererError>;

    /// Stop and discard the current clip.
    fn stop(&mut self) -> Result<(), RendererError>;

    /// `true` while a clip is audibly playing.  Paused or finished clips are
    /// not busy.
    fn is_busy(&self) -> bool;
}

// Compile-time assertion: Box<dyn AudioRenderer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioRenderer>) {}
};

// ---------------------------------------------------------------------------
// MockRenderer  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{MockRenderer, RendererCall};

#[cfg(test)]
mod mock {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// One call made against a [`MockRenderer`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RendererCall {
        Load(Vec<u8>),
        Play,
        Pause,
        Resume,
        Stop,
    }

    #[derive(Default)]
    struct MockState {
        calls: Vec<RendererCall>,
        loaded: bool,
        playing: bool,
        paused: bool,
        fail_next_load: bool,
    }

    /// A renderer that records calls and plays "forever" until a test calls
    /// [`finish_clip`](Self::finish_clip).
    ///
    /// Clones share state.
    #[derive(Clone, Default)]
    pub struct MockRenderer {
        state: Arc<Mutex<MockState>>,
    }

    impl MockRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Simulate the current clip reaching its end.
        pub fn finish_clip(&self) {
            self.state.lock().unwrap().playing = false;
        }

        /// Make the next `load` fail with a runtime error.
        pub fn fail_next_load(&self) {
            self.state.lock().unwrap().fail_next_load = true;
        }

        pub fn calls(&self) -> Vec<RendererCall> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn call_count(&self) -> usize {
            self.state.lock().unwrap().calls.len()
        }

        pub fn clear_calls(&self) {
            self.state.lock().unwrap().calls.clear();
        }
    }

    impl AudioRenderer for MockRenderer {
        fn load(&mut self, audio: Vec<u8>) -> Result<(), RendererError> {
            let mut st = self.state.lock().unwrap();
            st.calls.push(RendererCall::Load(audio));
            if st.fail_next_load {
                st.fail_next_load = false;
                return Err(RendererError::Runtime("decoder rejected clip".into()));
            }
            st.loaded = true;
            st.playing = false;
            st.paused = false;
            Ok(())
        }

        fn play(&mut self) -> Result<(), RendererError> {
            let mut st = self.state.lock().unwrap();
            st.calls.push(RendererCall::Play);
            st.playing = st.loaded;
            st.paused = false;
            Ok(())
        }

        fn pause(&mut self) -> Result<(), RendererError> {
            let mut st = self.state.lock().unwrap();
            st.calls.push(RendererCall::Pause);
            st.paused = true;
            Ok(())
        }

        fn resume(&mut self) -> Result<(), RendererError> {
            let mut st = self.state.lock().unwrap();
            st.calls.push(RendererCall::Resume);
            st.paused = false;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), RendererError> {
            let mut st = self.state.lock().unwrap();
            st.calls.push(RendererCall::Stop);
            st.loaded = false;
            st.playing = false;
            st.paused = false;
            Ok(())
        }

        fn is_busy(&self) -> bool {
            let st = self.state.lock().unwrap();
            st.playing && !st.paused
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_is_busy_only_while_playing_unpaused() {
        let mut r = MockRenderer::new();
        assert!(!r.is_busy());

        r.load(vec![1, 2, 3]).unwrap();
        assert!(!r.is_busy());

        r.play().unwrap();
        assert!(r.is_busy());

        r.pause().unwrap();
        assert!(!r.is_busy());

        r.resume().unwrap();
        assert!(r.is_busy());

        r.finish_clip();
        assert!(!r.is_busy());
    }

    #[test]
    fn mock_records_calls() {
        let mut r = MockRenderer::new();
        r.load(vec![9]).unwrap();
        r.play().unwrap();
        r.stop().unwrap();
        assert_eq!(
            r.calls(),
            vec![RendererCall::Load(vec![9]), RendererCall::Play, RendererCall::Stop]
        );
    }

    #[test]
    fn renderer_errors_display() {
        assert_eq!(
            RendererError::Busy { holder: 4 }.to_string(),
            "audio device is in use by session 4"
        );
    }
}
