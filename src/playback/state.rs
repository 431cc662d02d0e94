//! Playback state machine states.

use serde::{Deserialize, Serialize};

/// States of one playback session.
///
/// ```text
/// Idle / Finished / Error ──start(i)──▶ Synthesizing ──audio ready──▶ Playing
///                                     └─ i ≥ len ──▶ Finished          │  ▲
///                          Synthesizing ──synthesis failed──▶ Error     │  │
///                          Playing ──pause──▶ Paused ──resume───────────┘  │
///                          Playing ──clip done, next page──▶ Synthesizing  │
///                          Playing ──clip done, last page──▶ Finished      │
/// any state except Synthesizing ──next / prev──▶ Synthesizing ─────────────┘
/// any state ──stop──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing loaded or the session was stopped.
    #[default]
    Idle,

    /// A synthesis request for the current page is outstanding.
    Synthesizing,

    /// The current page's audio is playing.
    Playing,

    /// Playback is paused with the current page's audio still loaded.
    Paused,

    /// Every page has been played.
    Finished,

    /// The current page failed; the session stays at that page for retry.
    Error,
}

impl PlaybackState {
    /// `true` while the session is producing or emitting audio.
    ///
    /// ```
    /// use page_narrator::playback::PlaybackState;
    ///
    /// assert!(PlaybackState::Synthesizing.is_active());
    /// assert!(PlaybackState::Playing.is_active());
    /// assert!(!PlaybackState::Paused.is_active());
    /// assert!(!PlaybackState::Idle.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Synthesizing | PlaybackState::Playing)
    }

    /// States from which `start(index)` is accepted.
    pub fn accepts_start(&self) -> bool {
        matches!(
            self,
            PlaybackState::Idle | PlaybackState::Finished | PlaybackState::Error
        )
    }

    /// A short human-readable label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Synthesizing => "Preparing audio",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Finished => "Finished",
            PlaybackState::Error => "Error",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
    }

    #[test]
    fn start_is_accepted_only_from_resting_states() {
        use PlaybackState::*;
        for state in [Idle, Finished, Error] {
            assert!(state.accepts_start(), "{state:?}");
        }
        for state in [Synthesizing, Playing, Paused] {
            assert!(!state.accepts_start(), "{state:?}");
        }
    }

    #[test]
    fn labels_are_non_empty() {
        use PlaybackState::*;
        for state in [Idle, Synthesizing, Playing, Paused, Finished, Error] {
            assert!(!state.label().is_empty());
            assert_eq!(state.to_string(), state.label());
        }
    }
}
