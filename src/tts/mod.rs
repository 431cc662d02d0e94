//! Text-to-speech: voice parameters, the synthesis gateway seam, the Google
//! Cloud TTS client and the dispatchers that run requests for the player.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use page_narrator::config::AppConfig;
//! use page_narrator::tts::{BackgroundDispatcher, GoogleTtsGateway, SynthesisGateway};
//!
//! let config = AppConfig::default();
//! let timeout = config.playback.synthesis_timeout();
//! let gateway: Arc<dyn SynthesisGateway> =
//!     Arc::new(GoogleTtsGateway::from_config(&config.synthesis, timeout));
//! let dispatcher = BackgroundDispatcher::spawn(gateway, timeout).unwrap();
//! # let _ = dispatcher;
//! ```

pub mod catalog;
pub mod dispatch;
pub mod gateway;
pub mod google;
pub mod voice;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use catalog::{CatalogReply, VoiceCatalog, VoiceDirectory};
pub use dispatch::{
    BackgroundDispatcher, InlineDispatcher, SynthesisDispatcher, SynthesisJob, SynthesisOutcome,
};
pub use gateway::{SynthesisError, SynthesisGateway};
pub use google::{filter_voices, GoogleTtsGateway, VoiceInfo};
pub use voice::{VoiceGender, VoiceParams, PITCH_RANGE, SPEAKING_RATE_RANGE};

// test-only re-export so the playback tests can import the mock gateway
// without reaching into `tts::gateway`.
#[cfg(test)]
pub use gateway::MockSynthesisGateway;
