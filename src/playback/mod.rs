//! Playback — the page-by-page narration state machine.
//!
//! # Overview
//!
//! A driver owns a [`PlaybackSession`] and calls the [`PlaybackController`]
//! from its refresh loop:
//!
//! ```text
//! driver ──start/pause/resume/next/prev/stop──▶ PlaybackController ──▶ SynthesisDispatcher
//!        ──tick() every frame────────────────▶        │              ──▶ AudioDevice
//!        ◀─observe()──────────────────────────        └──────────────▶ ProgressStore
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use page_narrator::audio::{AudioDevice, RodioRenderer};
//! use page_narrator::config::AppConfig;
//! use page_narrator::playback::{PlaybackController, PlaybackSession};
//! use page_narrator::progress::MemoryProgressStore;
//! use page_narrator::text::{Document, Paginator};
//! use page_narrator::tts::{BackgroundDispatcher, GoogleTtsGateway};
//!
//! let config = AppConfig::default();
//! let timeout = config.playback.synthesis_timeout();
//! let gateway = Arc::new(GoogleTtsGateway::from_config(&config.synthesis, timeout));
//! let dispatcher = BackgroundDispatcher::spawn(gateway, timeout).unwrap();
//! let device = AudioDevice::new(RodioRenderer::open_default().unwrap());
//!
//! let mut controller = PlaybackController::new(
//!     Box::new(dispatcher),
//!     device,
//!     Arc::new(MemoryProgressStore::new()),
//!     config.voice.clone(),
//!     config.user.user_id.clone(),
//! );
//! let pages = Paginator::new(config.paginator.max_page_bytes).paginate("Merhaba dünya.");
//! let mut session = PlaybackSession::new(Document::new("inline", "inline", 1), pages);
//!
//! controller.start(&mut session, 0).unwrap();
//! loop {
//!     controller.tick(&mut session).unwrap();
//!     if !controller.observe(&session).state.is_active() {
//!         break;
//!     }
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! ```

pub mod clock;
pub mod controller;
pub mod error;
pub mod session;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use controller::{PlaybackController, PlaybackResult, DEFAULT_GRACE_WINDOW};
pub use error::{ErrorKind, PlaybackError};
pub use session::{AudioCache, Observation, PlaybackSession};
pub use state::PlaybackState;
