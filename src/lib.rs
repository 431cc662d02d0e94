//! page-narrator — reads documents aloud, one speech page at a time.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`text`] | extract, clean and paginate document text |
//! | [`tts`] | voice parameters, synthesis gateway, dispatchers |
//! | [`audio`] | poll-only renderer and the shared output device |
//! | [`playback`] | the per-session playback state machine |
//! | [`progress`] | per-user listening progress |
//! | [`config`] | settings file and application paths |
//! | [`app`] | the egui narrator window |

pub mod app;
pub mod audio;
pub mod config;
pub mod playback;
pub mod progress;
pub mod text;
pub mod tts;
