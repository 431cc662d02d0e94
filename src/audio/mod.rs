//! Audio output — a poll-only renderer shared by every playback session.
//!
//! # Layout
//!
//! ```text
//! PlaybackController → AudioDevice (exclusive lease) → dyn AudioRenderer
//!                                                        └─ RodioRenderer → speakers
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use page_narrator::audio::{AudioDevice, RodioRenderer};
//!
//! let device = AudioDevice::new(RodioRenderer::open_default().unwrap());
//! device.acquire(1).unwrap();
//! device.with_renderer(1, |r| r.stop()).unwrap();
//! device.release(1);
//! ```

pub mod device;
pub mod renderer;
pub mod rodio_backend;

pub use device::AudioDevice;
pub use renderer::{AudioRenderer, RendererError};
pub use rodio_backend::RodioRenderer;

#[cfg(test)]
pub use renderer::{MockRenderer, RendererCall};
