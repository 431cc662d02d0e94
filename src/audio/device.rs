//! The process-wide audio device, shared by all playback sessions.
//!
//! There is one output device and at most one session may drive it at a
//! time.  [`AudioDevice`] wraps the renderer behind `Arc<Mutex<…>>` together
//! with a holder slot: a session must [`acquire`](AudioDevice::acquire) the
//! device before it can control it, and other sessions are refused with
//! [`RendererError::Busy`] until it [`release`](AudioDevice::release)s.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::renderer::{AudioRenderer, RendererError};

struct DeviceSlot {
    renderer: Box<dyn AudioRenderer>,
    holder: Option<u64>,
}

/// Cheap-to-clone handle to the shared output device.
#[derive(Clone)]
pub struct AudioDevice {
    slot: Arc<Mutex<DeviceSlot>>,
}

impl AudioDevice {
    pub fn new(renderer: impl AudioRenderer + 'static) -> Self {
        Self::from_boxed(Box::new(renderer))
    }

    pub fn from_boxed(renderer: Box<dyn AudioRenderer>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(DeviceSlot {
                renderer,
                holder: None,
            })),
        }
    }

    // A panic while holding the lock leaves the renderer usable; recover
    // the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, DeviceSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the device for `session`.  Re-acquiring by the current holder
    /// is a no-op.
    pub fn acquire(&self, session: u64) -> Result<(), RendererError> {
        let mut slot = self.lock();
        match slot.holder {
            Some(holder) if holder != session => Err(RendererError::Busy { holder }),
            _ => {
                if slot.holder.is_none() {
                    log::debug!("audio device: acquired by session {session}");
                }
                slot.holder = Some(session);
                Ok(())
            }
        }
    }

    /// Stop any clip and free the device, if `session` holds it.
    pub fn release(&self, session: u64) {
        let mut slot = self.lock();
        if slot.holder != Some(session) {
            return;
        }
        if let Err(e) = slot.renderer.stop() {
            log::warn!("audio device: stop on release failed: {e}");
        }
        slot.holder = None;
        log::debug!("audio device: released by session {session}");
    }

    /// Current holder, if any.
    pub fn holder(&self) -> Option<u64> {
        self.lock().holder
    }

    /// Run `f` against the renderer on behalf of `session`.
    ///
    /// Fails with [`RendererError::NotHolder`] unless `session` holds the
    /// device.
    pub fn with_renderer<T>(
        &self,
        session: u64,
        f: impl FnOnce(&mut dyn AudioRenderer) -> Result<T, RendererError>,
    ) -> Result<T, RendererError> {
        let mut slot = self.lock();
        if slot.holder != Some(session) {
            return Err(RendererError::NotHolder(session));
        }
        f(slot.renderer.as_mut())
    }

    /// Whether `session`'s clip is still playing.  Always `false` for a
    /// session that does not hold the device.
    pub fn is_busy(&self, session: u64) -> bool {
        let slot = self.lock();
        slot.holder == Some(session) && slot.renderer.is_busy()
    }
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice")
            .field("holder", &self.holder())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
