//! The playback controller — drives one session through its speech pages.
//!
//! The controller is called repeatedly by a driver (the egui frame loop in
//! the binary).  Every call performs at most one state transition and
//! returns; nothing here blocks on the network.  Synthesis runs through the
//! injected [`SynthesisDispatcher`] and its outcome is applied by a later
//! [`tick`](PlaybackController::tick).
//!
//! Two guards keep the machine honest:
//!
//! * **Generation** — `next`, `prev` and `stop` bump the session's
//!   generation; a synthesis outcome tagged with an older generation is
//!   dropped instead of applied.  Outcomes for other sessions sharing the
//!   controller are parked until that session ticks.
//! * **Grace window** — a renderer that reports "not busy" right after
//!   `play()` may simply not have started yet, so completion is only
//!   accepted once the grace window has elapsed since playback started.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::clock::{Clock, SystemClock};
use super::error::PlaybackError;
use super::session::{AudioCache, Observation, PlaybackSession};
use super::state::PlaybackState;
use crate::audio::AudioDevice;
use crate::progress::{ProgressSnapshot, ProgressStore};
use crate::tts::{SynthesisDispatcher, SynthesisJob, SynthesisOutcome, VoiceParams};

/// Default time after `play()` before an idle renderer counts as finished.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(1_000);

/// Result of a controller call: the state the session ended up in.
pub type PlaybackResult = Result<PlaybackState, PlaybackError>;

pub struct PlaybackController {
    dispatcher: Box<dyn SynthesisDispatcher>,
    device: AudioDevice,
    progress: Arc<dyn ProgressStore>,
    voice: VoiceParams,
    user_id: String,
    grace_window: Duration,
    clock: Box<dyn Clock>,
    /// Outcomes drained on behalf of a different session.
    parked: VecDeque<SynthesisOutcome>,
}

impl PlaybackController {
    pub fn new(
        dispatcher: Box<dyn SynthesisDispatcher>,
        device: AudioDevice,
        progress: Arc<dyn ProgressStore>,
        voice: VoiceParams,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            device,
            progress,
            voice,
            user_id: user_id.into(),
            grace_window: DEFAULT_GRACE_WINDOW,
            clock: Box::new(SystemClock),
            parked: VecDeque::new(),
        }
    }

    pub fn with_grace_window(mut self, grace_window: Duration) -> Self {
        self.grace_window = grace_window;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn voice(&self) -> &VoiceParams {
        &self.voice
    }

    /// Voice used for pages synthesized from now on.
    pub fn set_voice(&mut self, voice: VoiceParams) {
        self.voice = voice;
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The shared output device sessions are played on.
    pub fn device(&self) -> &AudioDevice {
        &self.device
    }

    // -----------------------------------------------------------------------
    // Driver surface
    // -----------------------------------------------------------------------

    /// Begin playback at `index`.
    ///
    /// Accepted from `Idle`, `Finished` and `Error`; ignored otherwise.
    /// Blank pages are skipped; an index past the last page finishes the
    /// session without synthesizing anything.
    pub fn start(&mut self, session: &mut PlaybackSession, index: usize) -> PlaybackResult {
        if !session.state.accepts_start() {
            log::debug!(
                "playback: start({index}) ignored while {}",
                session.state.label()
            );
            return Ok(session.state);
        }
        self.begin_page(session, index)
    }

    /// `Playing → Paused`.  A no-op in every other state.
    pub fn pause(&mut self, session: &mut PlaybackSession) -> PlaybackResult {
        if session.state != PlaybackState::Playing {
            log::debug!("playback: pause ignored while {}", session.state.label());
            return Ok(session.state);
        }
        let index = session.current_index;
        if let Err(e) = self.device.with_renderer(session.id, |r| r.pause()) {
            return self.fail(session, PlaybackError::from_renderer(index, e));
        }
        self.transition(session, PlaybackState::Paused);
        Ok(PlaybackState::Paused)
    }

    /// `Paused → Playing` with the audio already loaded.
    pub fn resume(&mut self, session: &mut PlaybackSession) -> PlaybackResult {
        if session.state != PlaybackState::Paused {
            log::debug!("playback: resume ignored while {}", session.state.label());
            return Ok(session.state);
        }
        let index = session.current_index;
        if let Err(e) = self.device.with_renderer(session.id, |r| r.resume()) {
            return self.fail(session, PlaybackError::from_renderer(index, e));
        }
        session.playback_started_at = Some(self.clock.now());
        self.transition(session, PlaybackState::Playing);
        Ok(PlaybackState::Playing)
    }

    /// Move to the following page.  A no-op on the last page.
    pub fn next(&mut self, session: &mut PlaybackSession) -> PlaybackResult {
        if Self::refuses_navigation(session) {
            return Ok(session.state);
        }
        let target = session.current_index + 1;
        if target >= session.total_pages() {
            log::debug!("playback: next ignored on the last page");
            return Ok(session.state);
        }
        self.seek(session, target)
    }

    /// Move to the preceding page.  A no-op on the first page.
    pub fn prev(&mut self, session: &mut PlaybackSession) -> PlaybackResult {
        if Self::refuses_navigation(session) {
            return Ok(session.state);
        }
        let Some(target) = session.current_index.checked_sub(1) else {
            log::debug!("playback: prev ignored on the first page");
            return Ok(session.state);
        };
        self.seek(session, target)
    }

    /// Tear the session down to `Idle`, keeping its pages and position.
    ///
    /// Stopping an `Idle` session writes no progress: it either never
    /// started or its position was already reported.
    pub fn stop(&mut self, session: &mut PlaybackSession) -> PlaybackResult {
        self.device.release(session.id);
        session.generation += 1;
        session.audio_cache = None;
        session.playback_started_at = None;
        self.parked.retain(|o| o.session_id != session.id);

        if session.state != PlaybackState::Idle {
            let completed = session.state == PlaybackState::Finished;
            self.report(session, session.page_number(), completed);
        }
        self.transition(session, PlaybackState::Idle);
        Ok(PlaybackState::Idle)
    }

    /// Apply any finished synthesis and check for end of page.
    pub fn tick(&mut self, session: &mut PlaybackSession) -> PlaybackResult {
        let mut backlog: Vec<SynthesisOutcome> = self.parked.drain(..).collect();
        while let Some(outcome) = self.dispatcher.poll() {
            backlog.push(outcome);
        }

        let mut fresh = None;
        for outcome in backlog {
            if outcome.session_id != session.id {
                self.parked.push_back(outcome);
            } else if self.is_current(session, &outcome) {
                fresh = Some(outcome);
            } else {
                log::warn!(
                    "playback: discarding stale synthesis for page {} (session {} gen {}, now gen {})",
                    outcome.index + 1,
                    session.id,
                    outcome.generation,
                    session.generation
                );
            }
        }

        if let Some(outcome) = fresh {
            return self.apply_outcome(session, outcome);
        }

        match session.state {
            PlaybackState::Playing => self.check_completion(session),
            state => Ok(state),
        }
    }

    pub fn observe(&self, session: &PlaybackSession) -> Observation {
        session.observation()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn refuses_navigation(session: &PlaybackSession) -> bool {
        let refused = session.state == PlaybackState::Synthesizing;
        if refused {
            log::debug!("playback: navigation ignored while synthesizing");
        }
        refused
    }

    fn seek(&mut self, session: &mut PlaybackSession, target: usize) -> PlaybackResult {
        self.stop_renderer(session);
        session.generation += 1;
        self.begin_page(session, target)
    }

    fn begin_page(&mut self, session: &mut PlaybackSession, index: usize) -> PlaybackResult {
        let Some(index) = session.first_readable_from(index) else {
            return Ok(self.finish(session));
        };
        if index != session.current_index {
            session.playback_started_at = None;
        }
        session.current_index = index;
        session.last_error = None;

        if let Some(bytes) = session.cached_audio(index) {
            let bytes = bytes.to_vec();
            log::debug!("playback: page {} served from cache", index + 1);
            return self.play_audio(session, bytes);
        }

        let job = SynthesisJob {
            session_id: session.id,
            generation: session.generation,
            index,
            text: session.pages[index].text.clone(),
            voice: self.voice.clone(),
        };
        self.dispatcher.dispatch(job);
        self.transition(session, PlaybackState::Synthesizing);
        Ok(PlaybackState::Synthesizing)
    }

    fn is_current(&self, session: &PlaybackSession, outcome: &SynthesisOutcome) -> bool {
        session.state == PlaybackState::Synthesizing
            && outcome.session_id == session.id
            && outcome.generation == session.generation
            && outcome.index == session.current_index
    }

    fn apply_outcome(
        &mut self,
        session: &mut PlaybackSession,
        outcome: SynthesisOutcome,
    ) -> PlaybackResult {
        match outcome.result {
            Ok(bytes) => {
                session.audio_cache = Some(AudioCache {
                    index: outcome.index,
                    bytes: bytes.clone(),
                });
                self.play_audio(session, bytes)
            }
            Err(source) => self.fail(
                session,
                PlaybackError::Synthesis {
                    index: outcome.index,
                    source,
                },
            ),
        }
    }

    fn play_audio(&mut self, session: &mut PlaybackSession, bytes: Vec<u8>) -> PlaybackResult {
        let index = session.current_index;
        let id = session.id;
        let played = self.device.acquire(id).and_then(|()| {
            self.device.with_renderer(id, |r| {
                r.load(bytes)?;
                r.play()
            })
        });
        if let Err(e) = played {
            return self.fail(session, PlaybackError::from_renderer(index, e));
        }

        session.playback_started_at = Some(self.clock.now());
        self.report(session, index + 1, false);
        self.transition(session, PlaybackState::Playing);
        Ok(PlaybackState::Playing)
    }

    fn check_completion(&mut self, session: &mut PlaybackSession) -> PlaybackResult {
        if self.device.is_busy(session.id) {
            return Ok(PlaybackState::Playing);
        }
        let Some(started) = session.playback_started_at else {
            return Ok(PlaybackState::Playing);
        };
        if self.clock.now().saturating_duration_since(started) <= self.grace_window {
            return Ok(PlaybackState::Playing);
        }

        log::debug!("playback: page {} done", session.current_index + 1);
        self.begin_page(session, session.current_index + 1)
    }

    fn finish(&mut self, session: &mut PlaybackSession) -> PlaybackState {
        self.device.release(session.id);
        session.current_index = session.total_pages().saturating_sub(1);
        session.playback_started_at = None;
        session.last_error = None;
        self.transition(session, PlaybackState::Finished);
        self.report(session, session.total_pages(), true);
        log::info!("playback: finished {}", session.document.title);
        PlaybackState::Finished
    }

    fn fail(&mut self, session: &mut PlaybackSession, error: PlaybackError) -> PlaybackResult {
        log::error!("playback: {} failed: {error}", error.kind().as_str());
        session.last_error = Some(error.clone());
        self.transition(session, PlaybackState::Error);
        Err(error)
    }

    fn stop_renderer(&self, session: &PlaybackSession) {
        if self.device.holder() != Some(session.id) {
            return;
        }
        if let Err(e) = self.device.with_renderer(session.id, |r| r.stop()) {
            log::warn!("playback: renderer stop failed: {e}");
        }
    }

    fn transition(&self, session: &mut PlaybackSession, to: PlaybackState) {
        if session.state != to {
            log::debug!(
                "playback: session {} {} -> {} (page {})",
                session.id,
                session.state.label(),
                to.label(),
                session.current_index + 1
            );
        }
        session.state = to;
        session.last_transition_at = Some(self.clock.now());
    }

    // Progress failures never interrupt playback.
    fn report(&self, session: &PlaybackSession, current_page: usize, completed: bool) {
        let snapshot = ProgressSnapshot::new(
            session.document.id.clone(),
            self.user_id.clone(),
            session.total_pages(),
            current_page,
            completed,
        );
        if let Err(e) = self.progress.save(snapshot) {
            log::error!("playback: could not save progress: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
