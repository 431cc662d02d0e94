//! Synthesis dispatch — how the playback controller runs gateway requests.
//!
//! The controller never awaits a synthesis request itself.  It hands a
//! [`SynthesisJob`] to a [`SynthesisDispatcher`] and picks the
//! [`SynthesisOutcome`] up on a later `tick()`.  Every job carries the
//! session id and generation it was issued under so the controller can
//! discard outcomes that arrive after the user moved on.
//!
//! ```text
//! controller.start()  ── dispatch(job{session, generation, index}) ──▶ dispatcher
//! controller.tick()   ◀─ poll() -> Some(outcome{session, generation, result}) ──
//! ```
//!
//! * [`InlineDispatcher`] runs the request to completion inside `dispatch`
//!   and queues the outcome; suited to tests and headless drivers.
//! * [`BackgroundDispatcher`] runs requests on one dedicated worker thread,
//!   strictly in submission order, so a UI thread never blocks and no two
//!   requests are ever in flight at once.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use super::gateway::{SynthesisError, SynthesisGateway};
use super::voice::VoiceParams;

// ---------------------------------------------------------------------------
// Job / outcome
// ---------------------------------------------------------------------------

/// One page to synthesize.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisJob {
    pub session_id: u64,
    pub generation: u64,
    pub index: usize,
    pub text: String,
    pub voice: VoiceParams,
}

/// The result of a [`SynthesisJob`], tagged with the job's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutcome {
    pub session_id: u64,
    pub generation: u64,
    pub index: usize,
    pub result: Result<Vec<u8>, SynthesisError>,
}

impl SynthesisOutcome {
    fn for_job(job: &SynthesisJob, result: Result<Vec<u8>, SynthesisError>) -> Self {
        Self {
            session_id: job.session_id,
            generation: job.generation,
            index: job.index,
            result,
        }
    }
}

async fn run_job(
    gateway: &dyn SynthesisGateway,
    job: &SynthesisJob,
    timeout: Duration,
) -> Result<Vec<u8>, SynthesisError> {
    match tokio::time::timeout(timeout, gateway.synthesize(&job.text, &job.voice)).await {
        Ok(Ok(audio)) if audio.is_empty() => Err(SynthesisError::EmptyAudio),
        Ok(result) => result,
        Err(_) => Err(SynthesisError::Timeout),
    }
}

pub(super) fn current_thread_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

// ---------------------------------------------------------------------------
// SynthesisDispatcher trait
// ---------------------------------------------------------------------------

/// Queue of synthesis work owned by one playback controller.
pub trait SynthesisDispatcher: Send {
    /// Submit a job.  Never blocks on the network for the background
    /// implementation.
    fn dispatch(&mut self, job: SynthesisJob);

    /// Take the next finished outcome, if any, in submission order.
    fn poll(&mut self) -> Option<SynthesisOutcome>;

    /// Jobs submitted but not yet returned by [`poll`](Self::poll).
    fn in_flight(&self) -> usize;
}

// ---------------------------------------------------------------------------
// InlineDispatcher
// ---------------------------------------------------------------------------

/// Runs each job synchronously on the caller's thread.
///
/// Must not be used from inside a tokio runtime: it drives its own
/// current-thread runtime with `block_on`.
pub struct InlineDispatcher {
    gateway: Arc<dyn SynthesisGateway>,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
    ready: VecDeque<SynthesisOutcome>,
}

impl InlineDispatcher {
    pub fn new(gateway: Arc<dyn SynthesisGateway>, timeout: Duration) -> std::io::Result<Self> {
        Ok(Self {
            gateway,
            timeout,
            runtime: current_thread_runtime()?,
            ready: VecDeque::new(),
        })
    }
}

impl SynthesisDispatcher for InlineDispatcher {
    fn dispatch(&mut self, job: SynthesisJob) {
        let result = self
            .runtime
            .block_on(run_job(self.gateway.as_ref(), &job, self.timeout));
        self.ready.push_back(SynthesisOutcome::for_job(&job, result));
    }

    fn poll(&mut self) -> Option<SynthesisOutcome> {
        self.ready.pop_front()
    }

    fn in_flight(&self) -> usize {
        self.ready.len()
    }
}

// ---------------------------------------------------------------------------
// BackgroundDispatcher
// ---------------------------------------------------------------------------

/// Identity of a submitted job, kept so that jobs lost with the worker can
/// still be reported.
#[derive(Debug, Clone, Copy)]
struct Pending {
    session_id: u64,
    generation: u64,
    index: usize,
}

/// Runs jobs on a dedicated `synthesis-worker` thread, one at a time.
///
/// Dropping the dispatcher closes the job channel; the worker exits after
/// the request it is currently running, if any.
pub struct BackgroundDispatcher {
    jobs: mpsc::Sender<SynthesisJob>,
    outcomes: mpsc::Receiver<SynthesisOutcome>,
    pending: VecDeque<Pending>,
    failed: VecDeque<SynthesisOutcome>,
}

impl BackgroundDispatcher {
    /// Spawn the worker thread.
    pub fn spawn(gateway: Arc<dyn SynthesisGateway>, timeout: Duration) -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<SynthesisJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel::<SynthesisOutcome>();

        std::thread::Builder::new()
            .name("synthesis-worker".into())
            .spawn(move || {
                let runtime = match current_thread_runtime() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("synthesis worker: could not build runtime: {e}");
                        return;
                    }
                };

                while let Ok(job) = job_rx.recv() {
                    log::debug!(
                        "synthesis worker: page {} (session {}, generation {})",
                        job.index,
                        job.session_id,
                        job.generation
                    );
                    let result = runtime.block_on(run_job(gateway.as_ref(), &job, timeout));
                    if outcome_tx.send(SynthesisOutcome::for_job(&job, result)).is_err() {
                        break;
                    }
                }
                log::debug!("synthesis worker: job channel closed, exiting");
            })?;

        Ok(Self {
            jobs: job_tx,
            outcomes: outcome_rx,
            pending: VecDeque::new(),
            failed: VecDeque::new(),
        })
    }

    fn worker_gone(pending: Pending) -> SynthesisOutcome {
        SynthesisOutcome {
            session_id: pending.session_id,
            generation: pending.generation,
            index: pending.index,
            result: Err(SynthesisError::WorkerGone(
                "synthesis worker thread stopped".into(),
            )),
        }
    }
}

impl SynthesisDispatcher for BackgroundDispatcher {
    fn dispatch(&mut self, job: SynthesisJob) {
        let pending = Pending {
            session_id: job.session_id,
            generation: job.generation,
            index: job.index,
        };
        match self.jobs.send(job) {
            Ok(()) => self.pending.push_back(pending),
            Err(_) => {
                log::error!("synthesis: worker is gone, page {} not dispatched", pending.index);
                self.failed.push_back(Self::worker_gone(pending));
            }
        }
    }

    fn poll(&mut self) -> Option<SynthesisOutcome> {
        if let Some(outcome) = self.failed.pop_front() {
            return Some(outcome);
        }
        match self.outcomes.try_recv() {
            Ok(outcome) => {
                self.pending.pop_front();
                Some(outcome)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            // Worker died with jobs outstanding: report them in order.
            Err(mpsc::TryRecvError::Disconnected) => {
                self.pending.pop_front().map(Self::worker_gone)
            }
        }
    }

    fn in_flight(&self) -> usize {
        self.pending.len() + self.failed.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::gateway::MockSynthesisGateway;
    use async_trait::async_trait;
    use std::time::Instant;

    fn job(index: usize, generation: u64, text: &str) -> SynthesisJob {
        SynthesisJob {
            session_id: 7,
            generation,
            index,
            text: text.into(),
            voice: VoiceParams::default(),
        }
    }

    /// Poll until an outcome arrives or two seconds pass.
    fn wait_for(dispatcher: &mut dyn SynthesisDispatcher) -> SynthesisOutcome {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(outcome) = dispatcher.poll() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "no synthesis outcome within 2 s");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    struct SlowGateway;

    #[async_trait]
    impl SynthesisGateway for SlowGateway {
        async fn synthesize(&self, _text: &str, _voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1])
        }
    }

    struct SilentGateway;

    #[async_trait]
    impl SynthesisGateway for SilentGateway {
        async fn synthesize(&self, _text: &str, _voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn inline_outcome_is_ready_after_dispatch() {
        let gateway = MockSynthesisGateway::new();
        let mut d = InlineDispatcher::new(Arc::new(gateway.clone()), Duration::from_secs(1)).unwrap();

        assert!(d.poll().is_none());
        d.dispatch(job(3, 1, "page three"));
        assert_eq!(d.in_flight(), 1);

        let outcome = d.poll().expect("outcome");
        assert_eq!(outcome.index, 3);
        assert_eq!(outcome.generation, 1);
        assert_eq!(outcome.session_id, 7);
        assert_eq!(outcome.result.unwrap(), b"audio:page three");
        assert_eq!(d.in_flight(), 0);
        assert_eq!(gateway.call_count(), 1);
    }

    #[test]
    fn inline_reports_gateway_failure() {
        let gateway = MockSynthesisGateway::new();
        gateway.fail_on("bad");
        let mut d = InlineDispatcher::new(Arc::new(gateway), Duration::from_secs(1)).unwrap();

        d.dispatch(job(0, 0, "bad"));
        assert!(d.poll().unwrap().result.is_err());
    }

    #[test]
    fn inline_times_out_slow_gateway() {
        let mut d = InlineDispatcher::new(Arc::new(SlowGateway), Duration::from_millis(20)).unwrap();
        d.dispatch(job(0, 0, "slow"));
        assert_eq!(d.poll().unwrap().result, Err(SynthesisError::Timeout));
    }

    #[test]
    fn empty_audio_is_an_error() {
        let mut d = InlineDispatcher::new(Arc::new(SilentGateway), Duration::from_secs(1)).unwrap();
        d.dispatch(job(0, 0, "quiet"));
        assert_eq!(d.poll().unwrap().result, Err(SynthesisError::EmptyAudio));
    }

    #[test]
    fn background_returns_outcomes_in_submission_order() {
        let gateway = MockSynthesisGateway::new();
        let mut d = BackgroundDispatcher::spawn(Arc::new(gateway.clone()), Duration::from_secs(1)).unwrap();

        d.dispatch(job(0, 0, "first"));
        d.dispatch(job(1, 0, "second"));
        assert_eq!(d.in_flight(), 2);

        assert_eq!(wait_for(&mut d).index, 0);
        assert_eq!(wait_for(&mut d).index, 1);
        assert_eq!(d.in_flight(), 0);
        assert_eq!(gateway.calls(), vec!["first", "second"]);
    }

    #[test]
    fn background_times_out_slow_gateway() {
        let mut d = BackgroundDispatcher::spawn(Arc::new(SlowGateway), Duration::from_millis(20)).unwrap();
        d.dispatch(job(0, 0, "slow"));
        assert_eq!(wait_for(&mut d).result, Err(SynthesisError::Timeout));
    }
}
