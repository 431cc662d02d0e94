//! Voice catalog — listing and previewing voices without blocking the UI.
//!
//! [`VoiceCatalog`] owns a `voice-catalog` worker thread.  Requests are
//! queued with [`request_voices`](VoiceCatalog::request_voices) /
//! [`request_preview`](VoiceCatalog::request_preview) and answered through
//! [`poll`](VoiceCatalog::poll), in submission order.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::dispatch::current_thread_runtime;
use super::gateway::SynthesisError;
use super::google::VoiceInfo;
use super::voice::{VoiceGender, VoiceParams};

// ---------------------------------------------------------------------------
// VoiceDirectory trait
// ---------------------------------------------------------------------------

/// A service that can enumerate voices and voice a sample sentence.
#[async_trait]
pub trait VoiceDirectory: Send + Sync {
    /// Voices for `language_code`, optionally restricted to one gender.
    async fn list_voices(
        &self,
        language_code: &str,
        gender: Option<VoiceGender>,
    ) -> Result<Vec<VoiceInfo>, SynthesisError>;

    /// Audio of the preview sentence spoken by voice `name`.
    async fn preview_voice(&self, voice: &VoiceParams, name: &str)
        -> Result<Vec<u8>, SynthesisError>;
}

// Compile-time check: VoiceDirectory must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn VoiceDirectory) {}
};

// ---------------------------------------------------------------------------
// Requests / replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum CatalogRequest {
    Voices {
        language_code: String,
        gender: Option<VoiceGender>,
    },
    Preview {
        voice: VoiceParams,
        name: String,
    },
}

/// Answer to one catalog request.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogReply {
    Voices(Result<Vec<VoiceInfo>, SynthesisError>),
    Preview {
        name: String,
        result: Result<Vec<u8>, SynthesisError>,
    },
}

impl CatalogReply {
    fn failed(request: CatalogRequest, error: SynthesisError) -> Self {
        match request {
            CatalogRequest::Voices { .. } => CatalogReply::Voices(Err(error)),
            CatalogRequest::Preview { name, .. } => CatalogReply::Preview {
                name,
                result: Err(error),
            },
        }
    }
}

async fn answer(
    directory: &dyn VoiceDirectory,
    request: CatalogRequest,
    timeout: Duration,
) -> CatalogReply {
    match request {
        CatalogRequest::Voices {
            language_code,
            gender,
        } => {
            let result = tokio::time::timeout(timeout, directory.list_voices(&language_code, gender))
                .await
                .unwrap_or(Err(SynthesisError::Timeout));
            CatalogReply::Voices(result)
        }
        CatalogRequest::Preview { voice, name } => {
            let result = match tokio::time::timeout(timeout, directory.preview_voice(&voice, &name))
                .await
            {
                Ok(Ok(audio)) if audio.is_empty() => Err(SynthesisError::EmptyAudio),
                Ok(result) => result,
                Err(_) => Err(SynthesisError::Timeout),
            };
            CatalogReply::Preview { name, result }
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceCatalog
// ---------------------------------------------------------------------------

/// Background voice listing and preview synthesis.
pub struct VoiceCatalog {
    requests: mpsc::Sender<CatalogRequest>,
    replies: mpsc::Receiver<CatalogReply>,
    pending: usize,
    failed: VecDeque<CatalogReply>,
}

impl VoiceCatalog {
    /// Spawn the worker thread.  Each request is bounded by `timeout`.
    pub fn spawn(directory: Arc<dyn VoiceDirectory>, timeout: Duration) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<CatalogRequest>();
        let (reply_tx, reply_rx) = mpsc::channel::<CatalogReply>();

        std::thread::Builder::new()
            .name("voice-catalog".into())
            .spawn(move || {
                let runtime = match current_thread_runtime() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("voice catalog: could not build runtime: {e}");
                        return;
                    }
                };

                while let Ok(request) = request_rx.recv() {
                    let reply = runtime.block_on(answer(directory.as_ref(), request, timeout));
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                log::debug!("voice catalog: request channel closed, exiting");
            })?;

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            pending: 0,
            failed: VecDeque::new(),
        })
    }

    /// Ask for the voices of `language_code`, optionally one gender only.
    pub fn request_voices(&mut self, language_code: &str, gender: Option<VoiceGender>) {
        self.submit(CatalogRequest::Voices {
            language_code: language_code.to_string(),
            gender,
        });
    }

    /// Ask for preview audio of voice `name` with the other `voice` settings.
    pub fn request_preview(&mut self, voice: &VoiceParams, name: &str) {
        self.submit(CatalogRequest::Preview {
            voice: voice.clone(),
            name: name.to_string(),
        });
    }

    fn submit(&mut self, request: CatalogRequest) {
        match self.requests.send(request) {
            Ok(()) => self.pending += 1,
            Err(mpsc::SendError(request)) => {
                log::error!("voice catalog: worker is gone");
                self.failed.push_back(CatalogReply::failed(
                    request,
                    SynthesisError::WorkerGone("voice catalog thread stopped".into()),
                ));
            }
        }
    }

    /// Take the next answer, if one is ready.
    pub fn poll(&mut self) -> Option<CatalogReply> {
        if let Some(reply) = self.failed.pop_front() {
            return Some(reply);
        }
        match self.replies.try_recv() {
            Ok(reply) => {
                self.pending = self.pending.saturating_sub(1);
                Some(reply)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                if self.pending > 0 {
                    log::error!("voice catalog: worker stopped with {} requests", self.pending);
                    self.pending = 0;
                }
                None
            }
        }
    }

    /// `true` while a request is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending > 0 || !self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct FakeDirectory {
        previews: Mutex<Vec<String>>,
    }

    fn voice(name: &str, gender: VoiceGender) -> VoiceInfo {
        VoiceInfo {
            name: name.into(),
            language_codes: vec!["tr-TR".into()],
            gender: Some(gender),
            natural_sample_rate_hertz: 24_000,
        }
    }

    #[async_trait]
    impl VoiceDirectory for FakeDirectory {
        async fn list_voices(
            &self,
            language_code: &str,
            gender: Option<VoiceGender>,
        ) -> Result<Vec<VoiceInfo>, SynthesisError> {
            if language_code != "tr-TR" {
                return Err(SynthesisError::Status {
                    status: 400,
                    message: "unsupported language".into(),
                });
            }
            let all = vec![
                voice("tr-TR-Wavenet-A", VoiceGender::Female),
                voice("tr-TR-Wavenet-B", VoiceGender::Male),
            ];
            Ok(crate::tts::filter_voices(all, gender))
        }

        async fn preview_voice(
            &self,
            _voice: &VoiceParams,
            name: &str,
        ) -> Result<Vec<u8>, SynthesisError> {
            self.previews.lock().unwrap().push(name.to_string());
            if name == "silent" {
                return Ok(Vec::new());
            }
            Ok(format!("preview:{name}").into_bytes())
        }
    }

    fn wait_for(catalog: &mut VoiceCatalog) -> CatalogReply {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(reply) = catalog.poll() {
                return reply;
            }
            assert!(Instant::now() < deadline, "no catalog reply within 2 s");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn lists_voices_filtered_by_gender() {
        let mut catalog =
            VoiceCatalog::spawn(Arc::new(FakeDirectory::default()), Duration::from_secs(1)).unwrap();

        catalog.request_voices("tr-TR", Some(VoiceGender::Male));
        assert!(catalog.is_pending());

        match wait_for(&mut catalog) {
            CatalogReply::Voices(Ok(voices)) => {
                assert_eq!(voices.len(), 1);
                assert_eq!(voices[0].name, "tr-TR-Wavenet-B");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(!catalog.is_pending());
    }

    #[test]
    fn listing_errors_are_returned() {
        let mut catalog =
            VoiceCatalog::spawn(Arc::new(FakeDirectory::default()), Duration::from_secs(1)).unwrap();
        catalog.request_voices("xx-XX", None);
        assert!(matches!(
            wait_for(&mut catalog),
            CatalogReply::Voices(Err(SynthesisError::Status { status: 400, .. }))
        ));
    }

    #[test]
    fn preview_returns_audio_for_the_named_voice() {
        let directory = Arc::new(FakeDirectory::default());
        let mut catalog = VoiceCatalog::spawn(directory.clone(), Duration::from_secs(1)).unwrap();

        catalog.request_preview(&VoiceParams::default(), "tr-TR-Wavenet-A");
        assert_eq!(
            wait_for(&mut catalog),
            CatalogReply::Preview {
                name: "tr-TR-Wavenet-A".into(),
                result: Ok(b"preview:tr-TR-Wavenet-A".to_vec()),
            }
        );
        assert_eq!(*directory.previews.lock().unwrap(), vec!["tr-TR-Wavenet-A"]);
    }

    #[test]
    fn empty_preview_is_an_error() {
        let mut catalog =
            VoiceCatalog::spawn(Arc::new(FakeDirectory::default()), Duration::from_secs(1)).unwrap();
        catalog.request_preview(&VoiceParams::default(), "silent");
        assert_eq!(
            wait_for(&mut catalog),
            CatalogReply::Preview {
                name: "silent".into(),
                result: Err(SynthesisError::EmptyAudio),
            }
        );
    }

    #[test]
    fn replies_arrive_in_submission_order() {
        let mut catalog =
            VoiceCatalog::spawn(Arc::new(FakeDirectory::default()), Duration::from_secs(1)).unwrap();
        catalog.request_preview(&VoiceParams::default(), "first");
        catalog.request_voices("tr-TR", None);

        assert!(matches!(wait_for(&mut catalog), CatalogReply::Preview { ref name, .. } if name == "first"));
        assert!(matches!(wait_for(&mut catalog), CatalogReply::Voices(Ok(ref v)) if v.len() == 2));
    }
}
