//! Speaker output via `rodio`.
//!
//! `rodio::OutputStream` is `!Send`, so it lives on a dedicated keeper
//! thread for the lifetime of the renderer.  Only the `Send`able
//! `OutputStreamHandle` crosses back to the caller; dropping the renderer
//! drops the shutdown sender, which ends the keeper thread and closes the
//! stream.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::renderer::{AudioRenderer, RendererError};

pub struct RodioRenderer {
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    // Dropping this ends the keeper thread.
    _shutdown: mpsc::Sender<()>,
}

impl RodioRenderer {
    /// Open the system's default output device.
    ///
    /// Fails with [`RendererError::Init`] when no device is available.
    pub fn open_default() -> Result<Self, RendererError> {
        let (handle_tx, handle_rx) = mpsc::channel::<Result<OutputStreamHandle, String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if handle_tx.send(Ok(handle)).is_err() {
                        return;
                    }
                    // Blocks until the renderer is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    log::debug!("audio output: stream closed");
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| RendererError::Init(format!("failed to spawn output thread: {e}")))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| RendererError::Init("output thread exited early".into()))?
            .map_err(RendererError::Init)?;

        log::info!("audio output: default device opened");
        Ok(Self {
            handle,
            sink: None,
            _shutdown: shutdown_tx,
        })
    }

    fn sink(&self) -> Result<&Sink, RendererError> {
        self.sink
            .as_ref()
            .ok_or_else(|| RendererError::Runtime("no clip loaded".into()))
    }
}

impl AudioRenderer for RodioRenderer {
    fn load(&mut self, audio: Vec<u8>) -> Result<(), RendererError> {
        let source = Decoder::new(Cursor::new(audio))
            .map_err(|e| RendererError::Runtime(format!("decode: {e}")))?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| RendererError::Runtime(format!("sink: {e}")))?;
        sink.pause();
        sink.append(source);

        if let Some(old) = self.sink.replace(sink) {
            old.stop();
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), RendererError> {
        self.sink()?.play();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RendererError> {
        self.sink()?.pause();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), RendererError> {
        self.sink()?.play();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RendererError> {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|s| !s.empty() && !s.is_paused())
    }
}
