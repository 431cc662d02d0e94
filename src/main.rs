//! Application entry point — page-narrator.
//!
//! Usage: `page-narrator <path-or-url>`
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Extract the source's text on a short-lived tokio runtime and paginate
//!    it into speech pages.  No text → exit without creating a session.
//! 4. Open the default audio output.  Failure is fatal.
//! 5. Build the synthesis gateway, its background dispatcher and the voice
//!    catalog used by the settings panel (optional).
//! 6. Open the progress store and look up where this user left off.
//! 7. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use anyhow::{bail, Context as _};
use eframe::egui;
use page_narrator::{
    app::NarratorApp,
    audio::{AudioDevice, RodioRenderer},
    config::{AppConfig, AppPaths},
    playback::{PlaybackController, PlaybackError, PlaybackSession},
    progress::{resume_index, JsonProgressStore, MemoryProgressStore, ProgressStore},
    text::{extractor_for, prepare_pages, Document, ExtractedText},
    tts::{BackgroundDispatcher, GoogleTtsGateway, SynthesisGateway, VoiceCatalog},
};

// ---------------------------------------------------------------------------
// Startup helpers
// ---------------------------------------------------------------------------

fn extract(source: &str) -> anyhow::Result<ExtractedText> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    let extractor = extractor_for(source);
    let text = rt
        .block_on(extractor.extract(source))
        .map_err(PlaybackError::from)
        .inspect_err(|e| log::error!("{e}"))?;
    Ok(text)
}

fn open_progress_store(paths: &AppPaths) -> Arc<dyn ProgressStore> {
    match JsonProgressStore::open(&paths.progress_file) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::warn!("Progress file unavailable ({e}); progress will not persist");
            Arc::new(MemoryProgressStore::new())
        }
    }
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_decorations(false)
        .with_transparent(true)
        .with_inner_size([340.0, 200.0])
        .with_min_inner_size([280.0, 120.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("page-narrator starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let Some(source) = std::env::args().nth(1) else {
        bail!("usage: page-narrator <path-or-url>");
    };

    // 3. Extraction + pagination
    let text = extract(&source)?;
    let pages = prepare_pages(&text, &config.paginator);
    if pages.is_empty() {
        bail!("no readable text found in {source}");
    }
    let document = Document::from_source(&source, text.physical_page_count);
    log::info!(
        "{}: {} speech pages from {} physical pages",
        document.title,
        pages.len(),
        document.physical_page_count
    );

    // 4. Audio output
    let renderer = RodioRenderer::open_default()
        .map_err(|e| PlaybackError::from_renderer(0, e))
        .inspect_err(|e| log::error!("{e}"))?;
    let device = AudioDevice::new(renderer);

    // 5. Synthesis
    let timeout = config.playback.synthesis_timeout();
    let google = Arc::new(GoogleTtsGateway::from_config(&config.synthesis, timeout));
    let gateway: Arc<dyn SynthesisGateway> = google.clone();
    let dispatcher = BackgroundDispatcher::spawn(gateway, timeout)
        .context("failed to spawn synthesis worker")?;
    let catalog = VoiceCatalog::spawn(google, timeout)
        .inspect_err(|e| log::warn!("Voice catalog unavailable ({e}); voice list disabled"))
        .ok();

    // 6. Progress
    let paths = AppPaths::new();
    let progress = open_progress_store(&paths);
    let start_index = match progress.find(&config.user.user_id, &document.id) {
        Ok(Some(snapshot)) => {
            let index = resume_index(&snapshot, pages.len());
            log::info!("Resuming {} at page {}", document.title, index + 1);
            index
        }
        Ok(None) => 0,
        Err(e) => {
            log::warn!("Could not read progress ({e}); starting at page 1");
            0
        }
    };

    let controller = PlaybackController::new(
        Box::new(dispatcher),
        device,
        Arc::clone(&progress),
        config.voice.clamped(),
        config.user.user_id.clone(),
    )
    .with_grace_window(config.playback.grace_window());

    let session = PlaybackSession::new_at(document, pages, start_index);

    // 7. Window (blocks until closed)
    let title = format!("page-narrator — {}", session.document().title);
    let options = native_options(&config);
    let mut app = NarratorApp::new(controller, session, progress, config);
    if let Some(catalog) = catalog {
        app = app.with_catalog(catalog);
    }

    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("window error: {e}"))
}
