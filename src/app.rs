//! Narrator window — egui/eframe driver for one playback session.
//!
//! # Architecture
//!
//! [`NarratorApp`] is the top-level [`eframe::App`].  It owns the
//! [`PlaybackSession`] and the [`PlaybackController`], turns button presses
//! and shortcuts into [`PlayerCommand`]s, and calls
//! [`PlaybackController::tick`] once per frame.  While a session is active
//! the frame loop is kept alive with `request_repaint_after(tick_interval)`,
//! which is what drives completion detection.
//!
//! # Layout
//!
//! | Area | Content |
//! |------|---------|
//! | Title bar | state icon, document title, settings / history / close |
//! | Status | state label, "Page x / N" progress bar, last error |
//! | Controls | `<<`  play/pause  `>>`  stop |
//! | History | previously listened documents, most recent first |
//! | Settings | voice parameters, voice list and preview, paginator limits, save |
//!
//! Shortcuts: `Space` play/pause, `←`/`→` previous/next page, `Esc` stop.
//!
//! Voice previews borrow the audio device under [`PREVIEW_HOLDER`] while no
//! session holds it, and give it back when the clip ends or on the next
//! player command.

use std::sync::Arc;

use eframe::egui;

use crate::config::AppConfig;
use crate::playback::{
    Observation, PlaybackController, PlaybackResult, PlaybackSession, PlaybackState,
};
use crate::progress::{ProgressSnapshot, ProgressStore};
use crate::tts::{
    CatalogReply, VoiceCatalog, VoiceGender, VoiceInfo, PITCH_RANGE, SPEAKING_RATE_RANGE,
};

/// Audio-device holder id used for voice previews.  Session ids start at 1.
pub const PREVIEW_HOLDER: u64 = 0;

// ---------------------------------------------------------------------------
// PlayerCommand
// ---------------------------------------------------------------------------

/// User intents, independent of how they were triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Start, pause, resume or retry, depending on the state.
    PlayPause,
    Next,
    Prev,
    Stop,
}

// ---------------------------------------------------------------------------
// NarratorApp
// ---------------------------------------------------------------------------

pub struct NarratorApp {
    // ── Playback ─────────────────────────────────────────────────────────
    controller: PlaybackController,
    session: PlaybackSession,
    /// Page the next `start` from `Idle` begins at.
    start_index: usize,
    /// Snapshot of the session taken after the last controller call.
    observation: Observation,

    // ── Progress history ─────────────────────────────────────────────────
    progress: Arc<dyn ProgressStore>,
    history: Vec<ProgressSnapshot>,
    history_stale: bool,

    // ── Voice catalog ────────────────────────────────────────────────────
    catalog: Option<VoiceCatalog>,
    voices: Vec<VoiceInfo>,
    catalog_status: Option<String>,
    previewing: bool,

    // ── UI state ─────────────────────────────────────────────────────────
    show_settings: bool,
    show_history: bool,
    spinner_phase: f32,
    error_message: Option<String>,
    settings_status: Option<String>,

    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
}

impl NarratorApp {
    /// Playback begins at the session's current page, so open the session
    /// with [`PlaybackSession::new_at`] to resume.
    pub fn new(
        controller: PlaybackController,
        session: PlaybackSession,
        progress: Arc<dyn ProgressStore>,
        config: AppConfig,
    ) -> Self {
        let observation = controller.observe(&session);
        let start_index = session.current_index();
        let show_history = config.ui.show_history;
        Self {
            controller,
            session,
            start_index,
            observation,
            progress,
            history: Vec::new(),
            history_stale: true,
            catalog: None,
            voices: Vec::new(),
            catalog_status: None,
            previewing: false,
            show_settings: false,
            show_history,
            spinner_phase: 0.0,
            error_message: None,
            settings_status: None,
            config,
        }
    }

    /// Enable voice listing and previews in the settings panel.
    pub fn with_catalog(mut self, catalog: VoiceCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn history(&self) -> &[ProgressSnapshot] {
        &self.history
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Apply one user command to the session.
    pub fn handle(&mut self, command: PlayerCommand) {
        self.end_preview();
        let result = match command {
            PlayerCommand::PlayPause => self.play_pause(),
            PlayerCommand::Next => self.controller.next(&mut self.session),
            PlayerCommand::Prev => self.controller.prev(&mut self.session),
            PlayerCommand::Stop => {
                let finished = self.session.state() == PlaybackState::Finished;
                let result = self.controller.stop(&mut self.session);
                // a finished document plays again from the top
                self.start_index = if finished {
                    0
                } else {
                    self.session.current_index()
                };
                result
            }
        };
        self.absorb(result);
    }

    fn play_pause(&mut self) -> PlaybackResult {
        match self.session.state() {
            PlaybackState::Playing => self.controller.pause(&mut self.session),
            PlaybackState::Paused => self.controller.resume(&mut self.session),
            PlaybackState::Idle => self.controller.start(&mut self.session, self.start_index),
            // retry the failing page
            PlaybackState::Error => {
                let index = self.session.current_index();
                self.controller.start(&mut self.session, index)
            }
            PlaybackState::Finished => self.controller.start(&mut self.session, 0),
            PlaybackState::Synthesizing => Ok(PlaybackState::Synthesizing),
        }
    }

    /// Drive the controller once; called every frame.
    pub fn poll(&mut self) {
        let result = self.controller.tick(&mut self.session);
        self.absorb(result);
        self.poll_catalog();
        if self.previewing && !self.controller.device().is_busy(PREVIEW_HOLDER) {
            self.end_preview();
        }
    }

    fn absorb(&mut self, result: PlaybackResult) {
        match result {
            Ok(_) => {
                if self.session.state() != PlaybackState::Error {
                    self.error_message = None;
                }
            }
            Err(e) => self.error_message = Some(e.to_string()),
        }

        let observation = self.controller.observe(&self.session);
        if observation.state != self.observation.state
            || observation.current_index != self.observation.current_index
        {
            self.history_stale = true;
        }
        self.observation = observation;
    }

    fn refresh_history(&mut self) {
        if !self.history_stale {
            return;
        }
        self.history_stale = false;
        match self.progress.read(&self.config.user.user_id) {
            Ok(history) => self.history = history,
            Err(e) => log::warn!("app: could not read progress history: {e}"),
        }
    }

    // ── Voice catalog ────────────────────────────────────────────────────

    fn request_voices(&mut self) {
        let voice = self.controller.voice();
        if let Some(catalog) = self.catalog.as_mut() {
            catalog.request_voices(&voice.language_code, Some(voice.voice_gender));
            self.catalog_status = Some("loading voices…".into());
        }
    }

    fn request_preview(&mut self, name: &str) {
        let voice = self.controller.voice();
        if let Some(catalog) = self.catalog.as_mut() {
            catalog.request_preview(voice, name);
            self.catalog_status = Some(format!("synthesizing {name}…"));
        }
    }

    fn poll_catalog(&mut self) {
        let Some(catalog) = self.catalog.as_mut() else {
            return;
        };
        let replies: Vec<CatalogReply> = std::iter::from_fn(|| catalog.poll()).collect();
        for reply in replies {
            match reply {
                CatalogReply::Voices(Ok(voices)) => {
                    self.catalog_status = Some(format!("{} voices", voices.len()));
                    self.voices = voices;
                }
                CatalogReply::Voices(Err(e)) => {
                    log::warn!("app: could not list voices: {e}");
                    self.catalog_status = Some(e.to_string());
                }
                CatalogReply::Preview { name, result } => {
                    self.catalog_status = Some(match result {
                        Ok(audio) => match self.play_preview(audio) {
                            Ok(()) => format!("previewing {name}"),
                            Err(message) => message,
                        },
                        Err(e) => {
                            log::warn!("app: preview of {name} failed: {e}");
                            e.to_string()
                        }
                    });
                }
            }
        }
    }

    fn play_preview(&mut self, audio: Vec<u8>) -> Result<(), String> {
        if self.session.state() == PlaybackState::Paused || self.session.state().is_active() {
            return Err("stop playback to preview".into());
        }
        let device = self.controller.device();
        device.acquire(PREVIEW_HOLDER).map_err(|e| e.to_string())?;
        let played = device.with_renderer(PREVIEW_HOLDER, |r| {
            r.load(audio)?;
            r.play()
        });
        if let Err(e) = played {
            device.release(PREVIEW_HOLDER);
            return Err(e.to_string());
        }
        self.previewing = true;
        Ok(())
    }

    fn end_preview(&mut self) {
        if self.previewing {
            self.controller.device().release(PREVIEW_HOLDER);
            self.previewing = false;
        }
    }

    /// Translate keyboard shortcuts into commands.
    fn read_shortcuts(&mut self, ctx: &egui::Context) {
        let commands: Vec<PlayerCommand> = ctx.input(|i| {
            let mut commands = Vec::new();
            if i.key_pressed(egui::Key::Space) {
                commands.push(PlayerCommand::PlayPause);
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                commands.push(PlayerCommand::Next);
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                commands.push(PlayerCommand::Prev);
            }
            if i.key_pressed(egui::Key::Escape) {
                commands.push(PlayerCommand::Stop);
            }
            commands
        });
        for command in commands {
            self.handle(command);
        }
    }

    // ── Custom title bar ─────────────────────────────────────────────────

    fn draw_title_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            let icon = match self.observation.state {
                PlaybackState::Idle => "  ",
                PlaybackState::Synthesizing => ". ",
                PlaybackState::Playing => "> ",
                PlaybackState::Paused => "||",
                PlaybackState::Finished => "OK",
                PlaybackState::Error => "! ",
            };
            ui.label(egui::RichText::new(icon).color(self.state_color()));

            // Draggable title area
            let title_resp = ui.label(
                egui::RichText::new(self.session.document().title.as_str())
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(13.0),
            );
            if title_resp.is_pointer_button_down_on() {
                if let Some(outer_rect) = ctx.input(|i| i.viewport().outer_rect) {
                    let delta = ctx.input(|i| i.pointer.delta());
                    ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(
                        outer_rect.min + delta,
                    ));
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if title_button(ui, "x", egui::Color32::from_rgb(200, 100, 100)) {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                if title_button(ui, "=", egui::Color32::from_rgb(150, 150, 150)) {
                    self.show_settings = !self.show_settings;
                }
                if title_button(ui, "h", egui::Color32::from_rgb(150, 150, 150)) {
                    self.show_history = !self.show_history;
                }
            });
        });
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_status(&self, ui: &mut egui::Ui) {
        let obs = &self.observation;
        let label = if obs.state == PlaybackState::Synthesizing {
            format!("{} {}", self.spinner_char(), obs.state.label())
        } else {
            obs.state.label().to_string()
        };
        ui.label(
            egui::RichText::new(label)
                .color(self.state_color())
                .size(12.0),
        );

        ui.add(
            egui::ProgressBar::new(obs.fraction())
                .text(format!("Page {} / {}", obs.current_page, obs.total_pages)),
        );

        let physical = self.session.document().physical_page_count;
        if physical > 0 {
            ui.label(
                egui::RichText::new(format!("{physical} pages in source"))
                    .color(egui::Color32::from_rgb(120, 120, 120))
                    .size(10.0),
            );
        }

        if let Some(ref msg) = self.error_message {
            ui.label(
                egui::RichText::new(msg.as_str())
                    .color(egui::Color32::from_rgb(255, 136, 68))
                    .size(11.0),
            );
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let state = self.observation.state;
        let navigable = state != PlaybackState::Synthesizing;
        let play_label = match state {
            PlaybackState::Playing => "Pause",
            PlaybackState::Paused => "Resume",
            PlaybackState::Error => "Retry",
            PlaybackState::Finished => "Replay",
            _ => "Play",
        };

        let mut command = None;
        ui.horizontal(|ui| {
            if ui.add_enabled(navigable, egui::Button::new("<<")).clicked() {
                command = Some(PlayerCommand::Prev);
            }
            if ui.add_enabled(navigable, egui::Button::new(play_label)).clicked() {
                command = Some(PlayerCommand::PlayPause);
            }
            if ui.add_enabled(navigable, egui::Button::new(">>")).clicked() {
                command = Some(PlayerCommand::Next);
            }
            if ui.button("Stop").clicked() {
                command = Some(PlayerCommand::Stop);
            }
        });
        if let Some(command) = command {
            self.handle(command);
        }
    }

    fn draw_history(&self, ui: &mut egui::Ui) {
        ui.label(
            egui::RichText::new("History")
                .color(egui::Color32::from_rgb(180, 180, 180))
                .size(12.0),
        );
        if self.history.is_empty() {
            ui.label(
                egui::RichText::new("  nothing yet")
                    .color(egui::Color32::from_rgb(120, 120, 120))
                    .size(11.0),
            );
            return;
        }
        egui::ScrollArea::vertical().max_height(90.0).show(ui, |ui| {
            for snap in &self.history {
                let status = if snap.completed {
                    "done".to_string()
                } else {
                    format!("{}/{}", snap.current_page, snap.total_pages)
                };
                ui.label(
                    egui::RichText::new(format!(
                        "  {}  {}  {}",
                        snap.document_id,
                        status,
                        snap.updated_at.format("%Y-%m-%d %H:%M")
                    ))
                    .color(egui::Color32::from_rgb(140, 140, 140))
                    .size(11.0),
                );
            }
        });
    }

    fn draw_settings(&mut self, ui: &mut egui::Ui) {
        let mut voice = self.controller.voice().clone();
        let before = voice.clone();

        ui.label(
            egui::RichText::new("Voice")
                .color(egui::Color32::from_rgb(180, 180, 180))
                .size(12.0),
        );
        ui.label(
            egui::RichText::new(format!("  Language: {}", voice.language_code))
                .color(egui::Color32::from_rgb(140, 140, 140))
                .size(11.0),
        );
        ui.horizontal(|ui| {
            ui.radio_value(&mut voice.voice_gender, VoiceGender::Female, "Female");
            ui.radio_value(&mut voice.voice_gender, VoiceGender::Male, "Male");
        });
        ui.add(
            egui::Slider::new(
                &mut voice.speaking_rate,
                SPEAKING_RATE_RANGE.0..=SPEAKING_RATE_RANGE.1,
            )
            .text("rate"),
        );
        ui.add(egui::Slider::new(&mut voice.pitch, PITCH_RANGE.0..=PITCH_RANGE.1).text("pitch"));


        let mut load_voices = false;
        let mut preview = None;
        if self.catalog.is_some() {
            let pending = self.catalog.as_ref().is_some_and(VoiceCatalog::is_pending);
            ui.horizontal(|ui| {
                let selected = voice.voice_name.clone().unwrap_or_else(|| "automatic".into());
                egui::ComboBox::from_id_salt("voice-name")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut voice.voice_name, None, "automatic");
                        for info in &self.voices {
                            ui.selectable_value(
                                &mut voice.voice_name,
                                Some(info.name.clone()),
                                info.name.as_str(),
                            );
                        }
                    });
                if ui.add_enabled(!pending, egui::Button::new("List")).clicked() {
                    load_voices = true;
                }
                let can_preview = !pending && !self.previewing && voice.voice_name.is_some();
                if ui.add_enabled(can_preview, egui::Button::new("Preview")).clicked() {
                    preview = voice.voice_name.clone();
                }
            });
            if let Some(ref status) = self.catalog_status {
                ui.label(
                    egui::RichText::new(status.as_str())
                        .color(egui::Color32::from_rgb(140, 140, 140))
                        .size(10.0),
                );
            }
        }

        if voice != before {
            self.config.voice = voice.clone();
            self.controller.set_voice(voice);
        }
        if load_voices {
            self.request_voices();
        }
        if let Some(name) = preview {
            self.request_preview(&name);
        }

        ui.add_space(2.0);
        ui.label(
            egui::RichText::new(format!(
                "  Page size: {} bytes",
                self.config.paginator.max_page_bytes
            ))
            .color(egui::Color32::from_rgb(140, 140, 140))
            .size(11.0),
        );
        ui.label(
            egui::RichText::new(format!("  User: {}", self.config.user.user_id))
                .color(egui::Color32::from_rgb(140, 140, 140))
                .size(11.0),
        );

        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                self.settings_status = Some(match self.config.save() {
                    Ok(()) => "saved".into(),
                    Err(e) => {
                        log::warn!("app: could not save settings: {e}");
                        format!("save failed: {e}")
                    }
                });
            }
            if let Some(ref status) = self.settings_status {
                ui.label(
                    egui::RichText::new(status.as_str())
                        .color(egui::Color32::from_rgb(140, 140, 140))
                        .size(10.0),
                );
            }
        });
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }

    fn state_color(&self) -> egui::Color32 {
        match self.observation.state {
            PlaybackState::Idle => egui::Color32::from_rgb(100, 100, 100),
            PlaybackState::Synthesizing => egui::Color32::from_rgb(68, 136, 255),
            PlaybackState::Playing => egui::Color32::from_rgb(80, 200, 120),
            PlaybackState::Paused => egui::Color32::from_rgb(200, 200, 120),
            PlaybackState::Finished => egui::Color32::from_rgb(80, 200, 120),
            PlaybackState::Error => egui::Color32::from_rgb(255, 136, 68),
        }
    }
}

fn title_button(ui: &mut egui::Ui, text: &str, color: egui::Color32) -> bool {
    ui.add(egui::Button::new(egui::RichText::new(text).color(color).size(12.0)).frame(false))
        .clicked()
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for NarratorApp {
    /// Called every frame by eframe.  Reads input, ticks the controller,
    /// then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.read_shortcuts(ctx);
        self.poll();
        self.refresh_history();

        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // The controller only advances when ticked, so keep frames coming
        // while anything can still change on its own.
        let catalog_busy = self.catalog.as_ref().is_some_and(VoiceCatalog::is_pending);
        if self.observation.state.is_active() || catalog_busy || self.previewing {
            ctx.request_repaint_after(self.config.playback.tick_interval());
        }

        let frame = egui::Frame::new()
            .fill(egui::Color32::from_rgba_premultiplied(30, 30, 30, 220))
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(8));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.draw_title_bar(ui, ctx);
            ui.separator();

            if self.show_settings {
                self.draw_settings(ui);
                return;
            }

            self.draw_status(ui);
            ui.add_space(4.0);
            self.draw_controls(ui);

            if self.show_history {
                ui.separator();
                self.draw_history(ui);
            }
        });
    }

    /// Stop the session so its position is saved and the device released.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.handle(PlayerCommand::Stop);
        log::info!("app: narrator window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
