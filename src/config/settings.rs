//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::tts::VoiceParams;

/// Environment variable consulted when `synthesis.api_key` is not set.
pub const API_KEY_ENV: &str = "GOOGLE_TTS_API_KEY";

// ---------------------------------------------------------------------------
// UserConfig
// ---------------------------------------------------------------------------

/// Identity used to key listening progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Opaque user identifier written into every progress snapshot.
    pub user_id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            user_id: "local".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PaginatorConfig
// ---------------------------------------------------------------------------

/// Settings for splitting extracted text into speech pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatorConfig {
    /// Byte ceiling for a single speech page (UTF-8).  Sized to stay under
    /// the 5 000-byte request limit of the synthesis service.
    pub max_page_bytes: usize,
    /// Cleaned physical-page blocks at or below this many characters are
    /// dropped as non-content.
    pub min_block_chars: usize,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            max_page_bytes: 4_800,
            min_block_chars: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Timing settings for the playback controller and its driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Minimum milliseconds after playback start before an idle renderer is
    /// treated as "page finished".
    pub grace_window_ms: u64,
    /// Upper bound for a single synthesis request, in seconds.
    pub synthesis_timeout_secs: u64,
    /// How often the UI driver ticks the controller while playback is active.
    pub tick_interval_ms: u64,
}

impl PlaybackConfig {
    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            grace_window_ms: 1_000,
            synthesis_timeout_secs: 30,
            tick_interval_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// SynthesisConfig
// ---------------------------------------------------------------------------

/// Connection settings for the Google Cloud Text-to-Speech REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Base URL of the API endpoint.
    pub base_url: String,
    /// API key.  `None` falls back to the `GOOGLE_TTS_API_KEY` env variable.
    pub api_key: Option<String>,
    /// Sentence spoken when previewing a voice.
    pub preview_text: String,
}

impl SynthesisConfig {
    /// The configured API key, or the environment fallback.
    ///
    /// Empty strings count as "not set".
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://texttospeech.googleapis.com".into(),
            api_key: None,
            preview_text: "Bu bir ses önizlemesidir.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui player window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` means
    /// let the OS / window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Keep the player floating above all other windows.
    pub always_on_top: bool,
    /// Show the listening-history panel under the transport controls.
    pub show_history: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            always_on_top: false,
            show_history: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use page_narrator::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener identity.
    pub user: UserConfig,
    /// Speech-page sizing.
    pub paginator: PaginatorConfig,
    /// Controller timing.
    pub playback: PlaybackConfig,
    /// Voice selection passed to every synthesis request.
    pub voice: VoiceParams,
    /// Synthesis service connection.
    pub synthesis: SynthesisConfig,
    /// Player window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
