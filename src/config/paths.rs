//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\page-narrator\
//!   macOS:   ~/Library/Application Support/page-narrator/
//!   Linux:   ~/.config/page-narrator/
//!
//! Data dir (listening progress):
//!   Windows: %LOCALAPPDATA%\page-narrator\
//!   macOS:   ~/Library/Application Support/page-narrator/
//!   Linux:   ~/.local/share/page-narrator/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for per-user listening data.
    pub data_dir: PathBuf,
    /// Full path to `progress.json`.
    pub progress_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "page-narrator";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let progress_file = data_dir.join("progress.json");

        Self {
            config_dir,
            settings_file,
            data_dir,
            progress_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.data_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .progress_file
            .file_name()
            .is_some_and(|n| n == "progress.json"));
    }

    #[test]
    fn progress_file_lives_in_data_dir() {
        let paths = AppPaths::new();
        assert!(paths.progress_file.starts_with(&paths.data_dir));
    }
}
