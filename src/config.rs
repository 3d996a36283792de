//! Persisted user settings.
//!
//! Stored as a single JSON object in the per-user config directory. All
//! keys are optional, unknown keys are ignored, and missing keys fall back
//! to defaults, so settings files survive version skew in both directions.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Visual style of the caption overlay. UI-only; the core never reads it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CaptionStyle {
    #[default]
    Default,
    WhiteOnBlack,
    SmallCaps,
    LargeText,
    YellowOnBlue,
}

/// Screen anchor of the caption window. UI-only; the core never reads it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WindowPosition {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

/// User preferences and tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Capture the microphone alongside system loopback.
    pub include_microphone: bool,
    /// Mask blacklisted words in the renderer.
    pub filter_profanity: bool,
    /// Show bracketed audio-event tags instead of stripping them.
    pub show_audio_tags: bool,
    pub caption_style: CaptionStyle,
    pub window_position: WindowPosition,
    /// Transcription language; the pipeline enforces a single language.
    pub language: String,
    /// Override for the STT model path; None uses the application default.
    pub model_path: Option<PathBuf>,
    /// Silence duration before auto-commit (ms).
    pub silence_ms: u64,
    /// Minimum gap between STT calls (ms).
    pub inference_interval_ms: u64,
    /// Caption width in characters.
    pub chars_per_line: usize,
    // Optional window geometry
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_microphone: false,
            filter_profanity: false,
            show_audio_tags: true,
            caption_style: CaptionStyle::default(),
            window_position: WindowPosition::default(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            model_path: None,
            silence_ms: defaults::SILENCE_MS,
            inference_interval_ms: defaults::INFERENCE_INTERVAL_MS,
            chars_per_line: defaults::CHARS_PER_LINE,
            width: None,
            height: None,
            x: None,
            y: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// Missing keys use default values; unknown keys are ignored.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults on a missing or broken file.
    ///
    /// An unreadable file is logged and never fatal.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(crate::error::LivecapError::Io(e))
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Save settings as JSON, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - LIVECAP_LANGUAGE → language
    /// - LIVECAP_MODEL → model_path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var("LIVECAP_LANGUAGE")
            && !language.is_empty()
        {
            self.language = language;
        }

        if let Ok(model) = std::env::var("LIVECAP_MODEL")
            && !model.is_empty()
        {
            self.model_path = Some(PathBuf::from(model));
        }

        self
    }

    /// Get the default settings file path
    ///
    /// Returns ~/.config/livecap/settings.json on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("livecap")
            .join("settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_livecap_env() {
        remove_env("LIVECAP_LANGUAGE");
        remove_env("LIVECAP_MODEL");
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert!(!settings.include_microphone);
        assert!(!settings.filter_profanity);
        assert!(settings.show_audio_tags);
        assert_eq!(settings.caption_style, CaptionStyle::Default);
        assert_eq!(settings.window_position, WindowPosition::BottomCenter);
        assert_eq!(settings.language, "en");
        assert_eq!(settings.model_path, None);
        assert_eq!(settings.silence_ms, 800);
        assert_eq!(settings.inference_interval_ms, 300);
        assert_eq!(settings.chars_per_line, 48);
        assert_eq!(settings.width, None);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"filter_profanity": true}}"#).unwrap();

        let settings = Settings::load(file.path()).unwrap();

        assert!(settings.filter_profanity);
        assert_eq!(settings.silence_ms, 800);
        assert_eq!(settings.language, "en");
    }

    #[test]
    fn test_load_ignores_unknown_keys() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"chars_per_line": 60, "some_future_key": [1, 2, 3]}}"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.chars_per_line, 60);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let settings = Settings::load_or_default(Path::new("/nonexistent/settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_or_default_broken_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not valid json").unwrap();

        let settings = Settings::load_or_default(file.path());

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.caption_style = CaptionStyle::YellowOnBlue;
        settings.window_position = WindowPosition::TopRight;
        settings.chars_per_line = 64;
        settings.model_path = Some(PathBuf::from("/models/ggml-base.bin"));
        settings.width = Some(900);
        settings.x = Some(-10);

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_geometry_keys_are_optional() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"width": 800, "height": 120}}"#).unwrap();

        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.width, Some(800));
        assert_eq!(settings.height, Some(120));
        assert_eq!(settings.x, None);
        assert_eq!(settings.y, None);
    }

    #[test]
    fn test_env_override_language() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_livecap_env();
        set_env("LIVECAP_LANGUAGE", "de");

        let settings = Settings::default().with_env_overrides();

        assert_eq!(settings.language, "de");
        clear_livecap_env();
    }

    #[test]
    fn test_env_override_model_path() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_livecap_env();
        set_env("LIVECAP_MODEL", "/custom/ggml-tiny.bin");

        let settings = Settings::default().with_env_overrides();

        assert_eq!(
            settings.model_path,
            Some(PathBuf::from("/custom/ggml-tiny.bin"))
        );
        clear_livecap_env();
    }

    #[test]
    fn test_env_override_empty_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_livecap_env();
        set_env("LIVECAP_LANGUAGE", "");
        set_env("LIVECAP_MODEL", "");

        let settings = Settings::default().with_env_overrides();

        assert_eq!(settings.language, "en");
        assert_eq!(settings.model_path, None);
        clear_livecap_env();
    }

    #[test]
    fn test_caption_style_serialization_names() {
        let json = serde_json::to_string(&CaptionStyle::WhiteOnBlack).unwrap();
        assert_eq!(json, r#""WhiteOnBlack""#);
    }
}
