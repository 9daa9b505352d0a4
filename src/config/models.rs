use crate::tts::Voice;
use serde::Deserialize;

/// Smallest font size offered by the settings panel.
pub const MIN_FONT_SIZE: u32 = 12;
/// Largest font size offered by the settings panel.
pub const MAX_FONT_SIZE: u32 = 32;
/// Line-height multipliers offered by the settings panel.
pub const LINE_HEIGHTS: [f32; 4] = [1.2, 1.4, 1.6, 2.0];

/// High-level app configuration, flattened from the TOML tables.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_voice")]
    pub voice: Voice,
    #[serde(default = "crate::config::defaults::default_font_size")]
    pub font_size: u32,
    #[serde(default = "crate::config::defaults::default_line_height")]
    pub line_height: f32,
    #[serde(default = "crate::config::defaults::default_serif")]
    pub serif: bool,
    #[serde(default = "crate::config::defaults::default_page_size")]
    pub page_size: usize,
    #[serde(default = "crate::config::defaults::default_tts_endpoint")]
    pub tts_endpoint: String,
    #[serde(default = "crate::config::defaults::default_tts_model")]
    pub tts_model: String,
    #[serde(default = "crate::config::defaults::default_tts_api_key_env")]
    pub tts_api_key_env: String,
    #[serde(default = "crate::config::defaults::default_tts_timeout_secs")]
    pub tts_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_tts_prompt_prefix")]
    pub tts_prompt_prefix: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            voice: crate::config::defaults::default_voice(),
            font_size: crate::config::defaults::default_font_size(),
            line_height: crate::config::defaults::default_line_height(),
            serif: crate::config::defaults::default_serif(),
            page_size: crate::config::defaults::default_page_size(),
            tts_endpoint: crate::config::defaults::default_tts_endpoint(),
            tts_model: crate::config::defaults::default_tts_model(),
            tts_api_key_env: crate::config::defaults::default_tts_api_key_env(),
            tts_timeout_secs: crate::config::defaults::default_tts_timeout_secs(),
            tts_prompt_prefix: crate::config::defaults::default_tts_prompt_prefix(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    /// Keep loaded values inside the ranges the reader accepts.
    pub fn clamped(mut self) -> Self {
        self.font_size = clamp_font_size(self.font_size);
        self.line_height = snap_line_height(self.line_height);
        self.page_size = self.page_size.max(1);
        self.tts_timeout_secs = self.tts_timeout_secs.max(1);
        self
    }

    pub fn reading_settings(&self) -> ReadingSettings {
        ReadingSettings {
            voice: self.voice,
            font_size: clamp_font_size(self.font_size),
            line_height: snap_line_height(self.line_height),
            serif: self.serif,
        }
    }
}

/// Presentation settings chosen by the user. Replaced wholesale on change.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, serde::Serialize)]
pub struct ReadingSettings {
    pub voice: Voice,
    pub font_size: u32,
    pub line_height: f32,
    pub serif: bool,
}

impl Default for ReadingSettings {
    fn default() -> Self {
        AppConfig::default().reading_settings()
    }
}

impl ReadingSettings {
    pub fn typeface_label(&self) -> &'static str {
        if self.serif { "Serif" } else { "Sans" }
    }
}

pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Nearest allowed line height; ties go to the smaller value.
pub fn snap_line_height(value: f32) -> f32 {
    if !value.is_finite() {
        return crate::config::defaults::default_line_height();
    }
    LINE_HEIGHTS
        .iter()
        .copied()
        .fold(LINE_HEIGHTS[0], |best, candidate| {
            if (candidate - value).abs() < (best - value).abs() {
                candidate
            } else {
                best
            }
        })
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_line_height_to_allowed_values() {
        assert_eq!(snap_line_height(1.6), 1.6);
        assert_eq!(snap_line_height(1.0), 1.2);
        assert_eq!(snap_line_height(1.75), 1.6);
        assert_eq!(snap_line_height(9.0), 2.0);
        assert_eq!(snap_line_height(f32::NAN), 1.6);
    }

    #[test]
    fn clamps_font_size_into_range() {
        assert_eq!(clamp_font_size(4), MIN_FONT_SIZE);
        assert_eq!(clamp_font_size(20), 20);
        assert_eq!(clamp_font_size(64), MAX_FONT_SIZE);
    }

    #[test]
    fn default_reading_settings_match_reader_defaults() {
        let settings = ReadingSettings::default();
        assert_eq!(settings.voice, Voice::Kore);
        assert_eq!(settings.font_size, 18);
        assert_eq!(settings.line_height, 1.6);
        assert!(settings.serif);
        assert_eq!(settings.typeface_label(), "Serif");
    }
}
