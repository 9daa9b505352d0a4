use super::defaults;
use super::models::{AppConfig, LogLevel};
use crate::tts::Voice;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    pagination: PaginationConfig,
    #[serde(default)]
    tts: TtsConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            voice: tables.reading.voice,
            font_size: tables.reading.font_size,
            line_height: tables.reading.line_height,
            serif: tables.reading.serif,
            page_size: tables.pagination.page_size,
            tts_endpoint: tables.tts.endpoint,
            tts_model: tables.tts.model,
            tts_api_key_env: tables.tts.api_key_env,
            tts_timeout_secs: tables.tts.timeout_secs,
            tts_prompt_prefix: tables.tts.prompt_prefix,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            reading: ReadingConfig {
                voice: config.voice,
                font_size: config.font_size,
                line_height: config.line_height,
                serif: config.serif,
            },
            pagination: PaginationConfig {
                page_size: config.page_size,
            },
            tts: TtsConfig {
                endpoint: config.tts_endpoint.clone(),
                model: config.tts_model.clone(),
                api_key_env: config.tts_api_key_env.clone(),
                timeout_secs: config.tts_timeout_secs,
                prompt_prefix: config.tts_prompt_prefix.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_voice")]
    voice: Voice,
    #[serde(default = "defaults::default_font_size")]
    font_size: u32,
    #[serde(default = "defaults::default_line_height")]
    line_height: f32,
    #[serde(default = "defaults::default_serif")]
    serif: bool,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            voice: defaults::default_voice(),
            font_size: defaults::default_font_size(),
            line_height: defaults::default_line_height(),
            serif: defaults::default_serif(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PaginationConfig {
    #[serde(default = "defaults::default_page_size")]
    page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            page_size: defaults::default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct TtsConfig {
    #[serde(default = "defaults::default_tts_endpoint")]
    endpoint: String,
    #[serde(default = "defaults::default_tts_model")]
    model: String,
    #[serde(default = "defaults::default_tts_api_key_env")]
    api_key_env: String,
    #[serde(default = "defaults::default_tts_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "defaults::default_tts_prompt_prefix")]
    prompt_prefix: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        TtsConfig {
            endpoint: defaults::default_tts_endpoint(),
            model: defaults::default_tts_model(),
            api_key_env: defaults::default_tts_api_key_env(),
            timeout_secs: defaults::default_tts_timeout_secs(),
            prompt_prefix: defaults::default_tts_prompt_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
