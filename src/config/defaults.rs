use crate::tts::Voice;

pub(crate) fn default_voice() -> Voice {
    Voice::Kore
}

pub(crate) fn default_font_size() -> u32 {
    18
}

pub(crate) fn default_line_height() -> f32 {
    1.6
}

pub(crate) fn default_serif() -> bool {
    true
}

pub(crate) fn default_page_size() -> usize {
    crate::pagination::DEFAULT_PAGE_SIZE
}

pub(crate) fn default_tts_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

pub(crate) fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

pub(crate) fn default_tts_api_key_env() -> String {
    "API_KEY".to_string()
}

pub(crate) fn default_tts_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_tts_prompt_prefix() -> String {
    "Please read the following text clearly and naturally: ".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
