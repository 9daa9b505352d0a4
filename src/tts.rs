//! Text-to-speech through the Gemini speech API.
//!
//! The service returns base64-encoded 16-bit PCM at 24 kHz, mono. This module
//! only handles the request and the transport encoding; interpreting the PCM
//! bytes belongs to `audio`.

use crate::config::AppConfig;
use crate::error::SynthesisError;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Sample rate of the audio returned by the speech service.
pub const TTS_SAMPLE_RATE: u32 = 24_000;
/// Channel count of the audio returned by the speech service.
pub const TTS_CHANNELS: u16 = 1;

/// Prebuilt voices offered by the speech service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    Kore,
    Puck,
    Charon,
    Fenrir,
    Zephyr,
}

impl Voice {
    pub const ALL: [Voice; 5] = [
        Voice::Kore,
        Voice::Puck,
        Voice::Charon,
        Voice::Fenrir,
        Voice::Zephyr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Kore => "Kore",
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Fenrir => "Fenrir",
            Voice::Zephyr => "Zephyr",
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown voice '{wanted}'"))
    }
}

/// Encoded audio as returned by a synthesizer, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Remote or local speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Voice)
    -> Result<SynthesizedAudio, SynthesisError>;
}

/// Settings for [`GeminiSynthesizer`], usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub prompt_prefix: String,
}

impl From<&AppConfig> for GeminiSettings {
    fn from(config: &AppConfig) -> Self {
        GeminiSettings {
            endpoint: config.tts_endpoint.clone(),
            model: config.tts_model.clone(),
            api_key_env: config.tts_api_key_env.clone(),
            prompt_prefix: config.tts_prompt_prefix.clone(),
        }
    }
}

pub struct GeminiSynthesizer {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiSynthesizer {
    pub fn new(settings: GeminiSettings) -> Self {
        info!(
            endpoint = %settings.endpoint,
            model = %settings.model,
            key_env = %settings.api_key_env,
            "Initializing Gemini speech synthesizer"
        );
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }

    /// The key is read per request so it can be exported after startup.
    fn api_key(&self) -> Result<String, SynthesisError> {
        std::env::var(&self.settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SynthesisError::MissingApiKey(self.settings.api_key_env.clone()))
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let key = self.api_key()?;
        let body = build_request(&self.settings.prompt_prefix, text, voice);
        debug!(
            voice = %voice,
            chars = text.chars().count(),
            "Requesting speech synthesis"
        );

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Speech service rejected request");
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let pcm = extract_audio(parsed)?;
        debug!(bytes = pcm.len(), "Received synthesized audio");
        Ok(SynthesizedAudio {
            pcm,
            sample_rate: TTS_SAMPLE_RATE,
            channels: TTS_CHANNELS,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: &'static str,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

fn build_request(prompt_prefix: &str, text: &str, voice: Voice) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(format!("{prompt_prefix}{text}")),
                inline_data: None,
            }],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["AUDIO"],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.as_str(),
                    },
                },
            },
        },
    }
}

/// Pull the first candidate's inline audio and strip the base64 encoding.
fn extract_audio(response: GenerateContentResponse) -> Result<Vec<u8>, SynthesisError> {
    let data = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.inline_data)
        .map(|inline| inline.data)
        .filter(|data| !data.is_empty())
        .ok_or(SynthesisError::NoAudio)?;

    BASE64_STANDARD
        .decode(data.as_bytes())
        .map_err(|err| SynthesisError::InvalidPayload(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_voice_names_case_insensitively() {
        assert_eq!("kore".parse::<Voice>(), Ok(Voice::Kore));
        assert_eq!(" Zephyr ".parse::<Voice>(), Ok(Voice::Zephyr));
        assert!("alloy".parse::<Voice>().is_err());
        assert_eq!(Voice::ALL.len(), 5);
        assert_eq!(Voice::Fenrir.to_string(), "Fenrir");
    }

    #[test]
    fn request_body_asks_for_audio_with_prebuilt_voice() {
        let body = build_request("Read: ", "Hello", Voice::Puck);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{ "parts": [{ "text": "Read: Hello" }] }],
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {
                            "prebuiltVoiceConfig": { "voiceName": "Puck" }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn extracts_inline_audio_from_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAEC/w==" }
                    }]
                }
            }]
        }))
        .unwrap();
        assert_eq!(extract_audio(response).unwrap(), vec![0x00, 0x01, 0x02, 0xff]);
    }

    #[test]
    fn missing_audio_is_reported() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "no" }] } }]
        }))
        .unwrap();
        assert!(matches!(extract_audio(response), Err(SynthesisError::NoAudio)));

        let empty = GenerateContentResponse::default();
        assert!(matches!(extract_audio(empty), Err(SynthesisError::NoAudio)));
    }

    #[test]
    fn malformed_base64_is_invalid_payload() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "***" } }] } }]
        }))
        .unwrap();
        assert!(matches!(
            extract_audio(response),
            Err(SynthesisError::InvalidPayload(_))
        ));
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let synth = GeminiSynthesizer::new(GeminiSettings {
            endpoint: "https://example.test/v1beta/".into(),
            model: "tts-model".into(),
            api_key_env: "AURA_READER_TEST_UNSET_KEY".into(),
            prompt_prefix: String::new(),
        });
        assert_eq!(
            synth.url(),
            "https://example.test/v1beta/models/tts-model:generateContent"
        );
        assert!(matches!(
            synth.api_key(),
            Err(SynthesisError::MissingApiKey(name)) if name == "AURA_READER_TEST_UNSET_KEY"
        ));
    }
}
