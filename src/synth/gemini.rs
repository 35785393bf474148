use anyhow::{Context, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::audio::{PcmFormat, RawAudioPayload};

use super::{Synthesizer, VoiceName};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MODEL_ID: &str = "gemini-2.5-flash-preview-tts";

/// Sample layout the model returns. Load-bearing: every payload is
/// decoded with this format.
pub const OUTPUT_FORMAT: PcmFormat = PcmFormat {
    sample_rate: 24000,
    channel_count: 1,
};

/// REST client for the Gemini TTS model.
pub struct GeminiTts {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiTts {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    /// Read the API key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
        Ok(Self::new(api_key))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'a str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

fn request_body<'a>(prompt: &'a str, voice: VoiceName) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["AUDIO"],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.api_name(),
                    },
                },
            },
        },
    }
}

fn inline_audio(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.inline_data)
        .map(|d| d.data)
}

#[async_trait::async_trait]
impl Synthesizer for GeminiTts {
    async fn synthesize(&self, prompt: &str, voice: VoiceName) -> Result<RawAudioPayload> {
        let url = format!("{API_BASE}/{MODEL_ID}:generateContent?key={}", self.api_key);

        let response = self
            .client
            .post(&url)
            .json(&request_body(prompt, voice))
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = response.json().await?;
        let encoded = inline_audio(parsed)
            .ok_or_else(|| anyhow::anyhow!("No audio data returned from the model"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("model returned undecodable audio data")?;

        tracing::info!("Synthesis complete: {} bytes of PCM", bytes.len());
        Ok(RawAudioPayload {
            bytes,
            format: OUTPUT_FORMAT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_matches_the_wire_shape() {
        let body = serde_json::to_value(request_body("Hello there", VoiceName::Puck)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{ "parts": [{ "text": "Hello there" }] }],
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
    fn extracts_the_first_inline_payload() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"AAEC"}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(inline_audio(parsed).as_deref(), Some("AAEC"));
    }

    #[test]
    fn missing_audio_is_none() {
        let empty: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(inline_audio(empty), None);

        let text_only: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"sorry"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(inline_audio(text_only), None);
    }
}
