//! Client for the hosted text-to-speech service. One operation: synthesize
//! audio bytes from text plus a language code. Failures here are
//! recoverable; the caller skips playback and the interview continues.

use crate::TTS_SAMPLE_RATE;
use reqwest::Client;
use serde::Deserialize;

const TTS_API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned status {status}: {detail}")]
    Service { status: u16, detail: String },
    #[error("service returned no audio content")]
    EmptyAudio,
}

/// One synthesized assistant utterance: the base64 audio payload as
/// delivered by the service, plus the PCM sample rate it was rendered at.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub audio_base64: String,
    pub sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent", default)]
    audio_content: String,
}

pub struct Synthesizer {
    client: Client,
    api_key: String,
}

impl Synthesizer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Synthesizes `text` in the given language, returning LINEAR16 PCM as
    /// a base64 payload. Single best-effort call, no retry.
    pub async fn synthesize(&self, text: &str, language_code: &str) -> Result<Utterance, TtsError> {
        let body = serde_json::json!({
            "input": { "text": text },
            "voice": { "languageCode": language_code },
            "audioConfig": {
                "audioEncoding": "LINEAR16",
                "sampleRateHertz": TTS_SAMPLE_RATE,
            }
        });

        let resp = self
            .client
            .post(TTS_API_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(TtsError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed = resp.json::<SynthesizeResponse>().await?;
        if parsed.audio_content.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        Ok(Utterance {
            audio_base64: parsed.audio_content,
            sample_rate: TTS_SAMPLE_RATE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_reads_the_audio_payload() {
        let raw = r#"{ "audioContent": "UExDTTE2" }"#;
        let parsed: SynthesizeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.audio_content, "UExDTTE2");
    }

    #[test]
    fn missing_audio_content_parses_to_empty() {
        let parsed: SynthesizeResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.audio_content.is_empty());
    }
}
