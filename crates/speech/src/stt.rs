//! Client for the hosted speech-to-text service. One operation: transcribe
//! a one-shot microphone recording into text.

use reqwest::Client;
use serde::Deserialize;

const STT_API_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned status {status}: {detail}")]
    Service { status: u16, detail: String },
    #[error("no speech was recognized in the recording")]
    NoSpeech,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

pub struct Transcriber {
    client: Client,
    api_key: String,
}

impl Transcriber {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Transcribes a base64 LINEAR16 recording at `sample_rate`. Returns
    /// the top alternative of every result segment, joined in order.
    pub async fn recognize(
        &self,
        audio_base64: &str,
        sample_rate: u32,
        language_code: &str,
    ) -> Result<String, SttError> {
        let body = serde_json::json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": sample_rate,
                "languageCode": language_code,
            },
            "audio": { "content": audio_base64 }
        });

        let resp = self
            .client
            .post(STT_API_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(SttError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed = resp.json::<RecognizeResponse>().await?;
        let transcript = join_top_alternatives(&parsed);
        if transcript.is_empty() {
            return Err(SttError::NoSpeech);
        }
        Ok(transcript)
    }
}

fn join_top_alternatives(response: &RecognizeResponse) -> String {
    response
        .results
        .iter()
        .filter_map(|result| result.alternatives.first())
        .map(|alt| alt.transcript.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_alternatives_are_joined_in_order() {
        let raw = r#"{
            "results": [
                { "alternatives": [ { "transcript": "I would use", "confidence": 0.92 } ] },
                { "alternatives": [ { "transcript": " a hash map." } ] }
            ]
        }"#;
        let parsed: RecognizeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(join_top_alternatives(&parsed), "I would use a hash map.");
    }

    #[test]
    fn empty_result_set_yields_an_empty_transcript() {
        let parsed: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(join_top_alternatives(&parsed).is_empty());
    }
}
