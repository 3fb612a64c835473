use crate::gateway::{Gateway, GatewayError, GenerationContext};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for question generation and evaluation.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// The concrete [`Gateway`] against the hosted Gemini `generateContent`
/// endpoint. One best-effort call per invocation; the key is passed as the
/// `key` query parameter.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }
}

/// Extracts the reply text from the first candidate, concatenating every
/// part. Long replies arrive split across multiple parts.
fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.into_iter().next()?;
    Some(
        candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect(),
    )
}

/// Folds the system prompt and the conversation context into the single
/// text block the generation endpoint receives.
fn compose_prompt(prompt: &str, context: &GenerationContext) -> String {
    match context {
        GenerationContext::History(history) => format!(
            "{prompt}\n\nCURRENT INTERVIEW HISTORY:\n{history}\n\n(Ask the next question now:)"
        ),
        GenerationContext::FullTranscript(transcript) => {
            format!("{prompt}\n\nTRANSCRIPT:\n{transcript}")
        }
    }
}

#[async_trait]
impl Gateway for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        context: &GenerationContext,
    ) -> Result<String, GatewayError> {
        let final_prompt = compose_prompt(prompt, context);
        let body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": final_prompt } ] }
            ]
        });

        let url = format!("{GEMINI_API_BASE}/models/{}:generateContent", self.model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed = resp.json::<GenerateContentResponse>().await?;
        let text = first_candidate_text(parsed).ok_or(GatewayError::EmptyResponse)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
