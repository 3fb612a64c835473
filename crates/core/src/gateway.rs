use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Prefix attached to every diagnostic reply produced from a gateway
/// failure. The UI and the tests detect failed calls by this marker
/// instead of handling exceptions.
pub const FAILURE_MARKER: &str = "[gateway-error]";

/// The conversation context accompanying a generation request. The text is
/// the rendered transcript form (`Interviewer: ...` / `Candidate: ...`).
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationContext {
    /// The rolling chat history of an in-progress interview; the model is
    /// expected to ask the next question.
    History(String),
    /// The complete transcript of a concluded interview, for evaluation.
    FullTranscript(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned status {status}: {detail}")]
    Service { status: u16, detail: String },
    #[error("model returned an empty response")]
    EmptyResponse,
}

// The `Gateway` trait is the boundary to the hosted text-generation
// service. The state machine depends on this abstraction rather than a
// concrete client, so tests drive it with `mockall`'s `MockGateway` and
// alternative providers can be slotted in without touching session logic.
//
// The contract is a single best-effort call: no retries, no backoff, no
// streaming. Callers convert errors into a marker-prefixed diagnostic
// string (`failure_reply`) rather than letting them propagate.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Gateway {
    async fn generate(
        &self,
        prompt: &str,
        context: &GenerationContext,
    ) -> Result<String, GatewayError>;
}

/// Converts a gateway failure into the user-visible diagnostic string that
/// stands in for a normal model reply.
pub fn failure_reply(err: &GatewayError) -> String {
    format!("{FAILURE_MARKER} {err}")
}
