pub mod gateway;
pub mod gemini;
pub mod prompt;
pub mod session;

/// Represents commands that the core logic (`InterviewSession`) issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (like speaking text).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Command the runtime to show and speak the given interviewer text.
    SpeakText(String),
    /// Command indicating the interview has concluded, with a closing message.
    SessionComplete(String),
    /// Command carrying the generated performance report.
    ReportReady(String),
}
