use crate::Command;
use crate::gateway::{Gateway, GenerationContext, failure_reply};
use crate::prompt::{self, Persona};
use anyhow::{Context, Result};
use std::fmt;

/// Inclusive bounds for the question-count selector.
pub const MIN_QUESTIONS: u8 = 3;
pub const MAX_QUESTIONS: u8 = 10;

/// Who authored a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Interviewer,
    Candidate,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Interviewer => f.write_str("Interviewer"),
            Speaker::Candidate => f.write_str("Candidate"),
        }
    }
}

/// One utterance in the transcript. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: String,
}

/// The ordered sequence of turns in one interview attempt.
///
/// Invariant: turns strictly alternate Interviewer, Candidate,
/// Interviewer, ... starting with Interviewer. The state machine is the
/// only writer and preserves this on every transition.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn push(&mut self, speaker: Speaker, content: String) {
        debug_assert_eq!(
            speaker,
            self.expected_speaker(),
            "transcript must alternate speakers starting with the interviewer"
        );
        self.turns.push(Turn { speaker, content });
    }

    fn expected_speaker(&self) -> Speaker {
        match self.turns.last() {
            None => Speaker::Interviewer,
            Some(turn) if turn.speaker == Speaker::Interviewer => Speaker::Candidate,
            Some(_) => Speaker::Interviewer,
        }
    }

    /// Whether the alternation invariant currently holds.
    pub fn alternates(&self) -> bool {
        self.turns.iter().enumerate().all(|(i, turn)| {
            let expected = if i % 2 == 0 {
                Speaker::Interviewer
            } else {
                Speaker::Candidate
            };
            turn.speaker == expected
        })
    }

    /// Renders the transcript into the plain-text form embedded in prompts.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Interview settings supplied by the front end; read-only to the state
/// machine.
#[derive(Debug, Clone)]
pub struct InterviewConfig {
    pub role: String,
    pub persona: Persona,
    /// Number of interviewer questions, expected within
    /// [`MIN_QUESTIONS`]..=[`MAX_QUESTIONS`].
    pub target_questions: u8,
}

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No interview has been started yet.
    Idle,
    /// Start was requested; the opening question has not arrived yet.
    AwaitingFirstQuestion,
    /// A question is on the table; the candidate's answer is expected.
    AwaitingAnswer,
    /// All questions have been asked and answered.
    Concluded,
    /// The performance report has been produced. Terminal except for Start.
    ReportGenerated,
}

/// User-driven events dispatched into the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Start a fresh interview, or reset the current one. Valid in every
    /// phase.
    Start,
    /// The candidate submitted an answer (typed or transcribed speech).
    Answer(String),
    /// The user asked for the performance report of a concluded interview.
    RequestReport,
}

/// The single mutable session object of one interview attempt.
pub struct InterviewSession {
    pub phase: Phase,
    /// Number of interviewer-authored turns in the transcript.
    pub turn_count: u8,
    pub transcript: Transcript,
    pub feedback: Option<String>,
}

impl Default for InterviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InterviewSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            turn_count: 0,
            transcript: Transcript::new(),
            feedback: None,
        }
    }

    /// Dispatches one event against the session, calling out to the
    /// gateway as the transition demands and emitting the resulting side
    /// effects as [`Command`]s.
    ///
    /// Gateway failures never surface as errors here: the diagnostic
    /// reply is substituted for the model text and the machine keeps
    /// progressing. The only fallible part is the command channel itself.
    pub async fn handle<G: Gateway + Send + Sync>(
        &mut self,
        gateway: &G,
        config: &InterviewConfig,
        event: SessionEvent,
        command_tx: tokio::sync::mpsc::Sender<Command>,
    ) -> Result<()> {
        match event {
            SessionEvent::Start => self.start(gateway, config, command_tx).await,
            SessionEvent::Answer(text) => self.answer(gateway, config, text, command_tx).await,
            SessionEvent::RequestReport => self.report(gateway, config, command_tx).await,
        }
    }

    async fn start<G: Gateway + Send + Sync>(
        &mut self,
        gateway: &G,
        config: &InterviewConfig,
        command_tx: tokio::sync::mpsc::Sender<Command>,
    ) -> Result<()> {
        self.transcript.clear();
        self.turn_count = 0;
        self.feedback = None;
        self.phase = Phase::AwaitingFirstQuestion;

        let question = self.fetch_question(gateway, config).await;
        self.transcript.push(Speaker::Interviewer, question.clone());
        self.turn_count = 1;
        self.phase = Phase::AwaitingAnswer;

        command_tx
            .send(Command::SpeakText(question))
            .await
            .context("Failed to send SpeakText command")
    }

    async fn answer<G: Gateway + Send + Sync>(
        &mut self,
        gateway: &G,
        config: &InterviewConfig,
        text: String,
        command_tx: tokio::sync::mpsc::Sender<Command>,
    ) -> Result<()> {
        if self.phase != Phase::AwaitingAnswer {
            tracing::warn!(phase = ?self.phase, "Ignoring answer outside of an active interview");
            return Ok(());
        }

        self.transcript.push(Speaker::Candidate, text);

        if self.turn_count >= config.target_questions {
            self.phase = Phase::Concluded;
            return command_tx
                .send(Command::SessionComplete(
                    "Interview complete. You can request your performance report now.".to_string(),
                ))
                .await
                .context("Failed to send SessionComplete command");
        }

        let question = self.fetch_question(gateway, config).await;
        self.transcript.push(Speaker::Interviewer, question.clone());
        self.turn_count += 1;

        command_tx
            .send(Command::SpeakText(question))
            .await
            .context("Failed to send SpeakText command")
    }

    async fn report<G: Gateway + Send + Sync>(
        &mut self,
        gateway: &G,
        config: &InterviewConfig,
        command_tx: tokio::sync::mpsc::Sender<Command>,
    ) -> Result<()> {
        if self.phase != Phase::Concluded {
            tracing::warn!(phase = ?self.phase, "Ignoring report request before conclusion");
            return Ok(());
        }

        let prompt = prompt::evaluator_prompt(&config.role);
        let context = GenerationContext::FullTranscript(self.transcript.render());
        let feedback = match gateway.generate(&prompt, &context).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Evaluation call failed: {e}");
                failure_reply(&e)
            }
        };

        self.feedback = Some(feedback.clone());
        self.phase = Phase::ReportGenerated;

        command_tx
            .send(Command::ReportReady(feedback))
            .await
            .context("Failed to send ReportReady command")
    }

    /// Asks the gateway for the next interviewer question against the
    /// rolling history. A failed call degrades into the marker-prefixed
    /// diagnostic string so the interview always moves forward.
    async fn fetch_question<G: Gateway + Send + Sync>(
        &self,
        gateway: &G,
        config: &InterviewConfig,
    ) -> String {
        let prompt =
            prompt::interviewer_prompt(&config.role, config.persona, config.target_questions);
        let context = GenerationContext::History(self.transcript.render());
        match gateway.generate(&prompt, &context).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Question generation failed: {e}");
                failure_reply(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{FAILURE_MARKER, GatewayError, MockGateway};

    fn config(target: u8) -> InterviewConfig {
        InterviewConfig {
            role: "Backend Engineer".to_string(),
            persona: Persona::Standard,
            target_questions: target,
        }
    }

    fn channel() -> (
        tokio::sync::mpsc::Sender<Command>,
        tokio::sync::mpsc::Receiver<Command>,
    ) {
        tokio::sync::mpsc::channel(8)
    }

    #[tokio::test]
    async fn start_resets_and_fetches_the_first_question() {
        // --- Arrange ---
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate()
            .returning(|_, _| Ok("Tell me about yourself.".to_string()))
            .once();

        let mut session = InterviewSession::new();
        let (tx, mut rx) = channel();

        // --- Act ---
        session
            .handle(&gateway, &config(3), SessionEvent::Start, tx)
            .await
            .unwrap();

        // --- Assert ---
        assert_eq!(session.phase, Phase::AwaitingAnswer);
        assert_eq!(session.turn_count, 1);
        assert_eq!(session.transcript.len(), 1);
        assert!(session.transcript.alternates());
        assert!(session.feedback.is_none());

        match rx.try_recv().unwrap() {
            Command::SpeakText(text) => assert_eq!(text, "Tell me about yourself."),
            other => panic!("Expected SpeakText, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_is_a_reset_from_any_phase() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate()
            .returning(|_, _| Ok("Next question?".to_string()));

        let mut session = InterviewSession::new();
        session.phase = Phase::ReportGenerated;
        session.turn_count = 4;
        session.feedback = Some("old report".to_string());

        let (tx, _rx) = channel();
        session
            .handle(&gateway, &config(3), SessionEvent::Start, tx)
            .await
            .unwrap();

        assert_eq!(session.phase, Phase::AwaitingAnswer);
        assert_eq!(session.turn_count, 1);
        assert_eq!(session.transcript.len(), 1);
        assert!(session.feedback.is_none());
    }

    #[tokio::test]
    async fn three_question_interview_concludes_with_six_turns() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate()
            .returning(|_, _| Ok("Here is a question.".to_string()));

        let mut session = InterviewSession::new();
        let cfg = config(3);

        let (tx, mut rx) = channel();
        session
            .handle(&gateway, &cfg, SessionEvent::Start, tx.clone())
            .await
            .unwrap();

        for i in 0..3 {
            session
                .handle(
                    &gateway,
                    &cfg,
                    SessionEvent::Answer(format!("answer {i}")),
                    tx.clone(),
                )
                .await
                .unwrap();
            assert!(session.transcript.alternates());
            assert!(session.turn_count <= cfg.target_questions);
        }

        assert_eq!(session.phase, Phase::Concluded);
        assert_eq!(session.turn_count, 3);
        assert_eq!(session.transcript.len(), 6);
        let interviewer_turns = session
            .transcript
            .turns()
            .iter()
            .filter(|t| t.speaker == Speaker::Interviewer)
            .count();
        assert_eq!(interviewer_turns, 3);

        // The last emitted command must be the conclusion.
        let mut last = None;
        while let Ok(command) = rx.try_recv() {
            last = Some(command);
        }
        match last {
            Some(Command::SessionComplete(_)) => {}
            other => panic!("Expected SessionComplete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_failure_becomes_a_marked_turn_and_never_blocks() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate()
            .returning(|_, _| Err(GatewayError::EmptyResponse));

        let mut session = InterviewSession::new();
        let (tx, mut rx) = channel();
        session
            .handle(&gateway, &config(3), SessionEvent::Start, tx)
            .await
            .unwrap();

        // The failure is substituted as the interviewer turn; the session
        // still progresses into AwaitingAnswer.
        assert_eq!(session.phase, Phase::AwaitingAnswer);
        let first = &session.transcript.turns()[0];
        assert!(first.content.starts_with(FAILURE_MARKER));

        match rx.try_recv().unwrap() {
            Command::SpeakText(text) => assert!(text.contains(FAILURE_MARKER)),
            other => panic!("Expected SpeakText, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn report_request_generates_feedback_and_terminates() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate()
            .withf(|prompt, context| {
                prompt.contains("Senior Hiring Manager")
                    && matches!(context, GenerationContext::FullTranscript(_))
            })
            .returning(|_, _| Ok("Summary: solid. Overall Rating: 8/10".to_string()))
            .once();

        let mut session = InterviewSession::new();
        session.phase = Phase::Concluded;

        let (tx, mut rx) = channel();
        session
            .handle(&gateway, &config(3), SessionEvent::RequestReport, tx)
            .await
            .unwrap();

        assert_eq!(session.phase, Phase::ReportGenerated);
        assert!(session.feedback.as_deref().unwrap().contains("8/10"));

        match rx.try_recv().unwrap() {
            Command::ReportReady(text) => assert!(text.contains("8/10")),
            other => panic!("Expected ReportReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn report_failure_is_stored_as_marked_feedback() {
        let mut gateway = MockGateway::new();
        gateway.expect_generate().returning(|_, _| {
            Err(GatewayError::Service {
                status: 500,
                detail: "backend unavailable".to_string(),
            })
        });

        let mut session = InterviewSession::new();
        session.phase = Phase::Concluded;

        let (tx, _rx) = channel();
        session
            .handle(&gateway, &config(3), SessionEvent::RequestReport, tx)
            .await
            .unwrap();

        assert_eq!(session.phase, Phase::ReportGenerated);
        assert!(
            session
                .feedback
                .as_deref()
                .unwrap()
                .starts_with(FAILURE_MARKER)
        );
    }

    #[tokio::test]
    async fn events_out_of_phase_are_ignored() {
        // No gateway expectations: the mock panics if generate is called.
        let gateway = MockGateway::new();

        let mut session = InterviewSession::new();
        let (tx, mut rx) = channel();

        session
            .handle(
                &gateway,
                &config(3),
                SessionEvent::Answer("early answer".to_string()),
                tx.clone(),
            )
            .await
            .unwrap();
        session
            .handle(&gateway, &config(3), SessionEvent::RequestReport, tx)
            .await
            .unwrap();

        assert_eq!(session.phase, Phase::Idle);
        assert!(session.transcript.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn transcript_renders_in_prompt_form() {
        let mut transcript = Transcript::new();
        transcript.push(Speaker::Interviewer, "What is Rust?".to_string());
        transcript.push(Speaker::Candidate, "A systems language.".to_string());

        assert_eq!(
            transcript.render(),
            "Interviewer: What is Rust?\nCandidate: A systems language."
        );
        assert!(transcript.alternates());
    }
}
