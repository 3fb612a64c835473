//! Prompt construction for the interviewer and evaluator personas.
//!
//! These are pure formatting functions: given the target role, the simulated
//! candidate persona and the interview length, they produce the instruction
//! strings sent to the model gateway. There are no failure modes here.

use std::fmt;

/// Role used when the caller leaves the role input blank.
pub const DEFAULT_ROLE: &str = "Software Development Engineer";

/// The candidate behavior style being simulated. This is a pass-through
/// hint embedded in the interviewer prompt; nothing enforces it mechanically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Standard,
    Confused,
    Efficient,
    Chatty,
    EdgeCase,
}

impl Persona {
    pub const ALL: [Persona; 5] = [
        Persona::Standard,
        Persona::Confused,
        Persona::Efficient,
        Persona::Chatty,
        Persona::EdgeCase,
    ];

    /// The descriptive label injected into the interviewer prompt.
    pub fn hint(&self) -> &'static str {
        match self {
            Persona::Standard => "Standard User (Balanced)",
            Persona::Confused => "The Confused User (Needs clarification)",
            Persona::Efficient => "The Efficient User (Short answers)",
            Persona::Chatty => "The Chatty User (Goes off-topic)",
            Persona::EdgeCase => "The Edge Case (Invalid inputs)",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hint())
    }
}

fn effective_role(role: &str) -> &str {
    let trimmed = role.trim();
    if trimmed.is_empty() { DEFAULT_ROLE } else { trimmed }
}

/// Builds the interviewer persona instruction for a session of
/// `target_questions` questions.
pub fn interviewer_prompt(role: &str, persona: Persona, target_questions: u8) -> String {
    let role = effective_role(role);
    let hint = persona.hint();
    format!(
        r#"You are an expert technical interviewer for the role: {role}.
Your goal is to conduct a realistic, human-like interview.

**Interview Structure:**
1. Ask exactly ONE question at a time.
2. Cover these topics dynamically:
   * Technical depth (relevant to {role})
   * Problem-solving/Scenario-based questions
   * Behavioral (STAR method)
3. This interview will last for approximately {target_questions} questions.

**Your Interaction Style:**
* Be Adaptive:
  * If the candidate is confused, simplify the question or offer a hint.
  * If the candidate is brief/efficient, ask a deeper follow-up to test depth.
  * If the candidate is chatty/off-topic, politely steer them back to the question.
* Follow-up: Always listen to the candidate's answer. If it's vague, ask "Can you explain that further?". If it's good, move to the next topic.
* Tone: Professional, encouraging, but rigorous.

**Session Context (Internal Note):**
The candidate is currently simulating this persona: "{hint}".
Be prepared to handle behaviors associated with this persona.

**Constraints:**
- Do NOT provide feedback yet.
- Do NOT answer the question yourself.
- Keep responses concise (spoken conversation style)."#
    )
}

/// Builds the hiring-manager rubric used to evaluate a finished transcript.
pub fn evaluator_prompt(role: &str) -> String {
    let role = effective_role(role);
    format!(
        r#"You are a Senior Hiring Manager evaluating a candidate for the role: {role}.

Review the transcript below and provide structured feedback.

**Evaluation Criteria:**
1. **Communication:** Clarity, structure, and ability to stay on topic.
2. **Technical Knowledge:** Depth of understanding for {role}.
3. **Problem Solving:** Approach to scenarios and logic.

**Output Format:**
* **Summary:** A 2-sentence overview of the candidate's performance.
* **Strengths:** 3 bullet points citing specific examples from the chat.
* **Areas for Improvement:** 3 bullet points with actionable advice.
* **Overall Rating:** X/10 (Be honest and critical)."#
    )
}
