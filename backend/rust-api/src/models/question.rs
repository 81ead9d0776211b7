use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    ShortAnswer,
    MultiChoice,
    TrueFalse,
}

impl QuestionKind {
    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::ShortAnswer => "short_answer",
            QuestionKind::MultiChoice => "multi_choice",
            QuestionKind::TrueFalse => "true_false",
        }
    }
}

/// A question definition as the bank hands it out. `answers` holds the
/// correct answer(s): a single right-answer summary for short answer and
/// true/false, the full correct set for multi-choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: String,
    pub name: String,
    pub kind: QuestionKind,
    pub text: String,
    /// All selectable options for multi-choice questions, empty otherwise.
    pub options: Vec<String>,
    pub answers: Vec<String>,
    /// Created ad hoc during a live session; destroyed when it closes.
    pub ephemeral: bool,
}

impl QuestionDefinition {
    /// Whether a single canonical response part matches one of the correct
    /// answers. Full-response correctness is the question source's job; this
    /// only flags individual tally rows.
    pub fn accepts_part(&self, part: &str) -> bool {
        self.answers.iter().any(|a| a.trim() == part)
    }
}

/// What pollers need in order to render an input form for the current
/// question. No scoring data leaks through here.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedQuestion {
    pub question_id: String,
    pub name: String,
    pub kind: QuestionKind,
    pub text: String,
    pub options: Vec<String>,
}

/// Payload for an improvised (ad hoc) question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImproviseSpec {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
}

/// Inline question supplied when planning a session.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlannedQuestionSpec {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    /// Seconds; 0 means no timer.
    #[serde(default)]
    pub time: u32,
}
