use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub mod attempt;
pub mod identity;
pub mod merge;
pub mod question;
pub mod timer;
pub mod vote;

pub use attempt::{Attempt, AttemptStatus, AttendanceRecord, ResponseRecord};
pub use identity::Identity;
pub use merge::MergeRule;
pub use question::{
    ImproviseSpec, PlannedQuestionSpec, QuestionDefinition, QuestionKind, RenderedQuestion,
};
pub use timer::Countdown;
pub use vote::{CastVoteRequest, RunVotingRequest, VoteOption, VoteResults, VoteTally};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotRunning,
    Preparing,
    Running,
    Reviewing,
    Voting,
}

/// What identifying data survives when the session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anonymity {
    /// Answers are anonymous, attendance is not.
    AnonymousAnswers,
    /// Both answers and attendance are anonymous.
    FullyAnonymous,
    Identified,
}

impl Anonymity {
    pub fn anonymous_answers(&self) -> bool {
        !matches!(self, Anonymity::Identified)
    }

    pub fn anonymous_attendance(&self) -> bool {
        matches!(self, Anonymity::FullyAnonymous)
    }
}

/// A pre-planned entry in the session's question list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedQuestion {
    pub question_id: String,
    /// Seconds; 0 means no timer.
    pub time: u32,
}

/// Append-only log entry: which question was presented at which slot.
/// Slot numbers are assigned sequentially and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuestion {
    pub slot: u32,
    pub question_id: String,
    pub time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    /// The one instructor in control of this session.
    pub host_id: String,
    pub open: bool,
    pub status: SessionStatus,
    /// Current slot; 0 before the first question.
    pub slot: u32,
    pub question_time: Option<u32>,
    pub next_start_time: Option<DateTime<Utc>>,
    pub anonymity: Anonymity,
    pub allow_guests: bool,
    /// Announcement delay applied before each question's timer starts.
    pub wait_time: u32,
    pub created: DateTime<Utc>,
    pub planned: Vec<PlannedQuestion>,
    /// Index into `planned` of the last planned question presented.
    /// Improvised and repolled questions leave it alone.
    pub planned_cursor: Option<usize>,
    pub questions: Vec<SessionQuestion>,
    /// Ephemeral question ids to destroy when the session closes.
    pub improvised: Vec<String>,
    /// Slot the current vote round is pinned to.
    pub vote_slot: Option<u32>,
}

impl Session {
    pub fn current_question(&self) -> Option<&SessionQuestion> {
        self.questions.last()
    }
}

fn default_anonymity() -> Anonymity {
    Anonymity::Identified
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default = "default_anonymity")]
    pub anonymity: Anonymity,
    #[serde(default)]
    pub allow_guests: bool,
    /// Falls back to the configured default when omitted.
    #[serde(default)]
    pub wait_time: Option<u32>,
    #[validate(nested)]
    #[serde(default)]
    pub questions: Vec<PlannedQuestionSpec>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub question_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub name: String,
    pub status: SessionStatus,
    pub open: bool,
    pub slot: u32,
    pub question_count: usize,
    pub student_count: u32,
    pub anonymity: Anonymity,
    pub allow_guests: bool,
    pub created: DateTime<Utc>,
}

/// The role-agnostic polling snapshot. Everything a client needs to decide
/// what to show next without a persistent connection.
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub status: SessionStatus,
    pub open: bool,
    pub slot: u32,
    pub question_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<Countdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<RenderedQuestion>,
    /// Aggregated results for the current slot, present while reviewing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<QuestionResults>,
    pub responded: u32,
    pub student_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StartQuestionRequest {
    /// Go to an explicit pre-planned question, keeping its configured
    /// duration unless overridden.
    Jump {
        question_index: usize,
        #[serde(default)]
        time: Option<u32>,
    },
    /// Advance exactly one position in the planned list.
    Next,
    /// Re-run the most recent slot's question with its previous duration.
    Repoll,
    /// Create a question on the fly.
    Improvise(ImproviseSpec),
}

#[derive(Debug, Serialize)]
pub struct StartQuestionResponse {
    pub slot: u32,
    pub question_id: String,
    pub question_time: u32,
    pub next_start_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub attempt_id: String,
    pub status: AttemptStatus,
    /// Only set when a guest token was minted by this call. The client must
    /// send it back as `x-guest-token` on every later request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub slot: u32,
    pub answer: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponseResponse {
    pub slot: u32,
    pub responded: bool,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub slot: u32,
    pub from: String,
    pub into: String,
}

#[derive(Debug, Deserialize)]
pub struct UndoMergeRequest {
    pub slot: u32,
}

#[derive(Debug, Serialize)]
pub struct ResponseTallyRow {
    pub response: String,
    pub count: u32,
    /// Whether this canonical text matches one of the correct answers.
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct QuestionResults {
    pub slot: u32,
    pub question_id: String,
    /// Every canonical response part, flattened across respondents.
    pub responses: Vec<String>,
    pub tally: Vec<ResponseTallyRow>,
    pub responded: u32,
    pub student_count: u32,
    pub merge_count: u32,
    /// Respondents whose full response the question source scored correct.
    pub correct_count: u32,
}

#[derive(Debug, Serialize)]
pub struct KeywordWeight {
    pub word: String,
    /// Scaled so the most frequent word is 100.
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct AttendanceEntry {
    pub name: String,
    pub count: u32,
}
