use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    /// The host's own attempt. Drives rendering but never counts in
    /// student-facing aggregates.
    Preview,
    Finished,
}

/// One participant's answer to one slot. Created lazily when the question
/// starts; overwritten wholesale on resubmission (last write wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub responded: bool,
    /// One element per selected option for multi-choice, a single element
    /// for free text. Always stored trimmed.
    pub answer: Vec<String>,
}

impl ResponseRecord {
    pub fn pending() -> Self {
        Self {
            responded: false,
            answer: Vec::new(),
        }
    }
}

/// One participant's run through a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub session_id: String,
    pub identity: Identity,
    pub status: AttemptStatus,
    /// Keyed by slot; slots are 1-based.
    pub responses: BTreeMap<u32, ResponseRecord>,
    pub time_start: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
    pub time_finish: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn is_active(&self) -> bool {
        matches!(self.status, AttemptStatus::InProgress | AttemptStatus::Preview)
    }

    pub fn is_preview(&self) -> bool {
        self.status == AttemptStatus::Preview
    }

    /// Number of slots this participant has actually answered.
    pub fn total_answers(&self) -> u32 {
        self.responses.values().filter(|r| r.responded).count() as u32
    }

    pub fn has_responded(&self, slot: u32) -> bool {
        self.responses.get(&slot).map(|r| r.responded).unwrap_or(false)
    }

    /// Fill in pending records for every slot presented so far. Late
    /// joiners get the same set of slots as everyone else.
    pub fn create_missing_records(&mut self, upto_slot: u32) {
        for slot in 1..=upto_slot {
            self.responses
                .entry(slot)
                .or_insert_with(ResponseRecord::pending);
        }
    }
}

/// Denormalized "who is still active" row, kept per authenticated user and
/// refreshed after every accepted submission. Guests are reported straight
/// from their attempts instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// `None` once attendance has been anonymized.
    pub user_id: Option<String>,
    pub num_responses: u32,
}
