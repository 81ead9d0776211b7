use std::sync::Arc;

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::error::QuizError;
use crate::metrics::RESPONSES_SUBMITTED_TOTAL;
use crate::models::{
    Attempt, AttemptStatus, AttendanceEntry, AttendanceRecord, Identity, JoinResponse,
    ResponseRecord, SessionStatus, SubmitResponseRequest, SubmitResponseResponse,
};
use crate::services::question_source::QuestionSource;
use crate::services::session_service::ensure_host;
use crate::store::SessionStore;

pub struct AttemptService {
    store: Arc<SessionStore>,
    questions: Arc<dyn QuestionSource>,
}

impl AttemptService {
    pub fn new(store: Arc<SessionStore>, questions: Arc<dyn QuestionSource>) -> Self {
        Self { store, questions }
    }

    /// Idempotent join: repeated calls for the same identity return the
    /// same attempt. Anonymous callers get a guest token minted for them
    /// when the session allows guests.
    pub async fn join(
        &self,
        session_id: &str,
        identity: Option<Identity>,
    ) -> Result<JoinResponse, QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        if !state.session.open {
            return Err(QuizError::invalid_transition("session is closed"));
        }

        let (identity, guest_token) = match identity {
            Some(identity) => (identity, None),
            None if state.session.allow_guests => {
                let token: String = rand::rng()
                    .sample_iter(&Alphanumeric)
                    .take(16)
                    .map(char::from)
                    .collect();
                (Identity::Guest(token.clone()), Some(token))
            }
            None => {
                return Err(QuizError::unauthorized(
                    "this session does not allow guests",
                ))
            }
        };

        let slot = state.session.slot;
        if let Some(attempt) = state
            .attempts
            .iter_mut()
            .find(|a| a.identity == identity)
        {
            // Already joined; just make sure the slot set is complete.
            attempt.create_missing_records(slot);
            attempt.time_modified = Utc::now();
            return Ok(JoinResponse {
                attempt_id: attempt.id.clone(),
                status: attempt.status,
                guest_token,
            });
        }

        let status = if identity.user_id() == Some(state.session.host_id.as_str()) {
            AttemptStatus::Preview
        } else {
            AttemptStatus::InProgress
        };
        let now = Utc::now();
        let mut attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            identity,
            status,
            responses: Default::default(),
            time_start: now,
            time_modified: now,
            time_finish: None,
        };
        attempt.create_missing_records(slot);
        let attempt_id = attempt.id.clone();
        state.attempts.push(attempt);
        tracing::info!("Attempt {} joined session {}", attempt_id, session_id);

        Ok(JoinResponse {
            attempt_id,
            status,
            guest_token,
        })
    }

    /// Store a response for the current slot. Last write wins; a duplicate
    /// or corrected submission simply overwrites the record.
    pub async fn submit_response(
        &self,
        session_id: &str,
        identity: &Identity,
        req: SubmitResponseRequest,
    ) -> Result<SubmitResponseResponse, QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        if state.session.status != SessionStatus::Running {
            return Err(QuizError::invalid_transition("no question is open"));
        }
        if req.slot == 0 || req.slot > state.session.slot {
            return Err(QuizError::not_found(format!("no such slot {}", req.slot)));
        }
        if req.slot != state.session.slot {
            return Err(QuizError::invalid_transition(format!(
                "slot {} is no longer open",
                req.slot
            )));
        }

        let answer: Vec<String> = req
            .answer
            .iter()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();
        if answer.is_empty() {
            return Err(QuizError::bad_request("empty response"));
        }

        let question_id = state
            .session
            .current_question()
            .map(|q| q.question_id.clone())
            .ok_or_else(|| QuizError::invalid_transition("no question is open"))?;

        let slot = req.slot;
        let index = state
            .attempts
            .iter()
            .position(|a| a.identity == *identity)
            .ok_or_else(|| {
                QuizError::unauthorized("no attempt for this identity; join the session first")
            })?;
        {
            let attempt = &mut state.attempts[index];
            if !attempt.is_active() {
                return Err(QuizError::invalid_transition("attempt is finished"));
            }
            attempt.responses.insert(
                slot,
                ResponseRecord {
                    responded: true,
                    answer,
                },
            );
            attempt.time_modified = Utc::now();
        }

        // Attendance is denormalized per authenticated user and refreshed
        // after every accepted submission. Guests are reported from their
        // attempts instead.
        let is_preview = state.attempts[index].is_preview();
        if let Identity::User(user_id) = identity {
            if !is_preview {
                let num_responses = state.attempts[index].total_answers();
                match state
                    .attendance
                    .iter_mut()
                    .find(|r| r.user_id.as_deref() == Some(user_id.as_str()))
                {
                    Some(record) => record.num_responses = num_responses,
                    None => state.attendance.push(AttendanceRecord {
                        user_id: Some(user_id.clone()),
                        num_responses,
                    }),
                }
            }
        }

        let qtype = match self.questions.definition(&question_id).await {
            Ok(def) => def.kind.label(),
            Err(_) => "unknown",
        };
        RESPONSES_SUBMITTED_TOTAL.with_label_values(&[qtype]).inc();
        tracing::debug!(
            "Response stored for session {} slot {} ({})",
            session_id,
            slot,
            qtype
        );

        Ok(SubmitResponseResponse {
            slot,
            responded: true,
        })
    }

    /// Instructor view of who is still active. Names respect the session's
    /// anonymity policy.
    pub async fn attendance(
        &self,
        session_id: &str,
        caller: &Identity,
    ) -> Result<Vec<AttendanceEntry>, QuizError> {
        let handle = self.store.get(session_id).await?;
        let state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        let anonymous = state.session.anonymity.anonymous_attendance();
        let mut entries: Vec<AttendanceEntry> = state
            .attendance
            .iter()
            .map(|record| AttendanceEntry {
                name: match (&record.user_id, anonymous) {
                    (Some(user_id), false) => user_id.clone(),
                    _ => "Anonymous".to_string(),
                },
                count: record.num_responses,
            })
            .collect();
        for attempt in &state.attempts {
            if attempt.identity.is_guest() {
                entries.push(AttendanceEntry {
                    name: "Anonymous".to_string(),
                    count: attempt.total_answers(),
                });
            }
        }
        Ok(entries)
    }
}
