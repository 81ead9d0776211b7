use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::QuizError;
use crate::metrics::{QUESTIONS_STARTED_TOTAL, SESSIONS_OPEN, SESSIONS_TOTAL};
use crate::models::{
    Anonymity, AttemptStatus, CreateSessionRequest, CreateSessionResponse, Identity,
    PlannedQuestion, QuestionDefinition, RunVotingRequest, Session, SessionQuestion,
    SessionResponse, SessionStatus, SessionStatusResponse, StartQuestionRequest,
    StartQuestionResponse, VoteOption, timer,
};
use crate::services::question_source::QuestionSource;
use crate::store::{SessionState, SessionStore};

pub struct SessionService {
    store: Arc<SessionStore>,
    questions: Arc<dyn QuestionSource>,
    default_wait_time: u32,
}

/// Commands are all-or-nothing: each one takes the session lock, validates
/// against the current status, and only then mutates. A rejected command
/// leaves the session untouched.
impl SessionService {
    pub fn new(
        store: Arc<SessionStore>,
        questions: Arc<dyn QuestionSource>,
        default_wait_time: u32,
    ) -> Self {
        Self {
            store,
            questions,
            default_wait_time,
        }
    }

    pub async fn create_session(
        &self,
        caller: &Identity,
        req: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, QuizError> {
        req.validate()?;
        let host_id = caller
            .user_id()
            .ok_or_else(|| QuizError::unauthorized("guests cannot host a session"))?
            .to_string();

        let mut planned = Vec::with_capacity(req.questions.len());
        for spec in &req.questions {
            spec.validate()?;
            let question_id = self
                .questions
                .insert(QuestionDefinition {
                    id: Uuid::new_v4().to_string(),
                    name: spec.name.clone(),
                    kind: spec.kind,
                    text: spec.text.clone(),
                    options: spec.options.clone(),
                    answers: spec.answers.clone(),
                    ephemeral: false,
                })
                .await?;
            planned.push(PlannedQuestion {
                question_id,
                time: spec.time,
            });
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            host_id: host_id.clone(),
            open: true,
            status: SessionStatus::NotRunning,
            slot: 0,
            question_time: None,
            next_start_time: None,
            anonymity: req.anonymity,
            allow_guests: req.allow_guests,
            wait_time: req.wait_time.unwrap_or(self.default_wait_time),
            created: Utc::now(),
            planned,
            planned_cursor: None,
            questions: Vec::new(),
            improvised: Vec::new(),
            vote_slot: None,
        };
        let session_id = session.id.clone();
        let question_count = session.planned.len();
        self.store.insert(SessionState::new(session)).await?;

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_OPEN.inc();
        tracing::info!("Session created: {} by host {}", session_id, host_id);

        Ok(CreateSessionResponse {
            session_id,
            status: SessionStatus::NotRunning,
            question_count,
        })
    }

    pub async fn start_quiz(&self, session_id: &str, caller: &Identity) -> Result<(), QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        ensure_open(&state.session)?;
        if state.session.status != SessionStatus::NotRunning {
            return Err(QuizError::invalid_transition(format!(
                "cannot start quiz while {:?}",
                state.session.status
            )));
        }
        state.session.status = SessionStatus::Preparing;
        tracing::info!("Session {} is preparing", session_id);
        Ok(())
    }

    pub async fn start_question(
        &self,
        session_id: &str,
        caller: &Identity,
        req: StartQuestionRequest,
    ) -> Result<StartQuestionResponse, QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        ensure_open(&state.session)?;
        if !matches!(
            state.session.status,
            SessionStatus::Preparing | SessionStatus::Reviewing
        ) {
            return Err(QuizError::invalid_transition(format!(
                "cannot start a question while {:?}",
                state.session.status
            )));
        }

        // Resolve the question before mutating anything.
        let (question_id, time, cursor, method) = match &req {
            StartQuestionRequest::Jump {
                question_index,
                time,
            } => {
                let planned = state.session.planned.get(*question_index).ok_or_else(|| {
                    QuizError::not_found(format!("no planned question {}", question_index))
                })?;
                (
                    planned.question_id.clone(),
                    time.unwrap_or(planned.time),
                    Some(*question_index),
                    "jump",
                )
            }
            StartQuestionRequest::Next => {
                let next = state.session.planned_cursor.map(|c| c + 1).unwrap_or(0);
                let planned = state.session.planned.get(next).ok_or_else(|| {
                    QuizError::not_found("already past the last planned question")
                })?;
                (planned.question_id.clone(), planned.time, Some(next), "next")
            }
            StartQuestionRequest::Repoll => {
                let last = state.session.current_question().ok_or_else(|| {
                    QuizError::not_found("no previous question to re-poll")
                })?;
                (last.question_id.clone(), last.time, None, "repoll")
            }
            StartQuestionRequest::Improvise(spec) => {
                spec.validate()?;
                let id = self.questions.create_ephemeral(spec).await?;
                (id, 0, None, "improvise")
            }
        };

        let slot = state.session.questions.len() as u32 + 1;
        state.session.questions.push(SessionQuestion {
            slot,
            question_id: question_id.clone(),
            time,
        });
        if let Some(index) = cursor {
            state.session.planned_cursor = Some(index);
        }
        if matches!(req, StartQuestionRequest::Improvise(_)) {
            state.session.improvised.push(question_id.clone());
        }
        // Late joiners and existing attempts alike get a pending record for
        // every slot presented so far.
        for attempt in &mut state.attempts {
            attempt.create_missing_records(slot);
        }
        let next_start_time = Utc::now() + Duration::seconds(i64::from(state.session.wait_time));
        state.session.slot = slot;
        state.session.question_time = Some(time);
        state.session.next_start_time = Some(next_start_time);
        state.session.status = SessionStatus::Running;

        QUESTIONS_STARTED_TOTAL.with_label_values(&[method]).inc();
        tracing::info!(
            "Session {} started question {} at slot {} ({})",
            session_id,
            question_id,
            slot,
            method
        );

        Ok(StartQuestionResponse {
            slot,
            question_id,
            question_time: time,
            next_start_time,
        })
    }

    pub async fn end_question(&self, session_id: &str, caller: &Identity) -> Result<(), QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        ensure_open(&state.session)?;
        if !matches!(
            state.session.status,
            SessionStatus::Running | SessionStatus::Voting
        ) {
            return Err(QuizError::invalid_transition(format!(
                "cannot end a question while {:?}",
                state.session.status
            )));
        }
        state.session.status = SessionStatus::Reviewing;
        tracing::info!("Session {} is reviewing slot {}", session_id, state.session.slot);
        Ok(())
    }

    pub async fn run_voting(
        &self,
        session_id: &str,
        caller: &Identity,
        req: RunVotingRequest,
    ) -> Result<(), QuizError> {
        req.validate()?;
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        ensure_open(&state.session)?;
        if state.session.status != SessionStatus::Reviewing {
            return Err(QuizError::invalid_transition(format!(
                "cannot run voting while {:?}",
                state.session.status
            )));
        }
        let slot = state.session.slot;
        if slot == 0 {
            return Err(QuizError::invalid_transition(
                "no question has been presented yet",
            ));
        }
        // A new round discards the previous one wholesale.
        state.votes = req
            .options
            .into_iter()
            .map(|option| VoteOption {
                id: Uuid::new_v4().to_string(),
                slot,
                text: option.text,
                initial_count: option.count,
                final_count: 0,
                voters: Vec::new(),
            })
            .collect();
        state.session.vote_slot = Some(slot);
        state.session.status = SessionStatus::Voting;
        tracing::info!("Session {} opened a vote round for slot {}", session_id, slot);
        Ok(())
    }

    /// One-way door: anonymize per policy, finish every open attempt and
    /// clean up improvised questions. The session cannot be reopened.
    pub async fn close_session(
        &self,
        session_id: &str,
        caller: &Identity,
    ) -> Result<(), QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        if !state.session.open {
            return Err(QuizError::invalid_transition("session is already closed"));
        }

        if state.session.anonymity.anonymous_attendance() {
            for record in &mut state.attendance {
                record.user_id = None;
            }
        }
        let anonymous_answers = state.session.anonymity.anonymous_answers();
        let now = Utc::now();
        for attempt in &mut state.attempts {
            if anonymous_answers {
                attempt.identity = Identity::Anonymous;
            }
            // The instructor stays in preview.
            if !attempt.is_preview() {
                attempt.status = AttemptStatus::Finished;
            }
            attempt.time_finish = Some(now);
            attempt.time_modified = now;
        }
        for question_id in state.session.improvised.clone() {
            if let Err(e) = self.questions.destroy(&question_id).await {
                tracing::warn!("Failed to destroy improvised question {}: {}", question_id, e);
            }
        }
        state.session.improvised.clear();
        state.session.open = false;
        state.session.status = SessionStatus::NotRunning;
        state.session.question_time = None;
        state.session.next_start_time = None;
        state.session.vote_slot = None;

        SESSIONS_TOTAL.with_label_values(&["closed"]).inc();
        SESSIONS_OPEN.dec();
        tracing::info!("Session {} closed", session_id);
        Ok(())
    }

    pub async fn overview(&self, session_id: &str) -> Result<SessionResponse, QuizError> {
        let handle = self.store.get(session_id).await?;
        let state = handle.lock().await;
        Ok(SessionResponse {
            id: state.session.id.clone(),
            name: state.session.name.clone(),
            status: state.session.status,
            open: state.session.open,
            slot: state.session.slot,
            question_count: state.session.planned.len(),
            student_count: student_count(&state),
            anonymity: state.session.anonymity,
            allow_guests: state.session.allow_guests,
            created: state.session.created,
        })
    }

    /// The polling snapshot. Safe to call repeatedly from any role; the
    /// countdown is computed per call, never ticked server-side.
    pub async fn status(&self, session_id: &str) -> Result<SessionStatusResponse, QuizError> {
        let handle = self.store.get(session_id).await?;
        let state = handle.lock().await;
        let session = &state.session;
        let (countdown, question) = if session.status == SessionStatus::Running {
            let countdown = match (session.next_start_time, session.question_time) {
                (Some(next_start), Some(time)) => {
                    Some(timer::countdown(Utc::now(), next_start, time))
                }
                _ => None,
            };
            let question = match session.current_question() {
                Some(current) => Some(self.questions.render(&current.question_id).await?),
                None => None,
            };
            (countdown, question)
        } else {
            (None, None)
        };
        let slot = session.slot;
        let responded = state
            .attempts
            .iter()
            .filter(|a| !a.is_preview() && a.has_responded(slot))
            .count() as u32;
        Ok(SessionStatusResponse {
            status: session.status,
            open: session.open,
            slot,
            question_time: session.question_time,
            countdown,
            question,
            results: None,
            responded,
            student_count: student_count(&state),
        })
    }
}

/// Number of participating students. The host's preview attempt never
/// counts; respondent counts are tracked independently of answer-option
/// counts.
pub fn student_count(state: &SessionState) -> u32 {
    state.attempts.iter().filter(|a| !a.is_preview()).count() as u32
}

pub fn ensure_host(session: &Session, caller: &Identity) -> Result<(), QuizError> {
    match caller {
        Identity::User(id) if *id == session.host_id => Ok(()),
        _ => Err(QuizError::unauthorized(
            "only the session host can control the quiz",
        )),
    }
}

pub fn ensure_open(session: &Session) -> Result<(), QuizError> {
    if session.open {
        Ok(())
    } else {
        Err(QuizError::invalid_transition("session is closed"))
    }
}

/// Participant name as shown in results and exports. There is no user
/// directory here; the upstream id doubles as the display name.
pub fn display_name(anonymity: Anonymity, identity: &Identity) -> String {
    if anonymity.anonymous_answers() {
        return "Anonymous".to_string();
    }
    match identity {
        Identity::User(id) => id.clone(),
        Identity::Guest(_) | Identity::Anonymous => "Anonymous".to_string(),
    }
}
