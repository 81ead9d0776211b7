use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::QuizError;
use crate::models::{Attempt, AttendanceRecord, MergeRule, Session, VoteOption};

/// Everything scoped under one session: the session row itself, every
/// attempt, the merge log, the vote round and the attendance rows. Durable
/// storage proper is an external concern; this bundle presents the state a
/// request handler would reload at the start of a request.
#[derive(Debug)]
pub struct SessionState {
    pub session: Session,
    pub attempts: Vec<Attempt>,
    pub merges: Vec<MergeRule>,
    pub votes: Vec<VoteOption>,
    pub attendance: Vec<AttendanceRecord>,
}

impl SessionState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            attempts: Vec::new(),
            merges: Vec::new(),
            votes: Vec::new(),
            attendance: Vec::new(),
        }
    }
}

/// Registry of live sessions. The per-session mutex is the transactional
/// boundary: a command locks, validates, then mutates, so either all of its
/// derived writes land or none do, and commands against the same session
/// are serialized while unrelated sessions never contend.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, state: SessionState) -> Result<(), QuizError> {
        let id = state.session.id.clone();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(QuizError::Storage(format!(
                "session {} already exists",
                id
            )));
        }
        sessions.insert(id, Arc::new(Mutex::new(state)));
        Ok(())
    }

    pub async fn get(&self, session_id: &str) -> Result<Arc<Mutex<SessionState>>, QuizError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| QuizError::not_found(format!("session {} not found", session_id)))
    }

    pub async fn open_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        let mut count = 0;
        for state in sessions.values() {
            if state.lock().await.session.open {
                count += 1;
            }
        }
        count
    }
}
