use std::sync::Arc;

use crate::config::Config;
use crate::services::question_source::{InMemoryQuestionBank, QuestionSource};
use crate::store::SessionStore;

pub struct AppState {
    pub config: Config,
    pub store: Arc<SessionStore>,
    pub questions: Arc<dyn QuestionSource>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(SessionStore::new()),
            questions: Arc::new(InMemoryQuestionBank::new()),
        }
    }

    /// Swap in a different question provider, e.g. one backed by an
    /// external question bank service.
    pub fn with_question_source(config: Config, questions: Arc<dyn QuestionSource>) -> Self {
        Self {
            config,
            store: Arc::new(SessionStore::new()),
            questions,
        }
    }
}

pub mod aggregator_service;
pub mod attempt_service;
pub mod export_service;
pub mod question_source;
pub mod session_service;
pub mod vote_service;
