use std::sync::Arc;

use crate::error::QuizError;
use crate::metrics::VOTES_CAST_TOTAL;
use crate::models::{Identity, SessionStatus, VoteResults, VoteTally};
use crate::services::session_service::student_count;
use crate::store::SessionStore;

pub struct VoteService {
    store: Arc<SessionStore>,
}

impl VoteService {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Cast a vote for one option. An identity gets exactly one vote per
    /// round, checked across every option so two tabs cannot split a vote
    /// between options.
    pub async fn cast_vote(
        &self,
        session_id: &str,
        identity: &Identity,
        option_id: &str,
    ) -> Result<(), QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        if state.session.status != SessionStatus::Voting {
            return Err(QuizError::invalid_transition("no vote round is open"));
        }
        let key = identity.key();
        let already_voted = state
            .votes
            .iter()
            .any(|option| option.voters.iter().any(|voter| *voter == key));
        if already_voted {
            VOTES_CAST_TOTAL.with_label_values(&["false"]).inc();
            return Err(QuizError::DuplicateVote);
        }
        let option = state
            .votes
            .iter_mut()
            .find(|option| option.id == option_id)
            .ok_or_else(|| QuizError::not_found(format!("no vote option {}", option_id)))?;
        option.final_count += 1;
        option.voters.push(key);
        VOTES_CAST_TOTAL.with_label_values(&["true"]).inc();
        tracing::debug!("Vote cast in session {} for {}", session_id, option_id);
        Ok(())
    }

    /// Current tallies. Safe to poll; also what the review screen shows
    /// after a vote round has ended.
    pub async fn results(&self, session_id: &str) -> Result<VoteResults, QuizError> {
        let handle = self.store.get(session_id).await?;
        let state = handle.lock().await;
        let slot = state
            .session
            .vote_slot
            .ok_or_else(|| QuizError::not_found("no vote round has been run"))?;
        Ok(VoteResults {
            slot,
            options: state
                .votes
                .iter()
                .map(|option| VoteTally {
                    id: option.id.clone(),
                    text: option.text.clone(),
                    initial_count: option.initial_count,
                    final_count: option.final_count,
                })
                .collect(),
            participant_count: student_count(&state),
        })
    }
}
