use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::QuizError;
use crate::metrics::MERGES_TOTAL;
use crate::models::{
    Identity, KeywordWeight, MergeRule, QuestionResults, ResponseTallyRow, merge::apply_merges,
};
use crate::services::question_source::QuestionSource;
use crate::services::session_service::{ensure_host, ensure_open, student_count};
use crate::store::{SessionState, SessionStore};

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[\p{L}\p{N}']+").unwrap();
}

pub struct AggregatorService {
    store: Arc<SessionStore>,
    questions: Arc<dyn QuestionSource>,
}

impl AggregatorService {
    pub fn new(store: Arc<SessionStore>, questions: Arc<dyn QuestionSource>) -> Self {
        Self { store, questions }
    }

    /// Live tally for one slot. Merges rewrite the view at read time, so
    /// this is safe to call while submissions keep streaming in.
    pub async fn question_results(
        &self,
        session_id: &str,
        slot: u32,
    ) -> Result<QuestionResults, QuizError> {
        let handle = self.store.get(session_id).await?;
        let state = handle.lock().await;
        let question_id = session_question_id(&state, slot)?;
        let definition = self.questions.definition(&question_id).await?;

        let (respondents, merge_count) = canonical_responses(&state, slot);
        let mut correct_count = 0;
        for answer in &respondents {
            if self.questions.score(&question_id, answer).await? {
                correct_count += 1;
            }
        }

        let mut responses = Vec::new();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for answer in &respondents {
            for part in answer {
                responses.push(part.clone());
                *counts.entry(part.clone()).or_insert(0) += 1;
            }
        }
        let mut tally: Vec<ResponseTallyRow> = counts
            .into_iter()
            .map(|(response, count)| {
                let correct = definition.accepts_part(&response);
                ResponseTallyRow {
                    response,
                    count,
                    correct,
                }
            })
            .collect();
        tally.sort_by(|a, b| b.count.cmp(&a.count).then(a.response.cmp(&b.response)));

        Ok(QuestionResults {
            slot,
            question_id,
            responses,
            tally,
            responded: respondents.len() as u32,
            student_count: student_count(&state),
            merge_count,
            correct_count,
        })
    }

    /// Append a rewrite rule. Stored responses are never touched; the rule
    /// only changes what aggregation reads back from now on.
    pub async fn merge(
        &self,
        session_id: &str,
        caller: &Identity,
        slot: u32,
        from: String,
        into: String,
    ) -> Result<(), QuizError> {
        if from == into {
            return Err(QuizError::bad_request("cannot merge a response into itself"));
        }
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        ensure_open(&state.session)?;
        session_question_id(&state, slot)?;
        let ordinal = state.merges.iter().filter(|r| r.slot == slot).count() as u32;
        state.merges.push(MergeRule {
            slot,
            ordinal,
            original: from,
            merged: into,
        });
        MERGES_TOTAL.with_label_values(&["merge"]).inc();
        Ok(())
    }

    /// Pop the most recent rule for the slot. Idempotent: undoing with an
    /// empty log is a no-op, never an underflow.
    pub async fn undo_merge(
        &self,
        session_id: &str,
        caller: &Identity,
        slot: u32,
    ) -> Result<(), QuizError> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.lock().await;
        ensure_host(&state.session, caller)?;
        ensure_open(&state.session)?;
        session_question_id(&state, slot)?;
        let last = state
            .merges
            .iter()
            .enumerate()
            .filter(|(_, r)| r.slot == slot)
            .max_by_key(|(_, r)| r.ordinal)
            .map(|(i, _)| i);
        if let Some(index) = last {
            state.merges.remove(index);
            MERGES_TOTAL.with_label_values(&["undo"]).inc();
        }
        Ok(())
    }

    /// Frequency-based keyword extraction over the slot's canonical
    /// free-text responses, for a word-cloud style summary. Weights are
    /// scaled so the most frequent word is 100.
    pub async fn keywords(
        &self,
        session_id: &str,
        slot: u32,
        top_k: usize,
    ) -> Result<Vec<KeywordWeight>, QuizError> {
        let handle = self.store.get(session_id).await?;
        let state = handle.lock().await;
        session_question_id(&state, slot)?;
        let (respondents, _) = canonical_responses(&state, slot);

        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for answer in &respondents {
            for part in answer {
                for word in WORD_RE.find_iter(part) {
                    let word = word.as_str().to_lowercase();
                    *frequencies.entry(word).or_insert(0) += 1;
                }
            }
        }
        let mut ranked: Vec<(String, u32)> = frequencies.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(top_k);
        let max = ranked.first().map(|(_, count)| *count).unwrap_or(0);
        Ok(ranked
            .into_iter()
            .map(|(word, count)| KeywordWeight {
                word,
                weight: if max > 0 {
                    f64::from(count) / f64::from(max) * 100.0
                } else {
                    0.0
                },
            })
            .collect())
    }
}

fn session_question_id(state: &SessionState, slot: u32) -> Result<String, QuizError> {
    state
        .session
        .questions
        .iter()
        .find(|q| q.slot == slot)
        .map(|q| q.question_id.clone())
        .ok_or_else(|| QuizError::not_found(format!("no such slot {}", slot)))
}

/// Canonical (merge-rewritten) responses per respondent for a slot,
/// excluding the host's preview attempt, plus how many rules fired.
pub fn canonical_responses(state: &SessionState, slot: u32) -> (Vec<Vec<String>>, u32) {
    let mut respondents = Vec::new();
    let mut merge_count = 0;
    for attempt in &state.attempts {
        if attempt.is_preview() || !attempt.has_responded(slot) {
            continue;
        }
        let record = match attempt.responses.get(&slot) {
            Some(record) => record,
            None => continue,
        };
        let mut canonical = Vec::with_capacity(record.answer.len());
        for part in &record.answer {
            let (rewritten, fired) = apply_merges(&state.merges, slot, part.trim());
            merge_count += fired;
            canonical.push(rewritten);
        }
        respondents.push(canonical);
    }
    (respondents, merge_count)
}
