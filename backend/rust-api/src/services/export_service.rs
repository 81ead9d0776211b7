use std::sync::Arc;

use crate::error::QuizError;
use crate::models::Identity;
use crate::services::question_source::QuestionSource;
use crate::services::session_service::{display_name, ensure_host};
use crate::store::SessionStore;

pub struct ExportService {
    store: Arc<SessionStore>,
    questions: Arc<dyn QuestionSource>,
}

impl ExportService {
    pub fn new(store: Arc<SessionStore>, questions: Arc<dyn QuestionSource>) -> Self {
        Self { store, questions }
    }

    /// Tab-separated export of every asked question and every non-preview
    /// attempt's raw (unmerged) responses. The `sep=` preamble tells
    /// spreadsheet software which delimiter the file uses.
    pub async fn export_csv(
        &self,
        session_id: &str,
        caller: &Identity,
    ) -> Result<(String, String), QuizError> {
        let handle = self.store.get(session_id).await?;
        let state = handle.lock().await;
        ensure_host(&state.session, caller)?;

        let mut columns = Vec::with_capacity(state.session.questions.len());
        for question in &state.session.questions {
            let definition = self.questions.definition(&question.question_id).await?;
            columns.push((
                question.slot,
                format!("{} ({})", definition.name, definition.kind.label()),
            ));
        }

        let mut body = String::from("sep=\t\r\n");
        body.push_str("Participant");
        for (_, heading) in &columns {
            body.push('\t');
            body.push_str(&escape_cell(heading));
        }
        body.push_str("\r\n");

        for attempt in &state.attempts {
            if attempt.is_preview() {
                continue;
            }
            body.push_str(&escape_cell(&display_name(
                state.session.anonymity,
                &attempt.identity,
            )));
            for (slot, _) in &columns {
                body.push('\t');
                if let Some(record) = attempt.responses.get(slot) {
                    if record.responded {
                        body.push_str(&escape_cell(&record.answer.join(", ")));
                    }
                }
            }
            body.push_str("\r\n");
        }

        let filename = format!(
            "session_{}_{}.csv",
            state.session.id,
            state.session.name.replace(char::is_whitespace, "_")
        );
        Ok((filename, body))
    }
}

fn escape_cell(value: &str) -> String {
    value
        .replace('\r', "")
        .replace('\n', " ")
        .replace('\t', "    ")
}

#[cfg(test)]
mod tests {
    use super::escape_cell;

    #[test]
    fn escape_cell_strips_delimiters() {
        assert_eq!(escape_cell("a\tb"), "a    b");
        assert_eq!(escape_cell("line\r\nbreak"), "line break");
        assert_eq!(escape_cell("plain"), "plain");
    }
}
