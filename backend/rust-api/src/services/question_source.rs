use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::QuizError;
use crate::models::{ImproviseSpec, QuestionDefinition, QuestionKind, RenderedQuestion};

/// The question-bank capability the core consumes. Question definitions,
/// rendering and scoring all live behind this trait; the core never
/// reimplements scoring, it only asks and counts. Async because a real
/// provider is typically a separate service.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn definition(&self, question_id: &str) -> Result<QuestionDefinition, QuizError>;

    /// Form manifest for pollers. Never leaks scoring data.
    async fn render(&self, question_id: &str) -> Result<RenderedQuestion, QuizError>;

    /// Whether a full response is correct for this question. Multi-choice
    /// demands set equality against the correct set; single-answer questions
    /// demand exact equality against the right-answer summary.
    async fn score(&self, question_id: &str, answer: &[String]) -> Result<bool, QuizError>;

    /// Register a pre-planned question definition.
    async fn insert(&self, definition: QuestionDefinition) -> Result<String, QuizError>;

    /// Create an improvised question; destroyed when its session closes.
    async fn create_ephemeral(&self, spec: &ImproviseSpec) -> Result<String, QuizError>;

    async fn destroy(&self, question_id: &str) -> Result<(), QuizError>;
}

/// Self-contained bank used by the service and its tests.
#[derive(Default)]
pub struct InMemoryQuestionBank {
    questions: RwLock<HashMap<String, QuestionDefinition>>,
}

impl InMemoryQuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, question_id: &str) -> Result<QuestionDefinition, QuizError> {
        let questions = self
            .questions
            .read()
            .map_err(|_| QuizError::Storage("question bank lock poisoned".to_string()))?;
        questions
            .get(question_id)
            .cloned()
            .ok_or_else(|| QuizError::not_found(format!("question {} not found", question_id)))
    }

    fn write(&self, definition: QuestionDefinition) -> Result<String, QuizError> {
        if let QuestionKind::MultiChoice = definition.kind {
            if definition.options.is_empty() {
                return Err(QuizError::bad_request(
                    "multi-choice question needs at least one option",
                ));
            }
        }
        let id = definition.id.clone();
        let mut questions = self
            .questions
            .write()
            .map_err(|_| QuizError::Storage("question bank lock poisoned".to_string()))?;
        questions.insert(id.clone(), definition);
        Ok(id)
    }
}

#[async_trait]
impl QuestionSource for InMemoryQuestionBank {
    async fn definition(&self, question_id: &str) -> Result<QuestionDefinition, QuizError> {
        self.read(question_id)
    }

    async fn render(&self, question_id: &str) -> Result<RenderedQuestion, QuizError> {
        let def = self.read(question_id)?;
        Ok(RenderedQuestion {
            question_id: def.id,
            name: def.name,
            kind: def.kind,
            text: def.text,
            options: def.options,
        })
    }

    async fn score(&self, question_id: &str, answer: &[String]) -> Result<bool, QuizError> {
        let def = self.read(question_id)?;
        if def.answers.is_empty() {
            // No correct response defined, e.g. an open improvised question.
            return Ok(false);
        }
        let correct = match def.kind {
            QuestionKind::MultiChoice => {
                let given: BTreeSet<&str> = answer.iter().map(|a| a.trim()).collect();
                let wanted: BTreeSet<&str> = def.answers.iter().map(|a| a.trim()).collect();
                given == wanted
            }
            QuestionKind::ShortAnswer | QuestionKind::TrueFalse => {
                answer.len() == 1 && answer[0].trim() == def.answers[0].trim()
            }
        };
        Ok(correct)
    }

    async fn insert(&self, definition: QuestionDefinition) -> Result<String, QuizError> {
        self.write(definition)
    }

    async fn create_ephemeral(&self, spec: &ImproviseSpec) -> Result<String, QuizError> {
        let options = match spec.kind {
            QuestionKind::TrueFalse if spec.options.is_empty() => {
                vec!["True".to_string(), "False".to_string()]
            }
            _ => spec.options.clone(),
        };
        self.write(QuestionDefinition {
            id: Uuid::new_v4().to_string(),
            name: spec.name.clone(),
            kind: spec.kind,
            text: spec.text.clone(),
            options,
            answers: spec.answers.clone(),
            ephemeral: true,
        })
    }

    async fn destroy(&self, question_id: &str) -> Result<(), QuizError> {
        let mut questions = self
            .questions
            .write()
            .map_err(|_| QuizError::Storage("question bank lock poisoned".to_string()))?;
        questions.remove(question_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multichoice(id: &str, answers: &[&str]) -> QuestionDefinition {
        QuestionDefinition {
            id: id.to_string(),
            name: id.to_string(),
            kind: QuestionKind::MultiChoice,
            text: String::new(),
            options: vec!["a".into(), "b".into(), "c".into()],
            answers: answers.iter().map(|s| s.to_string()).collect(),
            ephemeral: false,
        }
    }

    #[tokio::test]
    async fn multichoice_requires_full_set_equality() {
        let bank = InMemoryQuestionBank::new();
        bank.insert(multichoice("q", &["a", "b"])).await.unwrap();
        assert!(bank.score("q", &["b".into(), "a".into()]).await.unwrap());
        assert!(!bank.score("q", &["a".into()]).await.unwrap());
        assert!(!bank
            .score("q", &["a".into(), "b".into(), "c".into()])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn short_answer_is_exact_match_after_trim() {
        let bank = InMemoryQuestionBank::new();
        bank.insert(QuestionDefinition {
            id: "s".into(),
            name: "s".into(),
            kind: QuestionKind::ShortAnswer,
            text: String::new(),
            options: Vec::new(),
            answers: vec!["cat".into()],
            ephemeral: false,
        })
        .await
        .unwrap();
        assert!(bank.score("s", &[" cat ".into()]).await.unwrap());
        assert!(!bank.score("s", &["dog".into()]).await.unwrap());
    }

    #[tokio::test]
    async fn destroyed_questions_are_gone() {
        let bank = InMemoryQuestionBank::new();
        bank.insert(multichoice("q", &["a"])).await.unwrap();
        bank.destroy("q").await.unwrap();
        assert!(bank.definition("q").await.is_err());
    }
}
