//! Question records and the question pool
//!
//! The pool is loaded once at startup from a JSON array of
//! `{ "question": "...", "answers": ["...", ...] }` entries.

use serde::Deserialize;
use std::path::Path;

use crate::error::{ConfigError, QuizError};

/// A single quiz question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub index: usize,
    pub prompt: String,
    /// Accepted answers as written in the pool file; the first is canonical
    pub accepted_answers: Vec<String>,
    /// Accepted answers in matching form (see [`normalize_answer`])
    normalized_answers: Vec<String>,
}

impl Question {
    pub fn new(index: usize, prompt: impl Into<String>, accepted_answers: Vec<String>) -> Self {
        let normalized_answers = accepted_answers
            .iter()
            .map(|answer| normalize_answer(answer))
            .collect();
        Self {
            index,
            prompt: prompt.into(),
            accepted_answers,
            normalized_answers,
        }
    }

    /// The answer shown to chat when the question times out
    pub fn canonical_answer(&self) -> &str {
        self.accepted_answers
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Check an already-normalized submission against the accepted answers
    pub fn accepts(&self, normalized: &str) -> bool {
        self.normalized_answers.iter().any(|a| a == normalized)
    }
}

/// Lowercase and drop every whitespace character
pub fn normalize_answer(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Deserialize)]
struct QuestionEntry {
    question: String,
    answers: Vec<String>,
}

/// Fixed, ordered question pool
#[derive(Debug, Clone)]
pub struct QuestionPool {
    questions: Vec<Question>,
}

impl QuestionPool {
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::InvalidConfiguration(
                "Question pool must not be empty".to_string(),
            ));
        }

        for question in &questions {
            if question.accepted_answers.is_empty() {
                return Err(QuizError::InvalidConfiguration(format!(
                    "Question {} (\"{}\") has no accepted answers",
                    question.index, question.prompt
                )));
            }
            if question.normalized_answers.iter().any(String::is_empty) {
                return Err(QuizError::InvalidConfiguration(format!(
                    "Question {} (\"{}\") has a blank answer",
                    question.index, question.prompt
                )));
            }
        }

        Ok(Self { questions })
    }

    pub fn from_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        let entries: Vec<QuestionEntry> =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?;

        let questions = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Question::new(index, entry.question, entry.answers))
            .collect();

        Ok(Self::new(questions)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: origin.clone(),
            source,
        })?;
        let pool = Self::from_json(&json, &origin)?;
        tracing::info!("Loaded {} questions from {}", pool.len(), origin);
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  New York "), "newyork");
        assert_eq!(normalize_answer("A\tB\nC"), "abc");
        assert_eq!(normalize_answer("BERLIN"), "berlin");
    }

    #[test]
    fn test_accepts_is_case_and_whitespace_insensitive() {
        let question = Question::new(
            0,
            "Largest city in the US?",
            vec!["New York".to_string(), "NYC".to_string()],
        );

        assert_eq!(question.canonical_answer(), "New York");
        assert!(question.accepts(&normalize_answer("new york")));
        assert!(question.accepts(&normalize_answer("NewYork")));
        assert!(question.accepts(&normalize_answer("nyc")));
        assert!(!question.accepts(&normalize_answer("new jersey")));
    }

    #[test]
    fn test_from_json_assigns_indices() {
        let json = r#"[
            {"question": "2+2?", "answers": ["4", "four"]},
            {"question": "Capital of France?", "answers": ["Paris"]}
        ]"#;

        let pool = QuestionPool::from_json(json, "inline").unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(1).unwrap().index, 1);
        assert_eq!(pool.get(1).unwrap().canonical_answer(), "Paris");
        assert!(pool.get(2).is_none());
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let result = QuestionPool::from_json("[]", "inline");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid(QuizError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn test_question_without_answers_is_rejected() {
        let json = r#"[{"question": "Who?", "answers": []}]"#;
        let result = QuestionPool::from_json(json, "inline");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no accepted answers"));
    }

    #[test]
    fn test_blank_answer_is_rejected() {
        let json = r#"[{"question": "Who?", "answers": ["  "]}]"#;
        assert!(QuestionPool::from_json(json, "inline").is_err());
    }

    #[test]
    fn test_malformed_json_reports_origin() {
        let err = QuestionPool::from_json("{nope", "questions.json").unwrap_err();
        assert!(err.to_string().contains("questions.json"));
    }
}
