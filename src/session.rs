//! Question lifecycle state
//!
//! `Session` holds everything that changes while the quiz runs: whether the bot is
//! running, the open question and its answer window. It is owned by the engine task
//! and only mutated from there.

use serde::Serialize;
use tokio::task::AbortHandle;

use crate::question::{normalize_answer, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    Asked,
}

/// A pending answer-window timer.
///
/// The generation identifies which question armed the timer, so an expiry event
/// that was already queued when the window got cancelled can be recognized as stale.
#[derive(Debug)]
pub struct AnswerWindow {
    pub generation: u64,
    timer: Option<AbortHandle>,
}

impl AnswerWindow {
    pub fn new(generation: u64, timer: Option<AbortHandle>) -> Self {
        Self { generation, timer }
    }

    fn cancel(self) {
        if let Some(timer) = self.timer {
            tracing::debug!("Cancelling answer window {}", self.generation);
            timer.abort();
        }
    }
}

/// How a submitted answer was classified
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// Matched the open question, which is now resolved
    Correct(Question),
    Wrong,
    NoQuestion,
}

#[derive(Debug, Default)]
pub struct Session {
    running: bool,
    active_question: Option<Question>,
    answer_window: Option<AnswerWindow>,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.is_question_active() {
            Phase::Asked
        } else {
            Phase::Idle
        }
    }

    pub fn is_question_active(&self) -> bool {
        self.active_question.is_some()
    }

    pub fn active_question(&self) -> Option<&Question> {
        self.active_question.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Reserve the generation number for the next question
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Post a new question. A question that is still open is superseded and its
    /// answer window cancelled; it is returned to the caller.
    pub fn ask(&mut self, question: Question, window: Option<AnswerWindow>) -> Option<Question> {
        let superseded = self.resolve();
        self.active_question = Some(question);
        self.answer_window = window;
        superseded
    }

    /// Classify a normalized answer against the open question.
    ///
    /// A correct answer resolves the question in the same step, so any later
    /// submission sees no open question.
    pub fn submit(&mut self, normalized: &str) -> AnswerOutcome {
        if !self.is_question_active() {
            return AnswerOutcome::NoQuestion;
        }

        let accepted = self
            .active_question
            .as_ref()
            .is_some_and(|question| question.accepts(normalized));
        if !accepted {
            return AnswerOutcome::Wrong;
        }

        match self.resolve() {
            Some(question) => AnswerOutcome::Correct(question),
            None => AnswerOutcome::NoQuestion,
        }
    }

    /// Handle an answer-window expiry. Returns the timed-out question, or `None`
    /// if the window belonged to a question that was already resolved.
    pub fn expire(&mut self, generation: u64) -> Option<Question> {
        match &self.answer_window {
            Some(window) if window.generation == generation => {
                // The timer fired; nothing left to abort
                self.answer_window = None;
                self.active_question.take()
            }
            _ => {
                tracing::debug!("Ignoring stale answer window {}", generation);
                None
            }
        }
    }

    /// Clear the open question and cancel its answer window
    pub fn resolve(&mut self) -> Option<Question> {
        if let Some(window) = self.answer_window.take() {
            window.cancel();
        }
        self.active_question.take()
    }
}

/// Turn a raw chat line into a normalized answer.
///
/// Returns `None` if the line does not start with the answer prefix. The prefix
/// match is case-insensitive; whitespace anywhere in the answer is ignored.
pub fn normalize_submission(raw: &str, prefix: &str) -> Option<String> {
    let message = raw.trim_start().to_lowercase();
    let answer = message.strip_prefix(&prefix.trim().to_lowercase())?;
    Some(normalize_answer(answer))
}
