//! Locale templates for chat messages
//!
//! Templates use `${name}` placeholders. Locales are JSON files with camelCase keys;
//! see `lang/english.json` and `lang/german.json`.

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    pub ask_question: String,
    pub question_timed_out: String,
    pub correct_answer: String,
    pub wrong_answer: String,
    pub no_question: String,
    pub command_score: String,
    pub command_reset: String,
    pub command_reset_nobody_has_points: String,
    #[serde(default = "default_bot_started")]
    pub bot_started: String,
    #[serde(default = "default_bot_stopped")]
    pub bot_stopped: String,
    #[serde(default)]
    pub units: DurationUnits,
}

/// Words used when rendering a number of seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationUnits {
    pub hour: String,
    pub hours: String,
    pub minute: String,
    pub minutes: String,
    pub second: String,
    pub seconds: String,
}

impl Default for DurationUnits {
    fn default() -> Self {
        Self {
            hour: "hour".to_string(),
            hours: "hours".to_string(),
            minute: "minute".to_string(),
            minutes: "minutes".to_string(),
            second: "second".to_string(),
            seconds: "seconds".to_string(),
        }
    }
}

fn default_bot_started() -> String {
    "Starting quiz bot. Question interval: ${interval}; next question in ${next}".to_string()
}

fn default_bot_stopped() -> String {
    "Stopping quiz bot. Will not react to anything but commands".to_string()
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            ask_question: "Quiz time! ${question} Answer with ${answerPrefix} <answer>. You have ${timeout}.".to_string(),
            question_timed_out: "Nobody knew the answer to \"${question}\". It was: ${answer}. Next question in ${newQuestionIn}.".to_string(),
            correct_answer: "${user} got it right! Next question in ${newQuestionIn}.".to_string(),
            wrong_answer: "Sorry ${user}, that is not correct.".to_string(),
            no_question: "${user}, there is no open question right now.".to_string(),
            command_score: "${user} has ${scoreNumber} points.".to_string(),
            command_reset: "All scores have been reset. Final standings:".to_string(),
            command_reset_nobody_has_points: "Nobody has any points yet.".to_string(),
            bot_started: default_bot_started(),
            bot_stopped: default_bot_stopped(),
            units: DurationUnits::default(),
        }
    }
}

impl Locale {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: origin.clone(),
            source,
        })?;
        let locale = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: origin.clone(),
            source,
        })?;
        tracing::info!("Loaded locale from {}", origin);
        Ok(locale)
    }

    /// Render a number of seconds as words, e.g. "1 minute 30 seconds"
    pub fn duration(&self, total_seconds: u64) -> String {
        format_duration(total_seconds, &self.units)
    }
}

/// Replace every `${key}` in `template` with its value
pub fn fill(template: &str, params: &[(&str, &str)]) -> String {
    let mut message = template.to_string();
    for (key, value) in params {
        message = message.replace(&format!("${{{}}}", key), value);
    }
    message
}

pub fn format_duration(total_seconds: u64, units: &DurationUnits) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(unit(hours, &units.hour, &units.hours));
    }
    if minutes > 0 {
        parts.push(unit(minutes, &units.minute, &units.minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(unit(seconds, &units.second, &units.seconds));
    }
    parts.join(" ")
}

fn unit(value: u64, singular: &str, plural: &str) -> String {
    if value == 1 {
        format!("{} {}", value, singular)
    } else {
        format!("{} {}", value, plural)
    }
}
