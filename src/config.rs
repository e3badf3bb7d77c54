//! Bot configuration
//!
//! Quiz settings come from a JSON file (camelCase keys). Environment variables
//! (optionally via `.env`) locate that file and the other runtime resources.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, QuizError};
use crate::selector::cooldown_capacity;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCommands {
    pub personal_score: String,
    pub current_question: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCommands {
    pub all_scores: String,
    pub reset: String,
    pub start: String,
    pub stop: String,
}

/// Contents of `config.json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    pub channel_name: String,
    pub identity: Identity,
    /// Chat name allowed to run admin commands
    pub channel_admin: String,
    pub post_question_interval_in_seconds: i64,
    /// Zero or negative disables the answer window
    pub question_timeout_in_seconds: i64,
    pub question_cooldown_percent: f64,
    pub answer_prefix: String,
    #[serde(default)]
    pub react_to_wrong_answer: bool,
    #[serde(default)]
    pub react_to_no_question: bool,
    pub commands: UserCommands,
    pub admin_commands: AdminCommands,
}

impl BotConfig {
    pub fn from_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: origin.clone(),
            source,
        })?;
        let config = Self::from_json(&json, &origin)?;
        tracing::info!(
            channel = %config.channel_name,
            interval = config.post_question_interval_in_seconds,
            timeout = config.question_timeout_in_seconds,
            cooldown = config.question_cooldown_percent,
            "Loaded bot config from {}",
            origin
        );
        Ok(config)
    }

    /// Reject anything that would leave timing or selection undefined
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.channel_name.trim().is_empty() {
            return Err(QuizError::InvalidConfiguration(
                "channelName must not be empty".to_string(),
            ));
        }

        if self.post_question_interval_in_seconds <= 0
            || self.post_question_interval_in_seconds > u32::MAX as i64
        {
            return Err(QuizError::InvalidConfiguration(format!(
                "postQuestionIntervalInSeconds must be a positive number of seconds, got {}",
                self.post_question_interval_in_seconds
            )));
        }

        if !(0.0..1.0).contains(&self.question_cooldown_percent) {
            return Err(QuizError::InvalidConfiguration(format!(
                "questionCooldownPercent must be in [0, 1), got {}",
                self.question_cooldown_percent
            )));
        }

        Ok(())
    }

    /// Validate settings that depend on the size of the question pool
    pub fn validate_for_pool(&self, pool_size: usize) -> Result<(), QuizError> {
        cooldown_capacity(pool_size, self.question_cooldown_percent).map(|_| ())
    }

    pub fn interval_seconds(&self) -> u32 {
        self.post_question_interval_in_seconds.clamp(1, u32::MAX as i64) as u32
    }

    /// Length of the answer window, or `None` when questions never time out
    pub fn answer_timeout(&self) -> Option<Duration> {
        (self.question_timeout_in_seconds > 0)
            .then(|| Duration::from_secs(self.question_timeout_in_seconds as u64))
    }
}

/// Runtime resource locations, read from the environment
#[derive(Debug, Clone)]
pub struct RuntimeEnv {
    pub config_path: PathBuf,
    pub questions_path: PathBuf,
    pub lang_path: Option<PathBuf>,
    /// `None` keeps scores in memory only
    pub scores_path: Option<PathBuf>,
    pub token: Option<String>,
    pub token_file: PathBuf,
    pub irc_addr: String,
    /// `None` disables the admin HTTP API
    pub api_addr: Option<SocketAddr>,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl RuntimeEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_addr = match env_nonempty("QUIZBOT_API_ADDR") {
            Some(addr) => Some(addr.parse().map_err(|_| {
                QuizError::InvalidConfiguration(format!(
                    "QUIZBOT_API_ADDR is not a socket address: {}",
                    addr
                ))
            })?),
            None => None,
        };

        // "-" or "memory" keeps scores in memory
        let scores_path = match env_nonempty("QUIZBOT_SCORES").as_deref() {
            Some("-") | Some("memory") => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from("scores.json")),
        };

        Ok(Self {
            config_path: env_nonempty("QUIZBOT_CONFIG")
                .unwrap_or_else(|| "config/config.json".to_string())
                .into(),
            questions_path: env_nonempty("QUIZBOT_QUESTIONS")
                .unwrap_or_else(|| "config/questions.json".to_string())
                .into(),
            lang_path: env_nonempty("QUIZBOT_LANG").map(PathBuf::from),
            scores_path,
            token: env_nonempty("QUIZBOT_TOKEN"),
            token_file: env_nonempty("QUIZBOT_TOKEN_FILE")
                .unwrap_or_else(|| "token".to_string())
                .into(),
            irc_addr: env_nonempty("QUIZBOT_IRC_ADDR")
                .unwrap_or_else(|| "irc.chat.twitch.tv:6667".to_string()),
            api_addr,
        })
    }

    /// The chat password: `QUIZBOT_TOKEN` if set, else the token file contents
    pub fn load_token(&self) -> Result<String, ConfigError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let origin = self.token_file.display().to_string();
        let token = std::fs::read_to_string(&self.token_file).map_err(|source| ConfigError::Io {
            path: origin.clone(),
            source,
        })?;
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(QuizError::InvalidConfiguration(format!("Token file {} is empty", origin)).into());
        }
        Ok(token)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> BotConfig {
    BotConfig {
        channel_name: "quizchannel".to_string(),
        identity: Identity {
            username: "quizbot".to_string(),
        },
        channel_admin: "TheAdmin".to_string(),
        post_question_interval_in_seconds: 60,
        question_timeout_in_seconds: 5,
        question_cooldown_percent: 0.0,
        answer_prefix: "!a".to_string(),
        react_to_wrong_answer: false,
        react_to_no_question: false,
        commands: UserCommands {
            personal_score: "!Score".to_string(),
            current_question: "!question".to_string(),
        },
        admin_commands: AdminCommands {
            all_scores: "!all".to_string(),
            reset: "!reset".to_string(),
            start: "!start".to_string(),
            stop: "!stop".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SAMPLE: &str = r#"{
        "channelName": "quizchannel",
        "identity": { "username": "quizbot" },
        "channelAdmin": "admin",
        "postQuestionIntervalInSeconds": 60,
        "questionTimeoutInSeconds": 20,
        "questionCooldownPercent": 0.5,
        "answerPrefix": "!a",
        "reactToWrongAnswer": true,
        "commands": { "personalScore": "!score", "currentQuestion": "!question" },
        "adminCommands": { "allScores": "!all", "reset": "!reset", "start": "!start", "stop": "!stop" }
    }"#;

    fn with_field(key: &str, value: &str) -> String {
        let mut json: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        json[key] = serde_json::from_str(value).unwrap();
        json.to_string()
    }

    #[test]
    fn test_parse_sample() {
        let config = BotConfig::from_json(SAMPLE, "inline").unwrap();
        assert_eq!(config.channel_name, "quizchannel");
        assert_eq!(config.interval_seconds(), 60);
        assert_eq!(config.answer_timeout(), Some(Duration::from_secs(20)));
        assert!(config.react_to_wrong_answer);
        assert!(!config.react_to_no_question);
        assert_eq!(config.admin_commands.all_scores, "!all");
    }

    #[test]
    fn test_non_positive_timeout_disables_window() {
        let config =
            BotConfig::from_json(&with_field("questionTimeoutInSeconds", "0"), "inline").unwrap();
        assert_eq!(config.answer_timeout(), None);

        let config =
            BotConfig::from_json(&with_field("questionTimeoutInSeconds", "-5"), "inline").unwrap();
        assert_eq!(config.answer_timeout(), None);
    }

    #[test]
    fn test_non_positive_interval_is_fatal() {
        for value in ["0", "-10"] {
            let result = BotConfig::from_json(
                &with_field("postQuestionIntervalInSeconds", value),
                "inline",
            );
            assert!(matches!(
                result,
                Err(ConfigError::Invalid(QuizError::InvalidConfiguration(_)))
            ));
        }
    }

    #[test]
    fn test_cooldown_out_of_range_is_fatal() {
        for value in ["1.0", "-0.2", "3"] {
            let result =
                BotConfig::from_json(&with_field("questionCooldownPercent", value), "inline");
            assert!(result.is_err(), "cooldown {} should be rejected", value);
        }
    }

    #[test]
    fn test_validate_for_pool() {
        let config = BotConfig::from_json(SAMPLE, "inline").unwrap();
        assert!(config.validate_for_pool(10).is_ok());
        // 0.5 of 2 leaves a single eligible question
        assert!(config.validate_for_pool(2).is_err());
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let result = BotConfig::from_json(r#"{"channelName": "x"}"#, "config.json");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    #[serial]
    fn test_runtime_env_defaults() {
        for key in [
            "QUIZBOT_CONFIG",
            "QUIZBOT_QUESTIONS",
            "QUIZBOT_LANG",
            "QUIZBOT_SCORES",
            "QUIZBOT_TOKEN",
            "QUIZBOT_TOKEN_FILE",
            "QUIZBOT_IRC_ADDR",
            "QUIZBOT_API_ADDR",
        ] {
            std::env::remove_var(key);
        }

        let env = RuntimeEnv::from_env().unwrap();
        assert_eq!(env.config_path, PathBuf::from("config/config.json"));
        assert_eq!(env.scores_path, Some(PathBuf::from("scores.json")));
        assert_eq!(env.irc_addr, "irc.chat.twitch.tv:6667");
        assert!(env.api_addr.is_none());
        assert!(env.lang_path.is_none());
    }

    #[test]
    #[serial]
    fn test_runtime_env_overrides() {
        std::env::set_var("QUIZBOT_SCORES", "memory");
        std::env::set_var("QUIZBOT_API_ADDR", "127.0.0.1:6574");
        std::env::set_var("QUIZBOT_TOKEN", "  oauth:abc  ");

        let env = RuntimeEnv::from_env().unwrap();
        assert!(env.scores_path.is_none());
        assert_eq!(env.api_addr, Some("127.0.0.1:6574".parse().unwrap()));
        assert_eq!(env.load_token().unwrap(), "oauth:abc");

        std::env::set_var("QUIZBOT_API_ADDR", "not an address");
        assert!(RuntimeEnv::from_env().is_err());

        std::env::remove_var("QUIZBOT_SCORES");
        std::env::remove_var("QUIZBOT_API_ADDR");
        std::env::remove_var("QUIZBOT_TOKEN");
    }

    #[test]
    #[serial]
    fn test_token_file_is_trimmed() {
        std::env::remove_var("QUIZBOT_TOKEN");
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("token");
        std::fs::write(&token_file, "oauth:secret\n").unwrap();
        std::env::set_var("QUIZBOT_TOKEN_FILE", &token_file);

        let env = RuntimeEnv::from_env().unwrap();
        assert_eq!(env.load_token().unwrap(), "oauth:secret");

        std::env::remove_var("QUIZBOT_TOKEN_FILE");
    }
}
