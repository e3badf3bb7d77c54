//! Chat command recognition
//!
//! Commands are matched against the whole (lowercased, trimmed) chat line. Admin
//! commands are only honored for the configured channel admin.

use crate::config::BotConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PersonalScore,
    CurrentQuestion,
    AllScores,
    ResetScores,
    Start,
    Stop,
}

impl Command {
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Command::AllScores | Command::ResetScores | Command::Start | Command::Stop
        )
    }
}

/// Lowercased command keywords taken from the config
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<(String, Command)>,
    admin: String,
}

impl CommandTable {
    pub fn from_config(config: &BotConfig) -> Self {
        let entries = [
            (&config.admin_commands.all_scores, Command::AllScores),
            (&config.admin_commands.reset, Command::ResetScores),
            (&config.admin_commands.start, Command::Start),
            (&config.admin_commands.stop, Command::Stop),
            (&config.commands.personal_score, Command::PersonalScore),
            (&config.commands.current_question, Command::CurrentQuestion),
        ]
        .into_iter()
        .map(|(keyword, command)| (keyword.trim().to_lowercase(), command))
        .filter(|(keyword, _)| !keyword.is_empty())
        .collect();

        Self {
            entries,
            admin: config.channel_admin.trim().to_lowercase(),
        }
    }

    /// Match a chat line against the configured keywords
    pub fn parse(&self, message: &str) -> Option<Command> {
        let message = message.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| *keyword == message)
            .map(|(_, command)| *command)
    }

    pub fn is_admin(&self, user: &str) -> bool {
        !self.admin.is_empty() && self.admin == user.to_lowercase()
    }
}
