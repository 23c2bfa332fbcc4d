//! Configuration module for the punisher bot.
//!
//! Handles loading and validation of the environment settings, the
//! Telegram credentials and the standup recognition rules.

mod rules;
mod settings;

pub use rules::{ClassifierPolicy, DEFAULT_STANDUP_TAG, KeywordGroup, RulesError, StandupRules};
pub use settings::{BotSettings, ConfigError, TelegramConfig};
