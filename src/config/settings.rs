//! Application settings and Telegram configuration.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveTime;
use chrono_tz::Tz;
use tracing::warn;

use super::ClassifierPolicy;
use crate::punish::{ExerciseRange, PunishmentPolicy};
use crate::storage::DEFAULT_LIVES;

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_PUNISH_TIME: &str = "10:00";
const DEFAULT_TIMEZONE: &str = "Asia/Bishkek";
const DEFAULT_STATE_FILE: &str = "punisher_state.json";

/// Telegram Bot API configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather.
    pub token: String,

    /// Base URL of the Bot API.
    pub api_url: String,

    /// Long-polling timeout for `getUpdates`, in seconds.
    pub poll_timeout_secs: u64,

    /// Minimum spacing between outgoing messages, in milliseconds.
    pub min_send_interval_ms: u64,
}

impl TelegramConfig {
    /// Creates a new Telegram configuration with default timings.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_url: DEFAULT_API_URL.to_owned(),
            poll_timeout_secs: 60,
            min_send_interval_ms: 300,
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TELEGRAM_TOKEN` to be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = required(&lookup, "BOT_TELEGRAM_TOKEN")?;
        let mut config = Self::new(token);

        if let Some(url) = lookup("BOT_TELEGRAM_API_URL") {
            config.api_url = url.trim_end_matches('/').to_owned();
        }
        config.poll_timeout_secs = parsed_or(&lookup, "BOT_POLL_TIMEOUT", config.poll_timeout_secs)?;
        config.min_send_interval_ms =
            parsed_or(&lookup, "BOT_MIN_SEND_INTERVAL_MS", config.min_send_interval_ms)?;

        Ok(config)
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// MySQL connection string.
    pub database_url: String,

    /// Local time of the daily sweep, in the reference zone.
    pub punish_time: NaiveTime,

    /// Chat the interns post their standups to.
    pub interns_chat_id: i64,

    /// Punishment applied to interns without a standup.
    pub punishment: PunishmentPolicy,

    /// Forward accepted standups to the mentors chat.
    pub notify_mentors: bool,

    pub mentors_chat_id: Option<i64>,

    /// Reference zone for "today".
    pub timezone: Tz,

    /// Admin commands must start with the bot's @handle.
    pub require_mention: bool,

    /// Overrides the policy from the rules file.
    pub standup_policy: Option<ClassifierPolicy>,

    /// Optional JSON rules file for the classifier.
    pub standup_rules_path: Option<PathBuf>,

    /// Lives given to interns added through the `add` command.
    pub initial_lives: i32,

    /// Range for push-up and sit-up counts.
    pub exercise_range: ExerciseRange,

    /// How many poetry links to try before giving up.
    pub poetry_attempts: u32,

    /// Where the scheduler remembers the date of its last sweep.
    pub state_path: PathBuf,
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates bot settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = required(&lookup, "BOT_DATABASE_URL")?;

        let interns_chat_id = required(&lookup, "BOT_INTERNS_CHAT_ID")?;
        let interns_chat_id = parse_value("BOT_INTERNS_CHAT_ID", &interns_chat_id)?;

        let punish_time = lookup("BOT_PUNISH_TIME").unwrap_or_else(|| DEFAULT_PUNISH_TIME.to_owned());
        let punish_time = NaiveTime::parse_from_str(punish_time.trim(), "%H:%M")
            .map_err(|_| ConfigError::InvalidPunishTime(punish_time.clone()))?;

        let punishment = match lookup("BOT_PUNISHMENT_TYPE") {
            Some(value) => PunishmentPolicy::from_str(&value).unwrap_or_else(|unknown| {
                warn!(
                    "Unknown punishment type '{}', falling back to {}",
                    unknown.0,
                    PunishmentPolicy::default()
                );
                PunishmentPolicy::default()
            }),
            None => PunishmentPolicy::default(),
        };

        let notify_mentors = match lookup("BOT_NOTIFY_MENTORS") {
            Some(value) => parse_bool("BOT_NOTIFY_MENTORS", &value)?,
            None => false,
        };

        let mentors_chat_id = lookup("BOT_MENTORS_CHAT")
            .map(|v| parse_value::<i64>("BOT_MENTORS_CHAT", &v))
            .transpose()?;
        if notify_mentors && mentors_chat_id.is_none() {
            return Err(ConfigError::MissingEnvVar("BOT_MENTORS_CHAT"));
        }

        let timezone = lookup("BOT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_owned());
        let timezone = timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(timezone.clone()))?;

        let require_mention = match lookup("BOT_REQUIRE_MENTION") {
            Some(value) => parse_bool("BOT_REQUIRE_MENTION", &value)?,
            None => true,
        };

        let standup_policy = lookup("BOT_STANDUP_POLICY")
            .map(|v| {
                v.parse::<ClassifierPolicy>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "BOT_STANDUP_POLICY",
                        value: v.clone(),
                    })
            })
            .transpose()?;

        let initial_lives = parsed_or(&lookup, "BOT_INITIAL_LIVES", DEFAULT_LIVES)?;
        if initial_lives < 1 {
            return Err(ConfigError::InvalidValue {
                key: "BOT_INITIAL_LIVES",
                value: initial_lives.to_string(),
            });
        }

        let defaults = ExerciseRange::default();
        let min = parsed_or(&lookup, "BOT_MIN_EXERCISES", defaults.min)?;
        let max = parsed_or(&lookup, "BOT_MAX_EXERCISES", defaults.max)?;
        let exercise_range =
            ExerciseRange::new(min, max).ok_or(ConfigError::EmptyExerciseRange { min, max })?;

        let poetry_attempts = parsed_or(&lookup, "BOT_POETRY_ATTEMPTS", 10u32)?.max(1);

        Ok(Self {
            database_url,
            punish_time,
            interns_chat_id,
            punishment,
            notify_mentors,
            mentors_chat_id,
            timezone,
            require_mention,
            standup_policy,
            standup_rules_path: lookup("BOT_STANDUP_RULES").map(PathBuf::from),
            initial_lives,
            exercise_range,
            poetry_attempts,
            state_path: lookup("BOT_STATE_FILE")
                .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from),
        })
    }

    /// Chat accepted standups are forwarded to, if enabled.
    #[must_use]
    pub fn mentors_destination(&self) -> Option<i64> {
        if self.notify_mentors {
            self.mentors_chat_id
        } else {
            None
        }
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnvVar(key))
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
    })
}

fn parsed_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    lookup(key).map_or(Ok(default), |v| parse_value(key, &v))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid punish time '{0}' (expected HH:MM)")]
    InvalidPunishTime(String),

    #[error("Unknown time zone: {0}")]
    InvalidTimezone(String),

    #[error("Exercise range is empty: min {min} must be below max {max}")]
    EmptyExerciseRange { min: u32, max: u32 },
}
