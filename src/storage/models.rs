//! Row types for the roster and standup tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tracked intern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Intern {
    pub id: i64,

    /// Telegram username without the leading `@`. Case-sensitive.
    pub username: String,

    /// Remaining lives; never negative.
    pub lives: i32,

    /// Telegram user id, learned from the intern's own messages.
    pub chat_user_id: Option<i64>,
}

impl Intern {
    /// Returns `@username` as used in chat notifications.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("@{}", self.username)
    }
}

/// A submitted standup report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Standup {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
    pub username: String,
    pub comment: String,

    /// Chat the source message was posted in.
    pub chat_id: Option<i64>,

    /// Telegram message the standup came from. Unique only within `chat_id`.
    pub message_id: Option<i64>,
}

/// Data for inserting a standup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStandup {
    pub username: String,
    pub comment: String,
    pub chat_id: Option<i64>,
    pub message_id: Option<i64>,
    pub created: DateTime<Utc>,
}
