//! Persistence for the intern roster and submitted standups.
//!
//! The rest of the bot only talks to the [`InternStore`] and
//! [`StandupStore`] traits; [`MySqlStorage`] is the production backend.

mod models;
mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use models::{Intern, NewStandup, Standup};
pub use mysql::{MySqlStorage, connect, run_migrations};

/// Default number of lives a freshly added intern starts with.
pub const DEFAULT_LIVES: i32 = 3;

/// Errors returned by the stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested row does not exist.
    #[error("Record not found")]
    NotFound,

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Database(other),
        }
    }
}

impl StorageError {
    /// Returns true for the "no such row" condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// Roster of tracked interns.
#[async_trait]
pub trait InternStore: Send + Sync {
    /// Adds an intern with the given number of lives.
    async fn create_intern(&self, username: &str, lives: i32) -> StoreResult<Intern>;

    /// Reads an intern by id.
    async fn select_intern(&self, id: i64) -> StoreResult<Intern>;

    /// Reads an intern by exact username.
    async fn intern_by_username(&self, username: &str) -> StoreResult<Intern>;

    /// Persists username, lives and chat user id of an existing intern.
    async fn update_intern(&self, intern: &Intern) -> StoreResult<Intern>;

    /// Removes an intern from the roster.
    async fn delete_intern(&self, id: i64) -> StoreResult<()>;

    /// Lists the whole roster in storage order.
    async fn list_interns(&self) -> StoreResult<Vec<Intern>>;
}

/// Log of submitted standups.
#[async_trait]
pub trait StandupStore: Send + Sync {
    async fn create_standup(&self, standup: NewStandup) -> StoreResult<Standup>;

    /// Rewrites the comment of an existing standup and stamps `modified`.
    async fn update_standup(&self, standup: &Standup, at: DateTime<Utc>) -> StoreResult<Standup>;

    async fn select_standup(&self, id: i64) -> StoreResult<Standup>;

    /// Finds the standup that was created from message `message_id` of `chat_id`.
    async fn standup_by_message(&self, chat_id: i64, message_id: i64) -> StoreResult<Standup>;

    /// Latest standup (highest id) submitted by `username`.
    async fn last_standup_for(&self, username: &str) -> StoreResult<Standup>;

    async fn list_standups(&self) -> StoreResult<Vec<Standup>>;

    async fn delete_standup(&self, id: i64) -> StoreResult<()>;
}
