//! MySQL implementation of the stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::{debug, info, instrument};

use super::{Intern, InternStore, NewStandup, Standup, StandupStore, StoreResult};

const MIGRATIONS: [&str; 2] = [
    include_str!("../../migrations/001_interns.sql"),
    include_str!("../../migrations/002_standup.sql"),
];

/// Opens a connection pool to the configured database.
pub async fn connect(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    info!("Connecting to database...");

    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    info!("Database connection established");
    Ok(pool)
}

/// Creates the bot tables if they do not exist yet.
pub async fn run_migrations(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        debug!("Running migration {}", i + 1);
        for statement in migration.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(pool).await?;
        }
    }

    info!("Migrations completed successfully");
    Ok(())
}

#[allow(clippy::cast_possible_wrap)]
const fn to_id(last_insert_id: u64) -> i64 {
    last_insert_id as i64
}

/// Stores backed by a MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlStorage {
    pool: MySqlPool,
}

impl MySqlStorage {
    #[must_use]
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl InternStore for MySqlStorage {
    #[instrument(skip(self))]
    async fn create_intern(&self, username: &str, lives: i32) -> StoreResult<Intern> {
        let result = sqlx::query("INSERT INTO `interns` (username, lives) VALUES (?, ?)")
            .bind(username)
            .bind(lives)
            .execute(&self.pool)
            .await?;

        Ok(Intern {
            id: to_id(result.last_insert_id()),
            username: username.to_owned(),
            lives,
            chat_user_id: None,
        })
    }

    #[instrument(skip(self))]
    async fn select_intern(&self, id: i64) -> StoreResult<Intern> {
        let intern = sqlx::query_as::<_, Intern>(
            "SELECT id, username, lives, chat_user_id FROM `interns` WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(intern)
    }

    #[instrument(skip(self))]
    async fn intern_by_username(&self, username: &str) -> StoreResult<Intern> {
        let intern = sqlx::query_as::<_, Intern>(
            "SELECT id, username, lives, chat_user_id FROM `interns` WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(intern)
    }

    #[instrument(skip(self), fields(id = intern.id))]
    async fn update_intern(&self, intern: &Intern) -> StoreResult<Intern> {
        sqlx::query("UPDATE `interns` SET username = ?, lives = ?, chat_user_id = ? WHERE id = ?")
            .bind(&intern.username)
            .bind(intern.lives)
            .bind(intern.chat_user_id)
            .bind(intern.id)
            .execute(&self.pool)
            .await?;

        self.select_intern(intern.id).await
    }

    #[instrument(skip(self))]
    async fn delete_intern(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM `interns` WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_interns(&self) -> StoreResult<Vec<Intern>> {
        let interns = sqlx::query_as::<_, Intern>(
            "SELECT id, username, lives, chat_user_id FROM `interns` ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(interns)
    }
}

const STANDUP_COLUMNS: &str = "id, created, modified, username, comment, chat_id, message_id";

#[async_trait]
impl StandupStore for MySqlStorage {
    #[instrument(skip(self, standup), fields(username = %standup.username))]
    async fn create_standup(&self, standup: NewStandup) -> StoreResult<Standup> {
        let result = sqlx::query(
            "INSERT INTO `standup` (created, modified, username, comment, chat_id, message_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(standup.created)
        .bind(standup.created)
        .bind(&standup.username)
        .bind(&standup.comment)
        .bind(standup.chat_id)
        .bind(standup.message_id)
        .execute(&self.pool)
        .await?;

        Ok(Standup {
            id: to_id(result.last_insert_id()),
            created: standup.created,
            modified: Some(standup.created),
            username: standup.username,
            comment: standup.comment,
            chat_id: standup.chat_id,
            message_id: standup.message_id,
        })
    }

    #[instrument(skip(self, standup), fields(id = standup.id))]
    async fn update_standup(&self, standup: &Standup, at: DateTime<Utc>) -> StoreResult<Standup> {
        sqlx::query("UPDATE `standup` SET modified = ?, username = ?, comment = ? WHERE id = ?")
            .bind(at)
            .bind(&standup.username)
            .bind(&standup.comment)
            .bind(standup.id)
            .execute(&self.pool)
            .await?;

        self.select_standup(standup.id).await
    }

    #[instrument(skip(self))]
    async fn select_standup(&self, id: i64) -> StoreResult<Standup> {
        let query = format!("SELECT {STANDUP_COLUMNS} FROM `standup` WHERE id = ?");
        let standup = sqlx::query_as::<_, Standup>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(standup)
    }

    #[instrument(skip(self))]
    async fn standup_by_message(&self, chat_id: i64, message_id: i64) -> StoreResult<Standup> {
        let query = format!(
            "SELECT {STANDUP_COLUMNS} FROM `standup` WHERE chat_id = ? AND message_id = ? ORDER BY id DESC LIMIT 1"
        );
        let standup = sqlx::query_as::<_, Standup>(&query)
            .bind(chat_id)
            .bind(message_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(standup)
    }

    #[instrument(skip(self))]
    async fn last_standup_for(&self, username: &str) -> StoreResult<Standup> {
        let query = format!(
            "SELECT {STANDUP_COLUMNS} FROM `standup` WHERE username = ? ORDER BY id DESC LIMIT 1"
        );
        let standup = sqlx::query_as::<_, Standup>(&query)
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(standup)
    }

    #[instrument(skip(self))]
    async fn list_standups(&self) -> StoreResult<Vec<Standup>> {
        let query = format!("SELECT {STANDUP_COLUMNS} FROM `standup`");
        let standups = sqlx::query_as::<_, Standup>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(standups)
    }

    #[instrument(skip(self))]
    async fn delete_standup(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM `standup` WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl From<MySqlPool> for MySqlStorage {
    fn from(pool: MySqlPool) -> Self {
        Self::new(pool)
    }
}
