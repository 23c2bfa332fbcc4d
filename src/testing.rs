//! In-memory fakes for the store, transport, clock and link checker seams.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::punish::LinkChecker;
use crate::scheduler::Clock;
use crate::storage::{
    Intern, InternStore, NewStandup, Standup, StandupStore, StorageError, StoreResult,
};
use crate::telegram::{Chat, ChatTransport, Message, TelegramError, User};

fn injected_failure() -> StorageError {
    StorageError::Database(sqlx::Error::PoolTimedOut)
}

/// Both stores over vectors, with failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    interns: Mutex<Vec<Intern>>,
    standups: Mutex<Vec<Standup>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_lookups: StdMutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store trait calls so far. Helpers are not counted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `last_standup_for(username)` fail with a database error.
    pub fn fail_standup_lookups_for(&self, username: &str) {
        self.failing_lookups.lock().unwrap().insert(username.to_owned());
    }

    pub async fn add_intern(&self, username: &str, lives: i32) -> Intern {
        let intern = Intern {
            id: self.next_id(),
            username: username.to_owned(),
            lives,
            chat_user_id: None,
        };
        self.interns.lock().await.push(intern.clone());
        intern
    }

    pub async fn add_standup(&self, username: &str, comment: &str, created: DateTime<Utc>) -> Standup {
        let standup = Standup {
            id: self.next_id(),
            created,
            modified: None,
            username: username.to_owned(),
            comment: comment.to_owned(),
            chat_id: None,
            message_id: None,
        };
        self.standups.lock().await.push(standup.clone());
        standup
    }

    pub async fn intern_named(&self, username: &str) -> Option<Intern> {
        self.interns
            .lock()
            .await
            .iter()
            .find(|i| i.username == username)
            .cloned()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn read(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(injected_failure())
        } else {
            Ok(())
        }
    }

    fn write(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(injected_failure())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InternStore for MemoryStore {
    async fn create_intern(&self, username: &str, lives: i32) -> StoreResult<Intern> {
        self.write()?;
        let mut interns = self.interns.lock().await;
        if interns.iter().any(|i| i.username == username) {
            return Err(injected_failure());
        }
        let intern = Intern {
            id: self.next_id(),
            username: username.to_owned(),
            lives,
            chat_user_id: None,
        };
        interns.push(intern.clone());
        Ok(intern)
    }

    async fn select_intern(&self, id: i64) -> StoreResult<Intern> {
        self.read()?;
        self.interns
            .lock()
            .await
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn intern_by_username(&self, username: &str) -> StoreResult<Intern> {
        self.read()?;
        self.intern_named(username).await.ok_or(StorageError::NotFound)
    }

    async fn update_intern(&self, intern: &Intern) -> StoreResult<Intern> {
        self.write()?;
        let mut interns = self.interns.lock().await;
        let slot = interns
            .iter_mut()
            .find(|i| i.id == intern.id)
            .ok_or(StorageError::NotFound)?;
        *slot = intern.clone();
        Ok(intern.clone())
    }

    async fn delete_intern(&self, id: i64) -> StoreResult<()> {
        self.write()?;
        self.interns.lock().await.retain(|i| i.id != id);
        Ok(())
    }

    async fn list_interns(&self) -> StoreResult<Vec<Intern>> {
        self.read()?;
        Ok(self.interns.lock().await.clone())
    }
}

#[async_trait]
impl StandupStore for MemoryStore {
    async fn create_standup(&self, standup: NewStandup) -> StoreResult<Standup> {
        self.write()?;
        let standup = Standup {
            id: self.next_id(),
            created: standup.created,
            modified: None,
            username: standup.username,
            comment: standup.comment,
            chat_id: standup.chat_id,
            message_id: standup.message_id,
        };
        self.standups.lock().await.push(standup.clone());
        Ok(standup)
    }

    async fn update_standup(&self, standup: &Standup, at: DateTime<Utc>) -> StoreResult<Standup> {
        self.write()?;
        let mut standups = self.standups.lock().await;
        let slot = standups
            .iter_mut()
            .find(|s| s.id == standup.id)
            .ok_or(StorageError::NotFound)?;
        *slot = Standup {
            modified: Some(at),
            ..standup.clone()
        };
        Ok(slot.clone())
    }

    async fn select_standup(&self, id: i64) -> StoreResult<Standup> {
        self.read()?;
        self.standups
            .lock()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn standup_by_message(&self, chat_id: i64, message_id: i64) -> StoreResult<Standup> {
        self.read()?;
        self.standups
            .lock()
            .await
            .iter()
            .filter(|s| s.chat_id == Some(chat_id) && s.message_id == Some(message_id))
            .max_by_key(|s| s.id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn last_standup_for(&self, username: &str) -> StoreResult<Standup> {
        self.read()?;
        let failing = self.failing_lookups.lock().unwrap().contains(username);
        if failing {
            return Err(injected_failure());
        }
        self.standups
            .lock()
            .await
            .iter()
            .filter(|s| s.username == username)
            .max_by_key(|s| s.id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_standups(&self) -> StoreResult<Vec<Standup>> {
        self.read()?;
        Ok(self.standups.lock().await.clone())
    }

    async fn delete_standup(&self, id: i64) -> StoreResult<()> {
        self.write()?;
        self.standups.lock().await.retain(|s| s.id != id);
        Ok(())
    }
}

/// Records every outgoing call.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    admins: Vec<i64>,
    sent: Mutex<Vec<(i64, String)>>,
    forwarded: Mutex<Vec<(i64, i64, i64)>>,
    removed: Mutex<Vec<(i64, i64)>>,
    admin_lookups: Mutex<Vec<i64>>,
    next_message_id: AtomicI64,
    fail_sends: AtomicBool,
    fail_admin_lookups: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every chat reports these user ids as its administrators.
    pub fn with_admins(admins: &[i64]) -> Self {
        Self {
            admins: admins.to_vec(),
            ..Self::default()
        }
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_admin_lookups(&self, fail: bool) {
        self.fail_admin_lookups.store(fail, Ordering::SeqCst);
    }

    /// Successfully sent messages as `(chat, text)`.
    pub async fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }

    /// Forwards as `(to, from, message_id)`.
    pub async fn forwarded(&self) -> Vec<(i64, i64, i64)> {
        self.forwarded.lock().await.clone()
    }

    /// Removals as `(chat, user_id)`.
    pub async fn removed(&self) -> Vec<(i64, i64)> {
        self.removed.lock().await.clone()
    }

    /// Chats whose administrators were requested.
    pub async fn admin_lookups(&self) -> Vec<i64> {
        self.admin_lookups.lock().await.clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TelegramError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TelegramError::Connection("injected".to_owned()));
        }
        self.sent.lock().await.push((chat_id, text.to_owned()));
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn forward_message(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError> {
        self.forwarded
            .lock()
            .await
            .push((chat_id, from_chat_id, message_id));
        Ok(())
    }

    async fn chat_administrators(&self, chat_id: i64) -> Result<Vec<User>, TelegramError> {
        self.admin_lookups.lock().await.push(chat_id);
        if self.fail_admin_lookups.load(Ordering::SeqCst) {
            return Err(TelegramError::Connection("injected".to_owned()));
        }
        Ok(self.admins.iter().map(|&id| user(id, "admin")).collect())
    }

    async fn remove_member(&self, chat_id: i64, user_id: i64) -> Result<(), TelegramError> {
        self.removed.lock().await.push((chat_id, user_id));
        Ok(())
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Answers liveness checks from a script and records the links it saw.
#[derive(Debug)]
pub struct ScriptedLinkChecker {
    answers: Mutex<VecDeque<bool>>,
    fallback: bool,
    checked: Mutex<Vec<String>>,
}

impl ScriptedLinkChecker {
    pub fn always(live: bool) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            fallback: live,
            checked: Mutex::new(Vec::new()),
        }
    }

    /// Answers in order, then reports every further link as dead.
    pub fn sequence(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            fallback: false,
            checked: Mutex::new(Vec::new()),
        }
    }

    pub async fn checked(&self) -> Vec<String> {
        self.checked.lock().await.clone()
    }
}

#[async_trait]
impl LinkChecker for ScriptedLinkChecker {
    async fn is_live(&self, url: &str) -> bool {
        self.checked.lock().await.push(url.to_owned());
        self.answers.lock().await.pop_front().unwrap_or(self.fallback)
    }
}

pub fn user(id: i64, username: &str) -> User {
    User {
        id,
        is_bot: false,
        first_name: username.to_owned(),
        username: Some(username.to_owned()),
    }
}

/// A group text message.
pub fn text_message(message_id: i64, chat_id: i64, from: i64, username: &str, text: &str) -> Message {
    Message {
        message_id,
        from: Some(user(from, username)),
        chat: Chat {
            id: chat_id,
            kind: "supergroup".to_owned(),
            title: Some("Interns".to_owned()),
        },
        date: 1_709_521_200,
        edit_date: None,
        text: Some(text.to_owned()),
    }
}
