//! Long-polling loop that feeds updates to the [`UpdateHandler`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::UpdateHandler;
use crate::telegram::{TelegramBot, TelegramError, Update};

/// Back-off after a failed poll that carried no retry hint.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Where updates come from.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Returns updates with `update_id >= offset`, waiting for new ones.
    async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError>;
}

#[async_trait]
impl UpdateSource for TelegramBot {
    async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        self.get_updates(offset).await
    }
}

/// Owns the handler and the update offset.
pub struct UpdatePoller {
    source: Arc<dyn UpdateSource>,
    handler: UpdateHandler,
    offset: i64,
}

impl UpdatePoller {
    #[must_use]
    pub fn new(source: Arc<dyn UpdateSource>, handler: UpdateHandler) -> Self {
        Self {
            source,
            handler,
            offset: 0,
        }
    }

    /// Offset of the next update to fetch.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.offset
    }

    #[must_use]
    pub const fn handler(&self) -> &UpdateHandler {
        &self.handler
    }

    /// Polls until `shutdown` turns true or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Update poller started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let source = Arc::clone(&self.source);

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                result = source.fetch_updates(self.offset) => {
                    match result {
                        Ok(updates) => self.process(updates).await,
                        Err(e) => {
                            let backoff = match e {
                                TelegramError::FloodWait(seconds) => Duration::from_secs(u64::from(seconds)),
                                _ => ERROR_BACKOFF,
                            };
                            warn!("Failed to fetch updates: {}, retrying in {:?}", e, backoff);
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
            }
        }

        info!("Update poller stopped");
    }

    /// Handles a batch in order and advances the offset past it.
    pub async fn process(&mut self, updates: Vec<Update>) {
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            let id = update.update_id;
            let outcome = self.handler.handle_update(update).await;
            debug!("Update {} handled: {:?}", id, outcome);
        }
    }
}

impl std::fmt::Debug for UpdatePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatePoller")
            .field("offset", &self.offset)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use chrono::Utc;
    use tokio::sync::Mutex;

    use super::*;
    use crate::config::StandupRules;
    use crate::standup::StandupClassifier;
    use crate::storage::StandupStore;
    use crate::testing::{FixedClock, MemoryStore, RecordingTransport, text_message};

    /// Serves scripted batches, then flips the shutdown switch.
    struct ScriptedSource {
        batches: Mutex<VecDeque<Result<Vec<Update>, TelegramError>>>,
        offsets: Mutex<Vec<i64>>,
        shutdown: watch::Sender<bool>,
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
            self.offsets.lock().await.push(offset);
            match self.batches.lock().await.pop_front() {
                Some(batch) => batch,
                None => {
                    let _ = self.shutdown.send(true);
                    std::future::pending().await
                }
            }
        }
    }

    fn update(id: i64, text: &str) -> Update {
        Update {
            update_id: id,
            message: Some(text_message(id, -1, 42, "alice", text)),
            edited_message: None,
        }
    }

    fn handler(store: &Arc<MemoryStore>) -> UpdateHandler {
        UpdateHandler::new(
            StandupClassifier::new(StandupRules::default()),
            store.clone(),
            store.clone(),
            Arc::new(RecordingTransport::new()),
            Arc::new(FixedClock::new(Utc::now())),
        )
    }

    #[tokio::test]
    async fn test_offset_advances_past_batch() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(false);
        let source = Arc::new(ScriptedSource {
            batches: Mutex::new(VecDeque::from([
                Ok(vec![update(10, "#standup"), update(11, "hi")]),
                Ok(vec![update(12, "#standup again")]),
            ])),
            offsets: Mutex::new(Vec::new()),
            shutdown: tx,
        });

        let mut poller = UpdatePoller::new(source.clone(), handler(&store));
        poller.run(rx).await;

        assert_eq!(*source.offsets.lock().await, vec![0, 12, 13]);
        assert_eq!(poller.offset(), 13);
        assert_eq!(store.list_standups().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_error_retries_same_offset() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(false);
        let source = Arc::new(ScriptedSource {
            batches: Mutex::new(VecDeque::from([
                Err(TelegramError::FloodWait(0)),
                Ok(vec![update(5, "#standup")]),
            ])),
            offsets: Mutex::new(Vec::new()),
            shutdown: tx,
        });

        let mut poller = UpdatePoller::new(source.clone(), handler(&store));
        poller.run(rx).await;

        assert_eq!(*source.offsets.lock().await, vec![0, 0, 6]);
        assert_eq!(store.list_standups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stops_when_already_shut_down() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(true);
        let source = Arc::new(ScriptedSource {
            batches: Mutex::new(VecDeque::new()),
            offsets: Mutex::new(Vec::new()),
            shutdown: tx,
        });

        let mut poller = UpdatePoller::new(source.clone(), handler(&store));
        poller.run(rx).await;

        assert!(source.offsets.lock().await.is_empty());
    }
}
