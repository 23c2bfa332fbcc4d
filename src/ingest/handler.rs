//! Turns inbound chat updates into standups and admin commands.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::commands::{CommandHandler, CommandResult};
use crate::scheduler::{Clock, SchedulerMessage};
use crate::standup::StandupClassifier;
use crate::storage::{InternStore, NewStandup, StandupStore, StorageError};
use crate::telegram::{ChatTransport, Message, Update};

/// The bare start command every new chat sends first.
const START_COMMAND: &str = "/start";

/// What happened to one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing to do: no message, `/start`, no sender username, or an edit
    /// by someone other than the standup author.
    Ignored,

    /// An admin command was executed or refused.
    Command { success: bool },

    /// A new standup was stored and acknowledged.
    StandupAccepted { standup_id: i64 },

    /// An edited message rewrote an existing standup.
    StandupUpdated { standup_id: i64 },

    /// The text does not qualify as a standup.
    NotStandup,

    /// Storing the standup failed.
    Failed,
}

/// Processes updates one at a time.
pub struct UpdateHandler {
    classifier: StandupClassifier,

    /// Present when admin commands are enabled.
    commands: Option<CommandHandler>,

    roster: Arc<dyn InternStore>,
    standups: Arc<dyn StandupStore>,
    transport: Arc<dyn ChatTransport>,
    clock: Arc<dyn Clock>,

    /// Where accepted standups are forwarded, if anywhere.
    mentors_chat_id: Option<i64>,

    scheduler_tx: Option<mpsc::Sender<SchedulerMessage>>,

    /// Id of the last acknowledgement this handler sent.
    last_ack_message_id: Option<i64>,
}

impl UpdateHandler {
    #[must_use]
    pub fn new(
        classifier: StandupClassifier,
        roster: Arc<dyn InternStore>,
        standups: Arc<dyn StandupStore>,
        transport: Arc<dyn ChatTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            classifier,
            commands: None,
            roster,
            standups,
            transport,
            clock,
            mentors_chat_id: None,
            scheduler_tx: None,
            last_ack_message_id: None,
        }
    }

    /// Enables `@handle`-prefixed admin commands.
    #[must_use]
    pub fn with_commands(mut self, commands: CommandHandler) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Forwards accepted standups to `chat_id`.
    #[must_use]
    pub const fn with_mentors_chat(mut self, chat_id: Option<i64>) -> Self {
        self.mentors_chat_id = chat_id;
        self
    }

    /// Lets the `sweep` command reach the scheduler.
    #[must_use]
    pub fn with_scheduler(mut self, tx: mpsc::Sender<SchedulerMessage>) -> Self {
        self.scheduler_tx = Some(tx);
        self
    }

    #[must_use]
    pub const fn last_ack_message_id(&self) -> Option<i64> {
        self.last_ack_message_id
    }

    /// Handles one update from the chat.
    pub async fn handle_update(&mut self, update: Update) -> UpdateOutcome {
        if let Some(message) = update.message {
            self.handle_message(&message).await
        } else if let Some(message) = update.edited_message {
            self.handle_edit(&message).await
        } else {
            debug!("Update {} carries no message", update.update_id);
            UpdateOutcome::Ignored
        }
    }

    async fn handle_message(&mut self, message: &Message) -> UpdateOutcome {
        let text = message.text();
        if text.is_empty() || text.trim() == START_COMMAND {
            return UpdateOutcome::Ignored;
        }

        if let Some(commands) = &self.commands
            && let Some(result) = commands.try_handle(message).await
        {
            return self.finish_command(message.chat.id, result).await;
        }

        self.learn_user_id(message).await;

        if !self.classifier.is_standup(text) {
            debug!("Message {} is not a standup", message.message_id);
            return UpdateOutcome::NotStandup;
        }

        let Some(username) = message.sender_username() else {
            warn!("Standup from a sender without a username, ignoring");
            return UpdateOutcome::Ignored;
        };

        match self.store_new(username, message).await {
            Some(standup_id) => UpdateOutcome::StandupAccepted { standup_id },
            None => UpdateOutcome::Failed,
        }
    }

    async fn handle_edit(&mut self, message: &Message) -> UpdateOutcome {
        let text = message.text();
        if !self.classifier.is_standup(text) {
            debug!("Edited message {} is not a standup", message.message_id);
            return UpdateOutcome::NotStandup;
        }

        let Some(username) = message.sender_username() else {
            return UpdateOutcome::Ignored;
        };

        match self
            .standups
            .standup_by_message(message.chat.id, message.message_id)
            .await
        {
            Ok(standup) if standup.username != username => {
                warn!(
                    "Edit of message {} by {} does not match standup {} of {}, ignoring",
                    message.message_id, username, standup.id, standup.username
                );
                UpdateOutcome::Ignored
            }
            Ok(mut standup) => {
                standup.comment = text.to_owned();
                match self.standups.update_standup(&standup, self.clock.now()).await {
                    Ok(updated) => {
                        info!("Standup {} of {} updated", updated.id, updated.username);
                        UpdateOutcome::StandupUpdated {
                            standup_id: updated.id,
                        }
                    }
                    Err(e) => {
                        error!("Failed to update standup {}: {}", standup.id, e);
                        UpdateOutcome::Failed
                    }
                }
            }
            Err(StorageError::NotFound) => {
                debug!("Edited message {} had no standup yet", message.message_id);
                match self.store_new(username, message).await {
                    Some(standup_id) => UpdateOutcome::StandupAccepted { standup_id },
                    None => UpdateOutcome::Failed,
                }
            }
            Err(e) => {
                error!("Failed to look up standup for message {}: {}", message.message_id, e);
                UpdateOutcome::Failed
            }
        }
    }

    /// Stores a new standup, acknowledges it and forwards it to the mentors.
    async fn store_new(&mut self, username: &str, message: &Message) -> Option<i64> {
        let new = NewStandup {
            username: username.to_owned(),
            comment: message.text().to_owned(),
            chat_id: Some(message.chat.id),
            message_id: Some(message.message_id),
            created: self.clock.now(),
        };

        let standup = match self.standups.create_standup(new).await {
            Ok(standup) => standup,
            Err(e) => {
                error!("Failed to save standup of {}: {}", username, e);
                return None;
            }
        };
        info!("Accepted standup {} from {}", standup.id, username);

        let ack = format!("@{username} спасибо. Я принял твой стендап");
        match self.transport.send_message(message.chat.id, &ack).await {
            Ok(id) => self.last_ack_message_id = Some(id),
            Err(e) => warn!("Failed to acknowledge standup of {}: {}", username, e),
        }

        if let Some(mentors) = self.mentors_chat_id
            && let Err(e) = self
                .transport
                .forward_message(mentors, message.chat.id, message.message_id)
                .await
        {
            warn!("Failed to forward standup of {} to mentors: {}", username, e);
        }

        Some(standup.id)
    }

    /// Records the Telegram id of roster members so they can be removed later.
    async fn learn_user_id(&self, message: &Message) {
        let Some(sender) = &message.from else {
            return;
        };
        let Some(username) = sender.username.as_deref() else {
            return;
        };

        let mut intern = match self.roster.intern_by_username(username).await {
            Ok(intern) => intern,
            Err(StorageError::NotFound) => return,
            Err(e) => {
                warn!("Failed to look up intern {}: {}", username, e);
                return;
            }
        };

        if intern.chat_user_id == Some(sender.id) {
            return;
        }

        intern.chat_user_id = Some(sender.id);
        match self.roster.update_intern(&intern).await {
            Ok(_) => debug!("Learned chat user id of {}", username),
            Err(e) => warn!("Failed to store chat user id of {}: {}", username, e),
        }
    }

    async fn finish_command(&self, chat_id: i64, result: CommandResult) -> UpdateOutcome {
        if result.trigger_sweep {
            match &self.scheduler_tx {
                Some(tx) => {
                    if let Err(e) = tx.send(SchedulerMessage::TriggerSweep).await {
                        warn!("Failed to trigger sweep: {}", e);
                    }
                }
                None => warn!("Sweep requested but no scheduler is attached"),
            }
        }

        if let Err(e) = self.transport.send_message(chat_id, &result.message).await {
            warn!("Failed to send command reply: {}", e);
        }

        UpdateOutcome::Command {
            success: result.success,
        }
    }
}

impl std::fmt::Debug for UpdateHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateHandler")
            .field("classifier", &self.classifier)
            .field("commands", &self.commands)
            .field("mentors_chat_id", &self.mentors_chat_id)
            .field("last_ack_message_id", &self.last_ack_message_id)
            .finish_non_exhaustive()
    }
}
