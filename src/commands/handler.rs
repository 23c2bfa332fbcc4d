//! Command handler implementation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{BotCommand, CommandResult};
use crate::punish::{PunishmentKind, Punisher};
use crate::scheduler::SchedulerState;
use crate::storage::{Intern, InternStore, StorageError};
use crate::telegram::{ChatTransport, Message};

/// Executes admin commands against the roster.
pub struct CommandHandler {
    /// The bot's `@handle`; commands must start with it.
    handle: String,

    roster: Arc<dyn InternStore>,
    punisher: Arc<Punisher>,
    transport: Arc<dyn ChatTransport>,

    /// Shared scheduler state, for `status`.
    scheduler_state: Arc<RwLock<SchedulerState>>,

    /// Lives given to interns added with `add`.
    initial_lives: i32,
}

impl CommandHandler {
    #[must_use]
    pub fn new(
        handle: String,
        roster: Arc<dyn InternStore>,
        punisher: Arc<Punisher>,
        transport: Arc<dyn ChatTransport>,
        scheduler_state: Arc<RwLock<SchedulerState>>,
        initial_lives: i32,
    ) -> Self {
        Self {
            handle,
            roster,
            punisher,
            transport,
            scheduler_state,
            initial_lives,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `None` if the message is not a command. Commands from users
    /// who are not administrators of the source chat are refused.
    pub async fn try_handle(&self, message: &Message) -> Option<CommandResult> {
        let command = BotCommand::parse(message.text(), &self.handle)?;

        if let Err(refusal) = self.authorize(message).await {
            return Some(refusal);
        }

        debug!("Handling command: {}", command);
        let result = self.execute(command).await;
        info!(
            "Command result: success={}, trigger_sweep={}",
            result.success, result.trigger_sweep
        );

        Some(result)
    }

    async fn authorize(&self, message: &Message) -> Result<(), CommandResult> {
        let Some(sender) = &message.from else {
            return Err(CommandResult::error("Не могу определить, кто отправил команду"));
        };

        let admins = match self.transport.chat_administrators(message.chat.id).await {
            Ok(admins) => admins,
            Err(e) => {
                warn!("Failed to fetch administrators of {}: {}", message.chat.id, e);
                return Err(CommandResult::error("Не удалось проверить права администратора"));
            }
        };

        if admins.iter().any(|admin| admin.id == sender.id) {
            Ok(())
        } else {
            info!(
                "Refused command from non-admin {}",
                sender.username.as_deref().unwrap_or("<no username>")
            );
            Err(CommandResult::error("Команды доступны только администраторам чата"))
        }
    }

    /// Executes a parsed command.
    async fn execute(&self, command: BotCommand) -> CommandResult {
        match command {
            BotCommand::Add(username) => self.handle_add(&username).await,
            BotCommand::Remove(username) => self.handle_remove(&username).await,
            BotCommand::List => self.handle_list().await,
            BotCommand::Punish { username, kind } => self.handle_punish(&username, kind).await,
            BotCommand::Sweep => CommandResult::success_with_sweep("Запускаю проверку стендапов"),
            BotCommand::Status => self.handle_status().await,
            BotCommand::Help => self.handle_help(),
        }
    }

    async fn handle_add(&self, username: &str) -> CommandResult {
        match self.find_intern(username).await {
            Ok(Some(_)) => {
                return CommandResult::error(format!("@{username} уже в списке стажеров"));
            }
            Ok(None) => {}
            Err(result) => return result,
        }

        match self.roster.create_intern(username, self.initial_lives).await {
            Ok(intern) => {
                info!("Added intern {} with {} lives", intern.username, intern.lives);
                CommandResult::success(format!(
                    "{} добавлен в список стажеров, жизней: {}",
                    intern.mention(),
                    intern.lives
                ))
            }
            Err(e) => {
                warn!("Failed to add intern {}: {}", username, e);
                CommandResult::error(format!("Не удалось добавить @{username}"))
            }
        }
    }

    async fn handle_remove(&self, username: &str) -> CommandResult {
        let intern = match self.find_intern(username).await {
            Ok(Some(intern)) => intern,
            Ok(None) => return CommandResult::error(format!("@{username} нет в списке стажеров")),
            Err(result) => return result,
        };

        match self.roster.delete_intern(intern.id).await {
            Ok(()) => {
                info!("Removed intern {}", intern.username);
                CommandResult::success(format!("{} удален из списка стажеров", intern.mention()))
            }
            Err(e) => {
                warn!("Failed to remove intern {}: {}", username, e);
                CommandResult::error(format!("Не удалось удалить @{username}"))
            }
        }
    }

    async fn handle_list(&self) -> CommandResult {
        let interns = match self.roster.list_interns().await {
            Ok(interns) => interns,
            Err(e) => {
                warn!("Failed to list interns: {}", e);
                return CommandResult::error("Не удалось получить список стажеров");
            }
        };

        if interns.is_empty() {
            return CommandResult::success("Список стажеров пуст");
        }

        let mut lines = vec![format!("Стажеры ({}):", interns.len())];
        lines.extend(
            interns
                .iter()
                .map(|i| format!("{}, жизней: {}", i.mention(), i.lives)),
        );

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_punish(&self, username: &str, kind: PunishmentKind) -> CommandResult {
        let intern = match self.find_intern(username).await {
            Ok(Some(intern)) => intern,
            Ok(None) => return CommandResult::error(format!("@{username} нет в списке стажеров")),
            Err(result) => return result,
        };

        match self.punisher.apply(kind, &intern).await {
            Ok(record) => {
                info!("Manually punished {} with {}", intern.username, record.kind);
                CommandResult::success(format!("Наказание {} применено к {}", kind, intern.mention()))
            }
            Err(e) => {
                warn!("Manual punishment of {} failed: {}", intern.username, e);
                CommandResult::error(format!("Не удалось наказать {}", intern.mention()))
            }
        }
    }

    async fn handle_status(&self) -> CommandResult {
        let state = self.scheduler_state.read().await;

        let last = state
            .last_sweep_date()
            .map_or_else(|| "ещё не было".to_owned(), |d| d.format("%Y-%m-%d").to_string());

        CommandResult::success(format!(
            "Последняя плановая проверка: {last}\nПроверок с запуска: {}",
            state.sweeps_run
        ))
    }

    fn handle_help(&self) -> CommandResult {
        let mut lines = vec!["Команды:".to_owned()];
        for (usage, description) in BotCommand::all_commands() {
            lines.push(format!("{} {usage} - {description}", self.handle));
        }
        CommandResult::success(lines.join("\n"))
    }

    /// Looks an intern up by exact username.
    async fn find_intern(&self, username: &str) -> Result<Option<Intern>, CommandResult> {
        match self.roster.intern_by_username(username).await {
            Ok(intern) => Ok(Some(intern)),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => {
                warn!("Failed to look up intern {}: {}", username, e);
                Err(CommandResult::error(format!("Не удалось найти @{username}")))
            }
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("handle", &self.handle)
            .field("initial_lives", &self.initial_lives)
            .finish_non_exhaustive()
    }
}
