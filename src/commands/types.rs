//! Command types and definitions.

use std::fmt;

use crate::punish::PunishmentKind;

/// Admin commands, written after the bot's handle:
/// `@punisher_bot add alice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Add an intern to the roster.
    Add(String),

    /// Remove an intern from the roster.
    Remove(String),

    /// Show the roster with remaining lives.
    List,

    /// Apply one punishment to an intern right away.
    Punish {
        username: String,
        kind: PunishmentKind,
    },

    /// Run the compliance sweep now.
    Sweep,

    /// Show when the last sweep ran.
    Status,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the text does not start with `handle` or the rest
    /// is not a valid command. The handle is matched case-insensitively.
    #[must_use]
    pub fn parse(text: &str, handle: &str) -> Option<Self> {
        let text = text.trim();

        let prefix = text.get(..handle.len())?;
        if handle.is_empty() || !prefix.eq_ignore_ascii_case(handle) {
            return None;
        }

        let rest = &text[handle.len()..];
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let mut parts = rest.split_whitespace();
        let cmd = parts.next()?.to_lowercase();

        match cmd.as_str() {
            "add" => parse_username(parts.next()?).map(Self::Add),
            "remove" | "rm" | "delete" => parse_username(parts.next()?).map(Self::Remove),
            "list" | "ls" => Some(Self::List),
            "punish" => {
                let username = parse_username(parts.next()?)?;
                let kind = parts.next()?.parse().ok()?;
                Some(Self::Punish { username, kind })
            }
            "sweep" | "check" => Some(Self::Sweep),
            "status" => Some(Self::Status),
            "help" | "?" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::List => "list",
            Self::Punish { .. } => "punish",
            Self::Sweep => "sweep",
            Self::Status => "status",
            Self::Help => "help",
        }
    }

    /// Usage lines for help: syntax and description.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("add <username>", "добавить стажера"),
            ("remove <username>", "удалить стажера"),
            ("list", "список стажеров и их жизни"),
            (
                "punish <username> <pushups|situps|removelives|poetry>",
                "наказать стажера вручную",
            ),
            ("sweep", "проверить стендапы прямо сейчас"),
            ("status", "когда была последняя проверка"),
            ("help", "эта справка"),
        ]
    }
}

/// Strips a leading `@`; usernames are otherwise taken verbatim.
fn parse_username(arg: &str) -> Option<String> {
    let username = arg.strip_prefix('@').unwrap_or(arg);
    if username.is_empty() {
        None
    } else {
        Some(username.to_owned())
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(username) => write!(f, "add {username}"),
            Self::Remove(username) => write!(f, "remove {username}"),
            Self::Punish { username, kind } => write!(f, "punish {username} {kind}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Reply for the chat the command came from.
    pub message: String,

    /// Whether to ask the scheduler for an immediate sweep.
    pub trigger_sweep: bool,
}

impl CommandResult {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            trigger_sweep: false,
        }
    }

    /// Creates a successful result that triggers a sweep.
    #[must_use]
    pub fn success_with_sweep(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            trigger_sweep: true,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            trigger_sweep: false,
        }
    }
}
