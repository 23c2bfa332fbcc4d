//! Admin command handling.
//!
//! Commands are addressed to the bot by its `@handle` and are only accepted
//! from administrators of the chat they were sent in.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{BotCommand, CommandResult};
