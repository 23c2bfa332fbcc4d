//! Telegram Bot API integration.
//!
//! Provides the HTTP client, the Bot API object model, outgoing rate
//! limiting and the [`ChatTransport`] seam the rest of the bot talks to.

mod client;
mod rate_limiter;
mod transport;
mod types;

pub use client::{TelegramBot, TelegramError};
pub use rate_limiter::RateLimiter;
pub use transport::ChatTransport;
pub use types::{ApiResponse, Chat, ChatMember, Message, ResponseParameters, Update, User};
