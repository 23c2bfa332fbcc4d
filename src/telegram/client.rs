//! Telegram Bot API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{
    ApiResponse, ChatMember, ChatMemberParams, ChatParams, ForwardMessageParams,
    GetUpdatesParams, Message, NoParams, SendMessageParams, Update, User,
};
use super::{ChatTransport, RateLimiter};
use crate::config::TelegramConfig;

/// Update kinds the bot subscribes to.
const ALLOWED_UPDATES: [&str; 2] = ["message", "edited_message"];

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(15);

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram API error {code}: {description}")]
    Api { code: i32, description: String },

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl<T> ApiResponse<T> {
    /// Turns the envelope into the payload or a typed error.
    pub fn into_result(self) -> Result<T, TelegramError> {
        if self.ok {
            return self
                .result
                .ok_or_else(|| TelegramError::InvalidResponse("ok response without result".to_owned()));
        }

        let description = self.description.unwrap_or_default();
        let code = self.error_code.unwrap_or_default();

        if code == 429 {
            let seconds = self
                .parameters
                .and_then(|p| p.retry_after)
                .or_else(|| extract_flood_wait_seconds(&description))
                .unwrap_or(1);
            return Err(TelegramError::FloodWait(seconds));
        }

        Err(TelegramError::Api { code, description })
    }
}

/// Extracts flood wait seconds from an error description.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let lower = err_msg.to_lowercase();
    let idx = lower.find("retry after ")?;
    let digits: String = lower[idx + "retry after ".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// High-level Bot API client.
pub struct TelegramBot {
    http: reqwest::Client,

    /// `{api_url}/bot{token}`.
    endpoint: String,

    poll_timeout_secs: u64,

    /// Spacing for outgoing messages.
    rate_limiter: RateLimiter,

    /// The bot's own account, from `getMe`.
    me: User,
}

impl TelegramBot {
    /// Builds the client and checks the token with `getMe`.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs) + HTTP_TIMEOUT_SLACK)
            .build()?;
        let endpoint = format!("{}/bot{}", config.api_url, config.token);

        let me: User = call(&http, &endpoint, "getMe", &NoParams {}).await?;
        info!(
            "Connected to Telegram as @{}",
            me.username.as_deref().unwrap_or("<no username>")
        );

        Ok(Self {
            http,
            endpoint,
            poll_timeout_secs: config.poll_timeout_secs,
            rate_limiter: RateLimiter::from_millis(config.min_send_interval_ms),
            me,
        })
    }

    /// The bot's own account.
    #[must_use]
    pub const fn me(&self) -> &User {
        &self.me
    }

    /// The `@handle` users address the bot with.
    #[must_use]
    pub fn handle(&self) -> Option<String> {
        self.me.username.as_ref().map(|u| format!("@{u}"))
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: &ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params).await
    }

    async fn call<P: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<T, TelegramError> {
        call(&self.http, &self.endpoint, method, params).await
    }

    /// Sends through the rate limiter, retrying once after a flood wait.
    async fn call_limited<P: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<T, TelegramError> {
        self.rate_limiter.acquire().await;
        match self.call(method, params).await {
            Err(TelegramError::FloodWait(seconds)) => {
                self.rate_limiter.handle_flood_wait(seconds).await;
                self.rate_limiter.acquire().await;
                self.call(method, params).await
            }
            other => other,
        }
    }
}

async fn call<P: Serialize + Sync, T: DeserializeOwned>(
    http: &reqwest::Client,
    endpoint: &str,
    method: &str,
    params: &P,
) -> Result<T, TelegramError> {
    debug!("Calling Bot API method {}", method);

    let response = http
        .post(format!("{endpoint}/{method}"))
        .json(params)
        .send()
        .await?;

    let envelope: ApiResponse<T> = response.json().await?;
    envelope.into_result()
}

#[async_trait]
impl ChatTransport for TelegramBot {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TelegramError> {
        let sent: Message = self
            .call_limited("sendMessage", &SendMessageParams { chat_id, text })
            .await?;
        Ok(sent.message_id)
    }

    async fn forward_message(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError> {
        let params = ForwardMessageParams {
            chat_id,
            from_chat_id,
            message_id,
        };
        let _: Message = self.call_limited("forwardMessage", &params).await?;
        Ok(())
    }

    async fn chat_administrators(&self, chat_id: i64) -> Result<Vec<User>, TelegramError> {
        let members: Vec<ChatMember> = self
            .call("getChatAdministrators", &ChatParams { chat_id })
            .await?;
        Ok(members.into_iter().map(|m| m.user).collect())
    }

    async fn remove_member(&self, chat_id: i64, user_id: i64) -> Result<(), TelegramError> {
        let ban = ChatMemberParams {
            chat_id,
            user_id,
            only_if_banned: None,
        };
        let _: bool = self.call("banChatMember", &ban).await?;

        // Lift the ban right away so removal works like a kick.
        let unban = ChatMemberParams {
            chat_id,
            user_id,
            only_if_banned: Some(true),
        };
        if let Err(e) = self.call::<_, bool>("unbanChatMember", &unban).await {
            warn!("User {} removed but could not be unbanned: {}", user_id, e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("me", &self.me.username)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::types::ResponseParameters;

    fn failed<T>(code: i32, description: &str, retry_after: Option<u32>) -> ApiResponse<T> {
        ApiResponse {
            ok: false,
            result: None,
            description: Some(description.to_owned()),
            error_code: Some(code),
            parameters: retry_after.map(|s| ResponseParameters {
                retry_after: Some(s),
                migrate_to_chat_id: None,
            }),
        }
    }

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("Too Many Requests: retry after 35"), Some(35));
        assert_eq!(extract_flood_wait_seconds("retry after 7 seconds"), Some(7));
        assert_eq!(extract_flood_wait_seconds("Bad Request: chat not found"), None);
    }

    #[test]
    fn test_into_result_ok() {
        let response = ApiResponse {
            ok: true,
            result: Some(true),
            description: None,
            error_code: None,
            parameters: None,
        };
        assert!(response.into_result().unwrap());
    }

    #[test]
    fn test_into_result_ok_without_result() {
        let response: ApiResponse<bool> = ApiResponse {
            ok: true,
            result: None,
            description: None,
            error_code: None,
            parameters: None,
        };
        assert!(matches!(
            response.into_result(),
            Err(TelegramError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_into_result_flood_wait() {
        let with_params = failed::<bool>(429, "Too Many Requests: retry after 35", Some(35));
        assert!(matches!(with_params.into_result(), Err(TelegramError::FloodWait(35))));

        let from_text = failed::<bool>(429, "Too Many Requests: retry after 12", None);
        assert!(matches!(from_text.into_result(), Err(TelegramError::FloodWait(12))));
    }

    #[test]
    fn test_into_result_api_error() {
        let response = failed::<bool>(400, "Bad Request: chat not found", None);
        match response.into_result() {
            Err(TelegramError::Api { code, description }) => {
                assert_eq!(code, 400);
                assert_eq!(description, "Bad Request: chat not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
