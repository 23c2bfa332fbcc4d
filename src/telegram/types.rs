//! Bot API objects the bot reads and writes.
//!
//! Only the fields the bot uses are modelled; serde ignores the rest.

use serde::{Deserialize, Serialize};

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
    pub parameters: Option<ResponseParameters>,
}

/// Extra error details, e.g. how long to back off after a 429.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u32>,
    pub migrate_to_chat_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub date: i64,
    pub edit_date: Option<i64>,
    pub text: Option<String>,
}

impl Message {
    /// Text of the message, empty for media without a caption.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Username of the sender, if the sender has one.
    #[must_use]
    pub fn sender_username(&self) -> Option<&str> {
        self.from.as_ref().and_then(|u| u.username.as_deref())
    }
}

/// One entry of `getUpdates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
}

/// Entry of `getChatAdministrators`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub(crate) struct GetUpdatesParams<'a> {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageParams<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForwardMessageParams {
    pub chat_id: i64,
    pub from_chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatParams {
    pub chat_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMemberParams {
    pub chat_id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_if_banned: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NoParams {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_updates() {
        let json = r##"{
            "ok": true,
            "result": [
                {
                    "update_id": 10,
                    "message": {
                        "message_id": 5,
                        "from": {"id": 42, "is_bot": false, "first_name": "Alice", "username": "alice"},
                        "chat": {"id": -12345, "type": "supergroup", "title": "Interns"},
                        "date": 1522659723,
                        "text": "#standup done"
                    }
                },
                {
                    "update_id": 11,
                    "edited_message": {
                        "message_id": 5,
                        "from": {"id": 42, "is_bot": false, "first_name": "Alice"},
                        "chat": {"id": -12345, "type": "supergroup"},
                        "date": 1522659723,
                        "edit_date": 1522659800
                    }
                }
            ]
        }"##;

        let response: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(response.ok);
        let updates = response.result.unwrap();
        assert_eq!(updates.len(), 2);

        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.text(), "#standup done");
        assert_eq!(message.sender_username(), Some("alice"));
        assert_eq!(message.chat.kind, "supergroup");

        let edited = updates[1].edited_message.as_ref().unwrap();
        assert_eq!(edited.text(), "");
        assert_eq!(edited.sender_username(), None);
        assert_eq!(edited.edit_date, Some(1_522_659_800));
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 35",
            "parameters": {"retry_after": 35}
        }"#;

        let response: ApiResponse<Message> = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(429));
        assert_eq!(response.parameters.unwrap().retry_after, Some(35));
    }
}
