//! Telegram adapter
//!
//! Blocking Bot API client. Wire types mirror the JSON the API returns and
//! are converted into domain entities before anything else sees them.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::entities::{self, Chat, ChatId, ChatKind, MessageId, UserId};
use crate::domain::traits::{BotCommand, BotInfo, MemberStatus, Messenger};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Slack on top of the long-poll timeout before the HTTP request gives up
const HTTP_GRACE_SECONDS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: WireChat,
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    pub reply_to_message: Option<Box<Message>>,
    pub forward_from: Option<User>,
    #[serde(default)]
    pub new_chat_members: Vec<User>,
    pub left_chat_member: Option<User>,
    #[serde(default)]
    pub group_chat_created: bool,
    pub migrate_to_chat_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    /// UTF-16 code units
    pub offset: usize,
    /// UTF-16 code units
    pub length: usize,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct Me {
    id: i64,
    first_name: String,
    username: Option<String>,
}

/// Byte offset in `text` after `units` UTF-16 code units, clamped to the text
pub fn utf16_to_byte_len(text: &str, units: usize) -> usize {
    let mut seen = 0;
    for (index, c) in text.char_indices() {
        if seen >= units {
            return index;
        }
        seen += c.len_utf16();
    }
    text.len()
}

impl From<User> for entities::User {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_bot: user.is_bot,
        }
    }
}

impl From<WireChat> for Chat {
    fn from(chat: WireChat) -> Self {
        Self {
            id: chat.id,
            kind: ChatKind::parse(&chat.kind),
            title: chat.title,
        }
    }
}

impl From<Message> for entities::Message {
    fn from(message: Message) -> Self {
        let command_len = message.text.as_deref().and_then(|text| {
            message
                .entities
                .iter()
                .find(|e| e.kind == "bot_command" && e.offset == 0)
                .map(|e| utf16_to_byte_len(text, e.length))
        });

        let mut converted = entities::Message::new(message.message_id, message.chat.into());
        converted.sender = message.from.map(Into::into);
        converted.text = message.text;
        converted.command_len = command_len;
        converted.reply_to = message.reply_to_message.map(|m| Box::new((*m).into()));
        converted.forward_from = message.forward_from.map(Into::into);
        converted.new_chat_members = message.new_chat_members.into_iter().map(Into::into).collect();
        converted.left_chat_member = message.left_chat_member.map(Into::into);
        converted.group_chat_created = message.group_chat_created;
        converted.migrate_to_chat_id = message.migrate_to_chat_id;
        converted
    }
}

impl From<Update> for entities::Update {
    fn from(update: Update) -> Self {
        Self::new(update.update_id, update.message.map(Into::into))
    }
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: BotInfo,
}

impl TelegramAdapter {
    /// Build the adapter; `poll_timeout` bounds each `getUpdates` call.
    ///
    /// Must not be called from within an async context.
    pub fn new(token: impl Into<String>, poll_timeout: u64) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout + HTTP_GRACE_SECONDS))
            .build()
            .map_err(|e| BotError::Network(e.to_string()))?;

        Ok(Self {
            token: token.into(),
            client,
            info: BotInfo {
                id: 0,
                name: "chatpipe".to_string(),
                username: String::new(),
            },
        })
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T, BotError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .map_err(|e| BotError::Network(e.to_string()))?;

        let data: ApiResponse<T> = response.json().map_err(|e| BotError::Parse(e.to_string()))?;
        if !data.ok {
            return Err(BotError::Api(format!(
                "{}: {}",
                method,
                data.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        data.result
            .ok_or_else(|| BotError::Parse(format!("{}: response without result", method)))
    }

    /// Fetch bot info from Telegram API
    pub fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        let me: Me = self.call("getMe", &serde_json::json!({}))?;
        self.info = BotInfo {
            id: me.id,
            name: me.first_name,
            username: me.username.unwrap_or_default(),
        };
        Ok(())
    }

    /// Long-poll for updates starting at `offset`
    pub fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        self.call(
            "getUpdates",
            &serde_json::json!({
                "offset": offset,
                "timeout": timeout,
                "allowed_updates": ["message"],
            }),
        )
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update], current: i64) -> i64 {
        updates.iter().map(|u| u.update_id + 1).max().unwrap_or(current).max(current)
    }
}

impl Messenger for TelegramAdapter {
    fn send_text(&self, chat_id: ChatId, text: &str, reply_to: Option<MessageId>) -> Result<MessageId, BotError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(reply_to) = reply_to {
            body["reply_to_message_id"] = serde_json::json!(reply_to);
        }
        let sent: SentMessage = self.call("sendMessage", &body)?;
        Ok(sent.message_id)
    }

    fn member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus, BotError> {
        let member: ChatMember = self.call(
            "getChatMember",
            &serde_json::json!({
                "chat_id": chat_id,
                "user_id": user_id,
            }),
        )?;
        MemberStatus::parse(&member.status)
            .ok_or_else(|| BotError::Parse(format!("unknown member status '{}'", member.status)))
    }

    fn set_commands(&self, commands: &[BotCommand]) -> Result<(), BotError> {
        let commands: Vec<_> = commands
            .iter()
            .map(|c| serde_json::json!({ "command": c.command, "description": c.description }))
            .collect();
        let _: bool = self.call("setMyCommands", &serde_json::json!({ "commands": commands }))?;
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_to_byte_len() {
        assert_eq!(utf16_to_byte_len("/ping hello", 5), 5);
        // 'é' is 1 UTF-16 unit, 2 bytes
        assert_eq!(utf16_to_byte_len("/café x", 5), 6);
        // '😀' is 2 UTF-16 units, 4 bytes
        assert_eq!(utf16_to_byte_len("/😀 x", 3), 5);
        assert_eq!(utf16_to_byte_len("/x", 40), 2);
    }

    #[test]
    fn test_decode_command_update() {
        let json = r#"{
            "update_id": 900,
            "message": {
                "message_id": 12,
                "from": {"id": 5, "is_bot": false, "first_name": "Ana", "username": "ana"},
                "chat": {"id": -100, "type": "supergroup", "title": "Team"},
                "text": "/ping@MyBot hello",
                "entities": [{"type": "bot_command", "offset": 0, "length": 11}]
            }
        }"#;
        let update: entities::Update = serde_json::from_str::<Update>(json).unwrap().into();
        let message = update.message.unwrap();

        assert_eq!(update.id, 900);
        assert_eq!(message.chat.kind, ChatKind::Supergroup);
        assert_eq!(message.chat.title.as_deref(), Some("Team"));
        assert_eq!(message.sender_id(), Some(5));
        assert_eq!(message.command_len, Some(11));
        assert!(message.is_command());
    }

    #[test]
    fn test_decode_service_message() {
        let json = r#"{
            "update_id": 901,
            "message": {
                "message_id": 13,
                "chat": {"id": -1, "type": "group", "title": "Old"},
                "migrate_to_chat_id": -1001,
                "new_chat_members": [{"id": 77, "is_bot": true, "first_name": "Bot", "username": "MyBot"}]
            }
        }"#;
        let update: entities::Update = serde_json::from_str::<Update>(json).unwrap().into();
        let message = update.message.unwrap();

        assert_eq!(message.migrate_to_chat_id, Some(-1001));
        assert_eq!(message.command_len, None);
        assert!(message.new_chat_members[0].is_bot);
        assert!(!message.group_chat_created);
    }

    #[test]
    fn test_reply_is_converted() {
        let json = r#"{
            "message_id": 20,
            "chat": {"id": 3, "type": "private"},
            "text": "answer",
            "reply_to_message": {"message_id": 19, "chat": {"id": 3, "type": "private"}, "text": "question?"}
        }"#;
        let message: entities::Message = serde_json::from_str::<Message>(json).unwrap().into();
        assert!(message.is_reply_to(19));
        assert!(message.is_private());
    }

    #[test]
    fn test_next_offset() {
        let updates: Vec<Update> = serde_json::from_str(r#"[{"update_id": 4}, {"update_id": 9}]"#).unwrap();
        assert_eq!(TelegramAdapter::get_next_offset(&updates, 0), 10);
        assert_eq!(TelegramAdapter::get_next_offset(&[], 10), 10);
    }

    #[test]
    fn test_api_error_envelope() {
        let data: ApiResponse<bool> =
            serde_json::from_str(r#"{"ok": false, "description": "Forbidden: bot was blocked"}"#).unwrap();
        assert!(!data.ok);
        assert!(data.result.is_none());
    }
}
