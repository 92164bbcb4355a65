use crate::application::errors::BotError;
use crate::domain::entities::{ChatId, MessageId, UserId};

/// Messenger trait - outbound capability of a messaging platform adapter.
///
/// Calls block until the platform answers. Callers inside the dispatch chain
/// treat failures as "nothing happened" and log them.
pub trait Messenger: Send + Sync {
    /// Send a text message, optionally as a reply, returning the sent message id
    fn send_text(&self, chat_id: ChatId, text: &str, reply_to: Option<MessageId>) -> Result<MessageId, BotError>;

    /// Look up a user's membership status in a chat
    fn member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus, BotError>;

    /// Replace the command menu shown by the platform
    fn set_commands(&self, commands: &[BotCommand]) -> Result<(), BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Membership status of a user within a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "creator" => Some(MemberStatus::Creator),
            "administrator" => Some(MemberStatus::Administrator),
            "member" => Some(MemberStatus::Member),
            "restricted" => Some(MemberStatus::Restricted),
            "left" => Some(MemberStatus::Left),
            "kicked" => Some(MemberStatus::Kicked),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, MemberStatus::Creator | MemberStatus::Administrator)
    }
}

/// Entry of the platform command menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: UserId,
    pub name: String,
    pub username: String,
}
