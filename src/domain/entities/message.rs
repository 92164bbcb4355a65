use super::{User, UserId};

pub type ChatId = i64;
pub type MessageId = i64;

/// Kind of chat a message was sent in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
    Unknown,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
            ChatKind::Unknown => "unknown",
        }
    }

    pub fn parse(kind: &str) -> Self {
        match kind {
            "private" => ChatKind::Private,
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            _ => ChatKind::Unknown,
        }
    }
}

/// A chat (conversation) on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
}

impl Chat {
    pub fn new(id: ChatId, kind: ChatKind) -> Self {
        Self { id, kind, title: None }
    }

    pub fn private(id: ChatId) -> Self {
        Self::new(id, ChatKind::Private)
    }

    pub fn group(id: ChatId) -> Self {
        Self::new(id, ChatKind::Group)
    }

    pub fn supergroup(id: ChatId) -> Self {
        Self::new(id, ChatKind::Supergroup)
    }

    /// A 1:1 chat between a user and the bot
    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }

    /// A group or a supergroup
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// An inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub chat: Chat,
    pub sender: Option<User>,
    pub text: Option<String>,
    /// Byte length of the leading command token (`/name@bot`), when the
    /// message starts with a bot command
    pub command_len: Option<usize>,
    pub reply_to: Option<Box<Message>>,
    pub forward_from: Option<User>,
    pub new_chat_members: Vec<User>,
    pub left_chat_member: Option<User>,
    pub group_chat_created: bool,
    pub migrate_to_chat_id: Option<ChatId>,
}

impl Message {
    pub fn new(id: MessageId, chat: Chat) -> Self {
        Self {
            id,
            chat,
            sender: None,
            text: None,
            command_len: None,
            reply_to: None,
            forward_from: None,
            new_chat_members: Vec::new(),
            left_chat_member: None,
            group_chat_created: false,
            migrate_to_chat_id: None,
        }
    }

    /// Build a text message, detecting a leading `/command` token the way the
    /// platform would mark it.
    pub fn from_text(id: MessageId, chat: Chat, text: impl Into<String>) -> Self {
        let text = text.into();
        let command_len = if text.starts_with('/') && text.len() > 1 {
            Some(text.find(char::is_whitespace).unwrap_or(text.len()))
        } else {
            None
        };
        let mut msg = Self::new(id, chat);
        msg.text = Some(text);
        msg.command_len = command_len;
        msg
    }

    pub fn with_sender(mut self, user: User) -> Self {
        self.sender = Some(user);
        self
    }

    pub fn with_reply_to(mut self, message: Message) -> Self {
        self.reply_to = Some(Box::new(message));
        self
    }

    pub fn with_forward_from(mut self, user: User) -> Self {
        self.forward_from = Some(user);
        self
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat.id
    }

    pub fn sender_id(&self) -> Option<UserId> {
        self.sender.as_ref().map(|u| u.id)
    }

    pub fn is_private(&self) -> bool {
        self.chat.is_private()
    }

    /// Text starts with a command token of known length
    pub fn is_command(&self) -> bool {
        match (&self.text, self.command_len) {
            (Some(text), Some(len)) => text.starts_with('/') && len > 1 && len <= text.len(),
            _ => false,
        }
    }

    pub fn reply_to_message_id(&self) -> Option<MessageId> {
        self.reply_to.as_ref().map(|m| m.id)
    }

    /// Whether this message replies to exactly `message_id`
    pub fn is_reply_to(&self, message_id: MessageId) -> bool {
        self.reply_to_message_id() == Some(message_id)
    }
}

/// Inbound unit delivered by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub id: i64,
    pub message: Option<Message>,
}

impl Update {
    pub fn new(id: i64, message: Option<Message>) -> Self {
        Self { id, message }
    }

    pub fn from_message(id: i64, message: Message) -> Self {
        Self::new(id, Some(message))
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.message.as_ref().map(Message::chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_marks_command_token() {
        let msg = Message::from_text(1, Chat::private(5), "/ping@MyBot hello");
        assert!(msg.is_command());
        assert_eq!(msg.command_len, Some(11));

        let msg = Message::from_text(2, Chat::private(5), "hello /ping");
        assert!(!msg.is_command());
        assert_eq!(msg.command_len, None);

        let msg = Message::from_text(3, Chat::private(5), "/");
        assert!(!msg.is_command());
    }

    #[test]
    fn test_reply_matching() {
        let prompt = Message::new(40, Chat::group(-1));
        let reply = Message::from_text(41, Chat::group(-1), "answer").with_reply_to(prompt);
        assert!(reply.is_reply_to(40));
        assert!(!reply.is_reply_to(39));
        assert!(!Message::new(42, Chat::group(-1)).is_reply_to(40));
    }

    #[test]
    fn test_chat_kinds() {
        assert!(Chat::private(1).is_private());
        assert!(Chat::group(-1).is_group());
        assert!(Chat::supergroup(-100).is_group());
        assert!(!Chat::new(-5, ChatKind::Channel).is_group());
        assert_eq!(ChatKind::parse("supergroup"), ChatKind::Supergroup);
        assert_eq!(ChatKind::parse("bogus"), ChatKind::Unknown);
    }
}
