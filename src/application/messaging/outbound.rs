//! Outbound text composition with silent delivery

use crate::domain::entities::{ChatId, Message, MessageId};
use crate::domain::traits::Messenger;

/// A text message to be sent through a [`Messenger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingText {
    pub chat_id: ChatId,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

impl OutgoingText {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to: None,
        }
    }

    /// Address the chat `message` came from; reply to it only in groups so
    /// private conversations don't fill up with reply threads.
    pub fn reply_to_in_group(message: &Message, text: impl Into<String>) -> Self {
        let reply_to = if message.is_private() { None } else { Some(message.id) };
        Self::new(message.chat_id(), text).with_reply_to(reply_to)
    }

    pub fn with_reply_to(mut self, reply_to: Option<MessageId>) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Send, logging failures. Returns the sent message id on success.
    pub fn send(&self, messenger: &dyn Messenger) -> Option<MessageId> {
        match messenger.send_text(self.chat_id, &self.text, self.reply_to) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("[{}] Failed to send message: {}", self.chat_id, e);
                None
            }
        }
    }
}
