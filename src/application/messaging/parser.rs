//! Command parser - Decodes command messages into structured requests

use std::fmt;

use crate::domain::entities::{Message, MessageId};

/// A command requested by a user, decoded from an inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// Command name, ex: `ping` for `/ping@MyBot data`
    pub name: String,
    /// Target bot username, ex: `MyBot` for `/ping@MyBot data`
    pub username: Option<String>,
    /// Text after the command token, trimmed; empty when absent
    pub parameters: String,
    /// The message the command came from
    pub origin: Message,
}

impl ParsedCommand {
    /// Parse a command message.
    ///
    /// Returns `None` for messages that are not commands. A reported token
    /// length that cuts the token short is extended to the next whitespace.
    pub fn parse(message: &Message) -> Option<Self> {
        if !message.is_command() {
            return None;
        }
        let text = message.text.as_deref()?;
        let reported = message.command_len?.min(text.len());

        let end = text
            .char_indices()
            .find(|(i, c)| *i >= reported && c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(text.len());

        let tag = &text[1..end];
        let (name, username) = match tag.split_once('@') {
            Some((name, username)) => (name, Some(username.to_string())),
            None => (tag, None),
        };

        Some(Self {
            name: name.to_string(),
            username,
            parameters: text[end..].trim().to_string(),
            origin: message.clone(),
        })
    }

    pub fn origin_message_id(&self) -> MessageId {
        self.origin.id
    }
}

impl fmt::Display for ParsedCommand {
    /// The command tag only, without parameters
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "/{}@{}", self.name, username),
            None => write!(f, "/{}", self.name),
        }
    }
}
