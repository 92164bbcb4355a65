//! Console adapter for development/testing
//!
//! Prints outbound messages to stdout and keeps a record of them, so the whole
//! dispatch chain can run without a platform connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use crate::application::errors::BotError;
use crate::domain::entities::{ChatId, MessageId, UserId};
use crate::domain::traits::{BotCommand, BotInfo, MemberStatus, Messenger};

/// A message sent through the console adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    echo: bool,
    record: bool,
    next_id: AtomicI64,
    sent: RwLock<Vec<SentMessage>>,
    members: RwLock<HashMap<(ChatId, UserId), MemberStatus>>,
    commands: RwLock<Vec<BotCommand>>,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: 0,
                name: "chatpipe".to_string(),
                username: "console".to_string(),
            },
            echo: true,
            record: true,
            next_id: AtomicI64::new(1000),
            sent: RwLock::new(Vec::new()),
            members: RwLock::new(HashMap::new()),
            commands: RwLock::new(Vec::new()),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.info.username = username.into();
        self
    }

    /// Record without printing
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Print without recording, for long interactive sessions
    pub fn without_history(mut self) -> Self {
        self.record = false;
        self
    }

    /// Membership answered by `member_status`; unknown pairs are `Member`
    pub fn with_member_status(self, chat_id: ChatId, user_id: UserId, status: MemberStatus) -> Self {
        if let Ok(mut members) = self.members.write() {
            members.insert((chat_id, user_id), status);
        }
        self
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn last_sent(&self) -> Option<SentMessage> {
        self.sent.read().ok().and_then(|sent| sent.last().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.write() {
            sent.clear();
        }
    }

    /// Last command menu published
    pub fn commands(&self) -> Vec<BotCommand> {
        self.commands.read().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger for ConsoleAdapter {
    fn send_text(&self, chat_id: ChatId, text: &str, reply_to: Option<MessageId>) -> Result<MessageId, BotError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if self.echo {
            match reply_to {
                Some(original) => println!("[BOT -> {} re {}] {}", chat_id, original, text),
                None => println!("[BOT -> {}] {}", chat_id, text),
            }
        }
        if self.record {
            self.sent
                .write()
                .map_err(|e| BotError::Internal(e.to_string()))?
                .push(SentMessage {
                    id,
                    chat_id,
                    text: text.to_string(),
                    reply_to,
                });
        }
        Ok(id)
    }

    fn member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus, BotError> {
        let members = self.members.read().map_err(|e| BotError::Internal(e.to_string()))?;
        Ok(members.get(&(chat_id, user_id)).copied().unwrap_or(MemberStatus::Member))
    }

    fn set_commands(&self, commands: &[BotCommand]) -> Result<(), BotError> {
        if self.echo {
            for command in commands {
                println!("  [Menu] /{} - {}", command.command, command.description);
            }
        }
        *self.commands.write().map_err(|e| BotError::Internal(e.to_string()))? = commands.to_vec();
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
    fn test_records_sent_messages() {
        let console = ConsoleAdapter::new().quiet();
        let first = console.send_text(1, "hello", None).unwrap();
        let second = console.send_text(1, "again", Some(first)).unwrap();

        assert_ne!(first, second);
        assert_eq!(console.sent_texts(), vec!["hello", "again"]);
        assert_eq!(console.last_sent().unwrap().reply_to, Some(first));

        console.clear();
        assert!(console.sent().is_empty());
    }

    #[test]
    fn test_without_history_keeps_nothing() {
        let console = ConsoleAdapter::new().quiet().without_history();
        let first = console.send_text(1, "hello", None).unwrap();
        let second = console.send_text(1, "again", None).unwrap();

        assert_ne!(first, second);
        assert!(console.sent().is_empty());
        assert_eq!(console.last_sent(), None);
    }

    #[test]
    fn test_member_status_table() {
        let console = ConsoleAdapter::new()
            .quiet()
            .with_member_status(-1, 7, MemberStatus::Administrator);
        assert_eq!(console.member_status(-1, 7).unwrap(), MemberStatus::Administrator);
        assert_eq!(console.member_status(-1, 8).unwrap(), MemberStatus::Member);
    }
}
