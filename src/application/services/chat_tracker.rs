use std::sync::Arc;

use chrono::Utc;

use crate::application::errors::StorageError;
use crate::application::messaging::{Handler, ParsedCommand};
use crate::domain::entities::{ChatId, ChatKind, Message, Update, UserId};
use crate::domain::traits::{ChatInventory, ChatRecord};

/// Keeps the inventory of chats the bot is in up to date.
///
/// Observes every update and never consumes one.
pub struct ChatTracker {
    inventory: Arc<dyn ChatInventory>,
    bot_id: UserId,
}

impl ChatTracker {
    pub fn new(inventory: Arc<dyn ChatInventory>, bot_id: UserId) -> Self {
        Self { inventory, bot_id }
    }

    fn record(&self, chat_id: ChatId, kind: ChatKind) -> Result<(), StorageError> {
        self.inventory.record_chat(&ChatRecord {
            chat_id,
            kind,
            discovered_at: Utc::now(),
        })
    }

    fn track(&self, message: &Message) -> Result<(), StorageError> {
        let chat = &message.chat;

        if chat.is_private() {
            let started = ParsedCommand::parse(message).is_some_and(|c| c.name == "start");
            if started {
                tracing::debug!("[{}] Private chat started", chat.id);
                self.record(chat.id, chat.kind)?;
            }
            return Ok(());
        }

        let joined = message.new_chat_members.iter().any(|u| u.id == self.bot_id);
        if message.group_chat_created || joined {
            tracing::info!("[{}] Joined {} {}", chat.id, chat.kind.as_str(), chat.title.as_deref().unwrap_or(""));
            self.record(chat.id, chat.kind)?;
        }

        if message.left_chat_member.as_ref().is_some_and(|u| u.id == self.bot_id) {
            tracing::info!("[{}] Left chat", chat.id);
            self.inventory.remove_chat(chat.id)?;
        }

        if let Some(to) = message.migrate_to_chat_id {
            tracing::info!("[{}] Migrated to {}", chat.id, to);
            if !self.inventory.migrate_chat(chat.id, to)? {
                self.record(to, ChatKind::Supergroup)?;
            }
        }

        Ok(())
    }
}

impl Handler<Update> for ChatTracker {
    fn process(&self, update: &Update) -> bool {
        if let Some(message) = &update.message {
            if let Err(e) = self.track(message) {
                tracing::warn!("[{}] Failed to track chat: {}", message.chat_id(), e);
            }
        }
        false
    }
}
