use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::application::errors::StorageError;
use crate::domain::entities::{ChatId, ChatKind, UserId};

/// Key-value persistence with scalar and hash-shaped values.
///
/// Deleting a missing key is not an error. `set_hash` replaces the whole
/// hash stored under the key.
pub trait StorageBackend: Send + Sync {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete_key(&self, key: &str) -> Result<(), StorageError>;

    /// Empty map when nothing is stored under the key
    fn get_hash(&self, key: &str) -> Result<HashMap<String, String>, StorageError>;
    fn set_hash(&self, key: &str, value: &HashMap<String, String>) -> Result<(), StorageError>;
    fn delete_hash(&self, key: &str) -> Result<(), StorageError>;
}

/// A bot administrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecord {
    pub user_id: UserId,
    /// `None` for admins seeded by the owner outside of `/promote`
    pub promoted_by: Option<UserId>,
    pub promoted_at: DateTime<Utc>,
}

/// Persisted list of bot administrators
pub trait AdminRoster: Send + Sync {
    fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError>;
    fn get_admin(&self, user_id: UserId) -> Result<Option<AdminRecord>, StorageError>;
    fn add_admin(&self, record: &AdminRecord) -> Result<(), StorageError>;
    /// Returns whether an admin was removed
    fn remove_admin(&self, user_id: UserId) -> Result<bool, StorageError>;
    /// Re-parent every admin promoted by `from` to `to`, returning how many moved
    fn transfer_promotions(&self, from: UserId, to: UserId) -> Result<usize, StorageError>;
}

/// A chat the bot knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub chat_id: ChatId,
    pub kind: ChatKind,
    pub discovered_at: DateTime<Utc>,
}

/// Persisted inventory of the chats the bot is in
pub trait ChatInventory: Send + Sync {
    fn get_chat(&self, chat_id: ChatId) -> Result<Option<ChatRecord>, StorageError>;
    /// Insert the record unless the chat is already known
    fn record_chat(&self, record: &ChatRecord) -> Result<(), StorageError>;
    fn remove_chat(&self, chat_id: ChatId) -> Result<bool, StorageError>;
    /// Move a known chat to its new id; returns false when `from` is unknown
    fn migrate_chat(&self, from: ChatId, to: ChatId) -> Result<bool, StorageError>;
}
