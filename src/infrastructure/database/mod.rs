//! SQLite persistence for conversation state, bot staff and known chats

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::application::errors::StorageError;
use crate::domain::entities::{ChatId, ChatKind, UserId};
use crate::domain::traits::{AdminRecord, AdminRoster, ChatInventory, ChatRecord, StorageBackend};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let db = Self { conn: Mutex::new(conn) };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS hashes (
                key TEXT NOT NULL,
                field TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (key, field)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS admins (
                user_id INTEGER PRIMARY KEY,
                promoted_by INTEGER,
                promoted_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chats (
                chat_id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL,
                discovered_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute("CREATE INDEX IF NOT EXISTS idx_admins_promoted_by ON admins(promoted_by)", [])?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("timestamp '{}': {}", raw, e)))
}

impl StorageBackend for Database {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let result = conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get::<_, String>(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    fn delete_key(&self, key: &str) -> Result<(), StorageError> {
        self.conn()?.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn get_hash(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT field, value FROM hashes WHERE key = ?1")?;
        let rows = stmt.query_map([key], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut hash = HashMap::new();
        for row in rows {
            let (field, value) = row?;
            hash.insert(field, value);
        }
        Ok(hash)
    }

    fn set_hash(&self, key: &str, value: &HashMap<String, String>) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM hashes WHERE key = ?1", [key])?;
        for (field, v) in value {
            tx.execute(
                "INSERT INTO hashes (key, field, value) VALUES (?1, ?2, ?3)",
                [key, field.as_str(), v.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_hash(&self, key: &str) -> Result<(), StorageError> {
        self.conn()?.execute("DELETE FROM hashes WHERE key = ?1", [key])?;
        Ok(())
    }
}

impl AdminRoster for Database {
    fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM admins WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn get_admin(&self, user_id: UserId) -> Result<Option<AdminRecord>, StorageError> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT promoted_by, promoted_at FROM admins WHERE user_id = ?1",
            [user_id],
            |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, String>(1)?)),
        );
        match result {
            Ok((promoted_by, promoted_at)) => Ok(Some(AdminRecord {
                user_id,
                promoted_by,
                promoted_at: parse_time(&promoted_at)?,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn add_admin(&self, record: &AdminRecord) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO admins (user_id, promoted_by, promoted_at) VALUES (?1, ?2, ?3)",
            params![record.user_id, record.promoted_by, record.promoted_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        let rows = self.conn()?.execute("DELETE FROM admins WHERE user_id = ?1", [user_id])?;
        Ok(rows > 0)
    }

    fn transfer_promotions(&self, from: UserId, to: UserId) -> Result<usize, StorageError> {
        let rows = self.conn()?.execute(
            "UPDATE admins SET promoted_by = ?2 WHERE promoted_by = ?1",
            [from, to],
        )?;
        Ok(rows)
    }
}

impl ChatInventory for Database {
    fn get_chat(&self, chat_id: ChatId) -> Result<Option<ChatRecord>, StorageError> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT kind, discovered_at FROM chats WHERE chat_id = ?1",
            [chat_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        );
        match result {
            Ok((kind, discovered_at)) => Ok(Some(ChatRecord {
                chat_id,
                kind: ChatKind::parse(&kind),
                discovered_at: parse_time(&discovered_at)?,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn record_chat(&self, record: &ChatRecord) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT OR IGNORE INTO chats (chat_id, kind, discovered_at) VALUES (?1, ?2, ?3)",
            params![record.chat_id, record.kind.as_str(), record.discovered_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_chat(&self, chat_id: ChatId) -> Result<bool, StorageError> {
        let rows = self.conn()?.execute("DELETE FROM chats WHERE chat_id = ?1", [chat_id])?;
        Ok(rows > 0)
    }

    fn migrate_chat(&self, from: ChatId, to: ChatId) -> Result<bool, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let copied = tx.execute(
            "INSERT OR REPLACE INTO chats (chat_id, kind, discovered_at)
             SELECT ?2, kind, discovered_at FROM chats WHERE chat_id = ?1",
            [from, to],
        )?;
        if copied == 0 {
            return Ok(false);
        }
        tx.execute("DELETE FROM chats WHERE chat_id = ?1", [from])?;
        tx.commit()?;
        Ok(true)
    }
}
