//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: In-memory key-value store
//! - Database: SQLite persistence
//! - Adapters: Platform integrations (Telegram, console)
//! - Runner: Update loops

pub mod adapters;
pub mod config;
pub mod database;
pub mod runner;
pub mod storage;
