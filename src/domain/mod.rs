//! Domain layer - Core types and capability traits
//!
//! This layer contains:
//! - Entities: Core business objects (Update, Message, User, Command)
//! - Traits: Abstractions for infrastructure (Messenger, StorageBackend,
//!   AdminRoster, ChatInventory, PrivilegeAuthority, InteractivityListener)

pub mod entities;
pub mod traits;
