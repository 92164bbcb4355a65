//! Domain traits - Abstractions for infrastructure implementations

pub mod authority;
pub mod bot;
pub mod listener;
pub mod store;

pub use authority::PrivilegeAuthority;
pub use bot::{BotCommand, BotInfo, MemberStatus, Messenger};
pub use listener::InteractivityListener;
pub use store::{AdminRecord, AdminRoster, ChatInventory, ChatRecord, StorageBackend};
