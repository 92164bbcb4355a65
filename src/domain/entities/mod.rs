//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;
pub mod conversation;

pub use user::{User, UserId};
pub use message::{Chat, ChatId, ChatKind, Message, MessageId, Update};
pub use conversation::InteractivityState;
pub use command::{Command, CommandAction, CommandConfig, CommandRegistry, Locality, Privilege};
