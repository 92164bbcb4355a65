//! chatpipe - handler pipes, command dispatching and persisted conversations
//! for chat bots.

pub mod application;
pub mod domain;
pub mod infrastructure;
