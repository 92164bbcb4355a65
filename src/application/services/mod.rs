//! Application services - Built-in commands, conversations and observers

pub mod chat_tracker;
pub mod default_commands;
pub mod feedback;

pub use chat_tracker::ChatTracker;
pub use feedback::{FeedbackListener, FEEDBACK_LISTENER};
