use crate::domain::entities::{ChatId, InteractivityState, Message};

/// A conversation that owns a chat's messages while it is active.
pub trait InteractivityListener: Send + Sync {
    /// The listener was activated on a chat. Calling `state.finish()` here
    /// declines the job and nothing is persisted.
    fn activated(&self, chat_id: ChatId, state: &mut InteractivityState);

    /// A message arrived for the listener. Returns whether it was consumed.
    fn process(&self, chat_id: ChatId, message: &Message, state: &mut InteractivityState) -> bool;

    /// The listener was deactivated from outside (a new activation, `/cancel`).
    /// `state.finished` is ignored, the record is cleared regardless.
    fn deactivated(&self, chat_id: ChatId, state: &mut InteractivityState);
}
