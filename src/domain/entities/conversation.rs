use std::collections::HashMap;

use super::{Chat, MessageId};

/// Mutable view over a chat's persisted conversation record, handed to
/// listener callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractivityState {
    pub data: HashMap<String, String>,
    /// When set, only replies to this bot message reach the listener
    pub bot_message_id: Option<MessageId>,
    pub finished: bool,
}

impl InteractivityState {
    pub fn new(data: HashMap<String, String>, bot_message_id: Option<MessageId>) -> Self {
        Self {
            data,
            bot_message_id,
            finished: false,
        }
    }

    /// Ask the engine to release the chat once the current callback returns.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Scope the conversation to replies to `prompt_id`, but only in group
    /// chats; private chats keep receiving every message.
    pub fn scope_to_replies_in_groups(&mut self, chat: &Chat, prompt_id: MessageId) {
        if !chat.is_private() {
            self.bot_message_id = Some(prompt_id);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_only_applies_in_groups() {
        let mut state = InteractivityState::default();
        state.scope_to_replies_in_groups(&Chat::private(1), 10);
        assert_eq!(state.bot_message_id, None);

        state.scope_to_replies_in_groups(&Chat::group(-1), 11);
        assert_eq!(state.bot_message_id, Some(11));
    }
}
