use std::sync::Arc;

use crate::application::messaging::OutgoingText;
use crate::domain::entities::{Chat, ChatId, ChatKind, InteractivityState, Message, UserId};
use crate::domain::traits::{InteractivityListener, Messenger};

/// Listener id the `/feedback` command activates
pub const FEEDBACK_LISTENER: &str = "feedback";

pub const FEEDBACK_PROMPT: &str = "What would you like to tell the bot owner? ✍\nSend /cancel to stop.";
pub const FEEDBACK_THANKS: &str = "Thanks, your feedback has been delivered 💌";

/// One-question conversation: prompt, wait for a text answer, forward it to
/// the owner.
///
/// Activation data: `chat-kind`, `origin-message` and optionally
/// `requester`.
pub struct FeedbackListener {
    messenger: Arc<dyn Messenger>,
    owner: Option<UserId>,
}

impl FeedbackListener {
    pub fn new(messenger: Arc<dyn Messenger>, owner: Option<UserId>) -> Self {
        Self { messenger, owner }
    }
}

impl InteractivityListener for FeedbackListener {
    fn activated(&self, chat_id: ChatId, state: &mut InteractivityState) {
        let chat = Chat::new(chat_id, ChatKind::parse(state.get("chat-kind").unwrap_or("private")));
        let reply_to = if chat.is_private() {
            None
        } else {
            state.get("origin-message").and_then(|id| id.parse().ok())
        };

        match OutgoingText::new(chat_id, FEEDBACK_PROMPT)
            .with_reply_to(reply_to)
            .send(self.messenger.as_ref())
        {
            Some(prompt_id) => state.scope_to_replies_in_groups(&chat, prompt_id),
            // nobody would see the prompt
            None => state.finish(),
        }
    }

    fn process(&self, chat_id: ChatId, message: &Message, state: &mut InteractivityState) -> bool {
        let Some(text) = message.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return false;
        };

        let requester = state
            .get("requester")
            .map(str::to_string)
            .or_else(|| message.sender.as_ref().map(|u| u.display_name()))
            .unwrap_or_else(|| format!("chat {}", chat_id));

        match self.owner {
            Some(owner) => {
                OutgoingText::new(owner, format!("Feedback from {}:\n{}", requester, text))
                    .send(self.messenger.as_ref());
            }
            None => tracing::warn!("[{}] Feedback from {} dropped, no owner configured", chat_id, requester),
        }

        OutgoingText::reply_to_in_group(message, FEEDBACK_THANKS).send(self.messenger.as_ref());
        state.finish();
        true
    }

    fn deactivated(&self, chat_id: ChatId, _state: &mut InteractivityState) {
        tracing::debug!("[{}] Feedback abandoned", chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::domain::entities::User;
    use crate::infrastructure::adapters::console::ConsoleAdapter;

    fn activation(kind: ChatKind) -> InteractivityState {
        let data = HashMap::from([
            ("chat-kind".to_string(), kind.as_str().to_string()),
            ("origin-message".to_string(), "7".to_string()),
            ("requester".to_string(), "@ana".to_string()),
        ]);
        InteractivityState::new(data, None)
    }

    #[test]
    fn test_private_prompt_is_unscoped() {
        let console = Arc::new(ConsoleAdapter::new().quiet());
        let listener = FeedbackListener::new(console.clone(), Some(1));
        let mut state = activation(ChatKind::Private);

        listener.activated(5, &mut state);
        assert!(!state.finished);
        assert_eq!(state.bot_message_id, None);
        assert_eq!(console.last_sent().unwrap().reply_to, None);
    }

    #[test]
    fn test_group_prompt_scopes_to_replies() {
        let console = Arc::new(ConsoleAdapter::new().quiet());
        let listener = FeedbackListener::new(console.clone(), Some(1));
        let mut state = activation(ChatKind::Group);

        listener.activated(-5, &mut state);
        let prompt = console.last_sent().unwrap();
        assert_eq!(prompt.reply_to, Some(7));
        assert_eq!(state.bot_message_id, Some(prompt.id));
    }

    #[test]
    fn test_answer_is_forwarded_to_owner() {
        let console = Arc::new(ConsoleAdapter::new().quiet());
        let listener = FeedbackListener::new(console.clone(), Some(1));
        let mut state = activation(ChatKind::Private);
        console.clear();

        let answer = Message::from_text(8, Chat::private(5), "  Love it  ").with_sender(User::new(5));
        assert!(listener.process(5, &answer, &mut state));
        assert!(state.finished);

        let sent = console.sent();
        assert_eq!(sent[0].chat_id, 1);
        assert_eq!(sent[0].text, "Feedback from @ana:\nLove it");
        assert_eq!(sent[1].chat_id, 5);
        assert_eq!(sent[1].text, FEEDBACK_THANKS);
    }

    #[test]
    fn test_non_text_keeps_waiting() {
        let console = Arc::new(ConsoleAdapter::new().quiet());
        let listener = FeedbackListener::new(console.clone(), None);
        let mut state = activation(ChatKind::Private);

        assert!(!listener.process(5, &Message::new(8, Chat::private(5)), &mut state));
        assert!(!state.finished);
        assert!(console.sent().is_empty());
    }
}
