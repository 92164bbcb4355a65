use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::{InteractivityError, StorageError};
use crate::application::messaging::Handler;
use crate::domain::entities::{ChatId, InteractivityState, MessageId, Update};
use crate::domain::traits::{InteractivityListener, StorageBackend};

/// Routes a chat's messages to the conversation listener active on it.
///
/// At most one listener is active per chat. The active listener id, the bot
/// prompt it waits for and its data live in storage, so a conversation
/// survives restarts.
///
/// Processing a message reads the record, invokes the listener and writes the
/// record back with no atomicity of its own. Two messages of the same chat
/// processed concurrently may lose one of the writes; callers must feed a
/// chat's updates one at a time.
pub struct InteractivityEngine {
    key_prefix: String,
    storage: Arc<dyn StorageBackend>,
    listeners: HashMap<String, Arc<dyn InteractivityListener>>,
}

impl InteractivityEngine {
    pub fn new(namespace: &str, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            key_prefix: format!("{}:interactivity", namespace),
            storage,
            listeners: HashMap::new(),
        }
    }

    pub fn register_listener(
        &mut self,
        id: impl Into<String>,
        listener: Arc<dyn InteractivityListener>,
    ) -> Result<(), InteractivityError> {
        let id = id.into();
        if self.listeners.contains_key(&id) {
            return Err(InteractivityError::DuplicateListener(id));
        }
        tracing::debug!("Registered listener '{}'", id);
        self.listeners.insert(id, listener);
        Ok(())
    }

    /// Start a conversation on `chat_id`, replacing whatever was active.
    pub fn activate_listener(
        &self,
        chat_id: ChatId,
        id: &str,
        init_data: HashMap<String, String>,
    ) -> Result<(), InteractivityError> {
        let listener = self
            .listeners
            .get(id)
            .ok_or_else(|| InteractivityError::UnknownListener(id.to_string()))?;

        self.deactivate_listener(chat_id)?;

        let mut state = InteractivityState::new(init_data, None);
        listener.activated(chat_id, &mut state);
        if state.finished {
            tracing::debug!("[{}] Listener '{}' declined activation", chat_id, id);
            return Ok(());
        }

        self.store(chat_id, id, &state)?;
        tracing::debug!("[{}] Listener '{}' activated", chat_id, id);
        Ok(())
    }

    /// Stop the active conversation. Returns whether one was active.
    pub fn deactivate_listener(&self, chat_id: ChatId) -> Result<bool, StorageError> {
        let Some(id) = self.active_listener(chat_id)? else {
            return Ok(false);
        };

        if let Some(listener) = self.listeners.get(&id) {
            let mut state = self.load(chat_id)?;
            listener.deactivated(chat_id, &mut state);
        }
        self.clear(chat_id)?;
        tracing::debug!("[{}] Listener '{}' deactivated", chat_id, id);
        Ok(true)
    }

    /// Id of the listener active on `chat_id`, registered or not
    pub fn active_listener(&self, chat_id: ChatId) -> Result<Option<String>, StorageError> {
        self.storage.get_string(&self.key(chat_id, "listener"))
    }

    /// Offer `update` to the chat's active listener.
    pub fn try_process(&self, update: &Update) -> Result<bool, StorageError> {
        let Some(message) = &update.message else {
            return Ok(false);
        };
        let chat_id = message.chat_id();

        let Some(id) = self.active_listener(chat_id)? else {
            return Ok(false);
        };
        let Some(listener) = self.listeners.get(&id) else {
            tracing::warn!("[{}] Active listener '{}' is not registered", chat_id, id);
            return Ok(false);
        };

        let mut state = self.load(chat_id)?;
        if let Some(prompt_id) = state.bot_message_id {
            if !message.is_reply_to(prompt_id) {
                tracing::trace!("[{}] Not a reply to {}, ignored by '{}'", chat_id, prompt_id, id);
                return Ok(false);
            }
        }

        let consumed = listener.process(chat_id, message, &mut state);
        if state.finished {
            self.clear(chat_id)?;
            tracing::debug!("[{}] Listener '{}' finished", chat_id, id);
        } else {
            self.store(chat_id, &id, &state)?;
        }
        Ok(consumed)
    }

    fn key(&self, chat_id: ChatId, field: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, chat_id, field)
    }

    fn load(&self, chat_id: ChatId) -> Result<InteractivityState, StorageError> {
        let data = self.storage.get_hash(&self.key(chat_id, "data"))?;
        let bot_message_id = self
            .storage
            .get_string(&self.key(chat_id, "message"))?
            .map(|raw| {
                raw.parse::<MessageId>()
                    .map_err(|e| StorageError::Serialization(format!("message id '{}': {}", raw, e)))
            })
            .transpose()?;
        Ok(InteractivityState::new(data, bot_message_id))
    }

    fn store(&self, chat_id: ChatId, id: &str, state: &InteractivityState) -> Result<(), StorageError> {
        self.storage.set_string(&self.key(chat_id, "listener"), id)?;

        let message_key = self.key(chat_id, "message");
        match state.bot_message_id {
            Some(message_id) => self.storage.set_string(&message_key, &message_id.to_string())?,
            None => self.storage.delete_key(&message_key)?,
        }

        let data_key = self.key(chat_id, "data");
        if state.data.is_empty() {
            self.storage.delete_hash(&data_key)
        } else {
            self.storage.set_hash(&data_key, &state.data)
        }
    }

    fn clear(&self, chat_id: ChatId) -> Result<(), StorageError> {
        self.storage.delete_key(&self.key(chat_id, "listener"))?;
        self.storage.delete_key(&self.key(chat_id, "message"))?;
        self.storage.delete_hash(&self.key(chat_id, "data"))
    }
}

/// Storage failures are logged and the update reported as not consumed; use
/// [`InteractivityEngine::try_process`] to observe them.
impl Handler<Update> for InteractivityEngine {
    fn process(&self, update: &Update) -> bool {
        match self.try_process(update) {
            Ok(consumed) => consumed,
            Err(e) => {
                tracing::error!("[{}] Conversation storage failed: {}", update.chat_id().unwrap_or_default(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::domain::entities::{Chat, Message};
    use crate::infrastructure::storage::MemoryStorage;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Activated(ChatId),
        Process(ChatId, String),
        Deactivated(ChatId),
    }

    /// Counts messages into `count`; "done" finishes, "skip" is left unconsumed.
    #[derive(Default)]
    struct Counter {
        calls: Mutex<Vec<Call>>,
        decline: bool,
        prompt: Option<MessageId>,
    }

    impl Counter {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl InteractivityListener for Counter {
        fn activated(&self, chat_id: ChatId, state: &mut InteractivityState) {
            self.calls.lock().unwrap().push(Call::Activated(chat_id));
            state.set("count", "0");
            state.bot_message_id = self.prompt;
            if self.decline {
                state.finish();
            }
        }

        fn process(&self, chat_id: ChatId, message: &Message, state: &mut InteractivityState) -> bool {
            let text = message.text.clone().unwrap_or_default();
            self.calls.lock().unwrap().push(Call::Process(chat_id, text.clone()));
            let count: u32 = state.get("count").and_then(|c| c.parse().ok()).unwrap_or(0) + 1;
            state.set("count", count.to_string());
            if text == "done" {
                state.finish();
            }
            text != "skip"
        }

        fn deactivated(&self, chat_id: ChatId, _state: &mut InteractivityState) {
            self.calls.lock().unwrap().push(Call::Deactivated(chat_id));
        }
    }

    type Seen = (&'static str, HashMap<String, String>, Option<MessageId>);

    /// Scopes to prompt 5 with `{k: v}` and records the state each callback gets
    #[derive(Default)]
    struct Spy {
        seen: Mutex<Vec<Seen>>,
    }

    impl Spy {
        fn record(&self, callback: &'static str, state: &InteractivityState) {
            self.seen
                .lock()
                .unwrap()
                .push((callback, state.data.clone(), state.bot_message_id));
        }

        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl InteractivityListener for Spy {
        fn activated(&self, _chat_id: ChatId, state: &mut InteractivityState) {
            state.set("k", "v");
            state.bot_message_id = Some(5);
        }

        fn process(&self, _chat_id: ChatId, _message: &Message, state: &mut InteractivityState) -> bool {
            self.record("process", state);
            state.set("step", "2");
            true
        }

        fn deactivated(&self, _chat_id: ChatId, state: &mut InteractivityState) {
            self.record("deactivated", state);
        }
    }

    fn kv(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn reply_to_prompt(chat: ChatId) -> Update {
        let prompt = Message::new(5, Chat::group(chat));
        Update::from_message(1, Message::from_text(300, Chat::group(chat), "hi").with_reply_to(prompt))
    }

    fn engine(listener: Arc<Counter>) -> (InteractivityEngine, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let mut engine = InteractivityEngine::new("test", storage.clone());
        engine.register_listener("counter", listener).unwrap();
        (engine, storage)
    }

    fn text(chat: ChatId, body: &str) -> Update {
        Update::from_message(1, Message::from_text(100, Chat::private(chat), body))
    }

    #[test]
    fn test_duplicate_listener_rejected() {
        let (mut engine, _) = engine(Arc::new(Counter::default()));
        let again = engine.register_listener("counter", Arc::new(Counter::default()));
        assert!(matches!(again, Err(InteractivityError::DuplicateListener(id)) if id == "counter"));
    }

    #[test]
    fn test_unknown_listener_rejected() {
        let (engine, _) = engine(Arc::new(Counter::default()));
        let result = engine.activate_listener(1, "missing", HashMap::new());
        assert!(matches!(result, Err(InteractivityError::UnknownListener(id)) if id == "missing"));
        assert_eq!(engine.active_listener(1).unwrap(), None);
    }

    #[test]
    fn test_inactive_chat_consumes_nothing() {
        let listener = Arc::new(Counter::default());
        let (engine, _) = engine(listener.clone());

        assert!(!engine.process(&text(1, "hello")));
        assert!(!engine.process(&Update::new(2, None)));
        assert!(listener.calls().is_empty());
    }

    #[test]
    fn test_declined_activation_persists_nothing() {
        let listener = Arc::new(Counter { decline: true, ..Default::default() });
        let (engine, storage) = engine(listener.clone());

        engine.activate_listener(1, "counter", HashMap::new()).unwrap();
        assert_eq!(engine.active_listener(1).unwrap(), None);
        assert!(storage.is_empty());
        assert!(!engine.process(&text(1, "hello")));
        assert_eq!(listener.calls(), vec![Call::Activated(1)]);
    }

    #[test]
    fn test_data_carries_between_messages() {
        let listener = Arc::new(Counter::default());
        let (engine, storage) = engine(listener.clone());

        let init = HashMap::from([("origin".to_string(), "menu".to_string())]);
        engine.activate_listener(1, "counter", init).unwrap();
        assert_eq!(engine.active_listener(1).unwrap().as_deref(), Some("counter"));

        assert!(engine.process(&text(1, "one")));
        assert!(engine.process(&text(1, "two")));

        let data = storage.get_hash("test:interactivity:1:data").unwrap();
        assert_eq!(data.get("count").map(String::as_str), Some("2"));
        assert_eq!(data.get("origin").map(String::as_str), Some("menu"));
        assert_eq!(
            storage.get_string("test:interactivity:1:listener").unwrap().as_deref(),
            Some("counter")
        );
    }

    #[test]
    fn test_listener_decides_consumption() {
        let listener = Arc::new(Counter::default());
        let (engine, _) = engine(listener.clone());
        engine.activate_listener(1, "counter", HashMap::new()).unwrap();

        assert!(!engine.process(&text(1, "skip")));
        assert_eq!(engine.active_listener(1).unwrap().as_deref(), Some("counter"));
    }

    #[test]
    fn test_finishing_releases_chat() {
        let listener = Arc::new(Counter::default());
        let (engine, storage) = engine(listener.clone());
        engine.activate_listener(1, "counter", HashMap::new()).unwrap();

        assert!(engine.process(&text(1, "done")));
        assert_eq!(engine.active_listener(1).unwrap(), None);
        assert!(storage.is_empty());
        assert!(!engine.process(&text(1, "after")));
        assert_eq!(listener.calls().len(), 2);
    }

    #[test]
    fn test_chats_are_independent() {
        let listener = Arc::new(Counter::default());
        let (engine, _) = engine(listener.clone());
        engine.activate_listener(1, "counter", HashMap::new()).unwrap();

        assert!(!engine.process(&text(2, "elsewhere")));
        assert!(engine.process(&text(1, "here")));
    }

    #[test]
    fn test_prompt_scopes_to_replies() {
        let listener = Arc::new(Counter { prompt: Some(77), ..Default::default() });
        let (engine, _) = engine(listener.clone());
        engine.activate_listener(-5, "counter", HashMap::new()).unwrap();

        let prompt = Message::new(77, Chat::group(-5));
        let other = Message::new(78, Chat::group(-5));
        let plain = Update::from_message(1, Message::from_text(200, Chat::group(-5), "hi"));
        let wrong = Update::from_message(2, Message::from_text(201, Chat::group(-5), "hi").with_reply_to(other));
        let right = Update::from_message(3, Message::from_text(202, Chat::group(-5), "hi").with_reply_to(prompt));

        assert!(!engine.process(&plain));
        assert!(!engine.process(&wrong));
        assert!(engine.process(&right));
        assert_eq!(listener.calls(), vec![Call::Activated(-5), Call::Process(-5, "hi".to_string())]);
    }

    #[test]
    fn test_deactivate() {
        let listener = Arc::new(Counter::default());
        let (engine, storage) = engine(listener.clone());

        assert!(!engine.deactivate_listener(1).unwrap());

        engine.activate_listener(1, "counter", HashMap::new()).unwrap();
        assert!(engine.deactivate_listener(1).unwrap());
        assert!(storage.is_empty());
        assert_eq!(listener.calls(), vec![Call::Activated(1), Call::Deactivated(1)]);
    }

    #[test]
    fn test_activation_replaces_active_listener() {
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        let storage = Arc::new(MemoryStorage::new());
        let mut engine = InteractivityEngine::new("test", storage);
        engine.register_listener("first", first.clone()).unwrap();
        engine.register_listener("second", second.clone()).unwrap();

        engine.activate_listener(1, "first", HashMap::new()).unwrap();
        engine.activate_listener(1, "second", HashMap::new()).unwrap();

        assert_eq!(first.calls(), vec![Call::Activated(1), Call::Deactivated(1)]);
        assert_eq!(engine.active_listener(1).unwrap().as_deref(), Some("second"));
        assert!(engine.process(&text(1, "x")));
        assert_eq!(second.calls().len(), 2);
    }

    #[test]
    fn test_deactivated_sees_persisted_state() {
        let spy = Arc::new(Spy::default());
        let mut engine = InteractivityEngine::new("test", Arc::new(MemoryStorage::new()));
        engine.register_listener("spy", spy.clone()).unwrap();

        engine.activate_listener(-5, "spy", HashMap::new()).unwrap();
        assert!(engine.process(&reply_to_prompt(-5)));
        assert!(engine.deactivate_listener(-5).unwrap());

        assert_eq!(
            spy.seen(),
            vec![
                ("process", kv(&[("k", "v")]), Some(5)),
                ("deactivated", kv(&[("k", "v"), ("step", "2")]), Some(5)),
            ]
        );
    }

    #[test]
    fn test_replaced_listener_sees_persisted_state() {
        let spy = Arc::new(Spy::default());
        let storage = Arc::new(MemoryStorage::new());
        let mut engine = InteractivityEngine::new("test", storage);
        engine.register_listener("spy", spy.clone()).unwrap();
        engine.register_listener("counter", Arc::new(Counter::default())).unwrap();

        engine.activate_listener(-5, "spy", HashMap::from([("origin".to_string(), "menu".to_string())])).unwrap();
        engine.activate_listener(-5, "counter", HashMap::new()).unwrap();

        assert_eq!(spy.seen(), vec![("deactivated", kv(&[("origin", "menu"), ("k", "v")]), Some(5))]);
        assert_eq!(engine.active_listener(-5).unwrap().as_deref(), Some("counter"));
    }

    #[test]
    fn test_unregistered_listener_keeps_record_until_deactivated() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_string("test:interactivity:-5:listener", "ghost").unwrap();
        storage.set_string("test:interactivity:-5:message", "5").unwrap();
        storage.set_hash("test:interactivity:-5:data", &kv(&[("k", "v")])).unwrap();
        let engine = InteractivityEngine::new("test", storage.clone());

        assert!(!engine.process(&reply_to_prompt(-5)));
        assert_eq!(storage.get_hash("test:interactivity:-5:data").unwrap(), kv(&[("k", "v")]));
        assert_eq!(storage.get_string("test:interactivity:-5:message").unwrap().as_deref(), Some("5"));
        assert_eq!(engine.active_listener(-5).unwrap().as_deref(), Some("ghost"));

        assert!(engine.deactivate_listener(-5).unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_corrupt_message_id_reports_storage_error() {
        let listener = Arc::new(Counter::default());
        let (engine, storage) = engine(listener.clone());
        storage.set_string("test:interactivity:1:listener", "counter").unwrap();
        storage.set_string("test:interactivity:1:message", "not-a-number").unwrap();

        assert!(matches!(engine.try_process(&text(1, "x")), Err(StorageError::Serialization(_))));
        assert!(!engine.process(&text(1, "x")));
        assert!(listener.calls().is_empty());
    }
}
