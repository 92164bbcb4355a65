//! Command dispatcher - Routes command messages to registered commands

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::application::auth::Authorizer;
use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandConfig, CommandRegistry, Update};
use crate::domain::traits::Messenger;

use super::outbound::OutgoingText;
use super::parser::ParsedCommand;
use super::pipe::Handler;

pub const FOREIGN_COMMAND: &str = "You're requesting another bot's command from me 😅";

/// Handler that claims command messages addressed to this bot, authorizes
/// them and runs the matching command.
///
/// Every command message it claims is consumed, including unknown and
/// rejected ones. Bare commands in groups are claimed without a reply.
pub struct CommandDispatcher {
    bot_username: String,
    messenger: Arc<dyn Messenger>,
    authorizer: Arc<dyn Authorizer>,
    registry: CommandRegistry,
}

impl CommandDispatcher {
    pub fn new(
        bot_username: impl Into<String>,
        messenger: Arc<dyn Messenger>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            bot_username: bot_username.into(),
            messenger,
            authorizer,
            registry: CommandRegistry::new(),
        }
    }

    pub fn register(&mut self, command: Command) -> Result<Arc<Command>, CommandError> {
        let command = self.registry.register(command)?;
        tracing::debug!("Registered command /{}", command.name());
        Ok(command)
    }

    /// Build a command from its configuration and register it
    pub fn add(&mut self, config: CommandConfig) -> Result<Arc<Command>, CommandError> {
        self.register(Command::build(config)?)
    }

    pub fn unregister(&mut self, command: &Arc<Command>) -> bool {
        self.registry.unregister(command)
    }

    /// Registered commands sorted by name
    pub fn list(&self) -> Vec<Arc<Command>> {
        self.registry.list()
    }

    fn addresses_me(&self, username: &str) -> bool {
        username.eq_ignore_ascii_case(&self.bot_username)
    }

    fn run(&self, command: &Command, parsed: &ParsedCommand) {
        let message = &parsed.origin;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| command.execute(message, parsed)));
        match outcome {
            Ok(Ok(())) => tracing::trace!("[{}] {} done", message.chat_id(), parsed),
            Ok(Err(e)) => tracing::error!("[{}] Command {} failed: {}", message.chat_id(), parsed, e),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("[{}] Command {} panicked: {}", message.chat_id(), parsed, reason);
            }
        }
    }
}

impl Handler<Update> for CommandDispatcher {
    fn process(&self, update: &Update) -> bool {
        let Some(message) = &update.message else {
            return false;
        };
        let Some(parsed) = ParsedCommand::parse(message) else {
            return false;
        };
        tracing::debug!("[{}] Dispatching {}", message.chat_id(), parsed);

        match parsed.username.as_deref() {
            None if !message.is_private() => {
                tracing::trace!("[{}] Bare command {} in group ignored", message.chat_id(), parsed);
                return true;
            }
            Some(username) if !self.addresses_me(username) => {
                if message.is_private() {
                    OutgoingText::new(message.chat_id(), FOREIGN_COMMAND).send(self.messenger.as_ref());
                }
                return true;
            }
            _ => {}
        }

        let Some(command) = self.registry.get(&parsed.name) else {
            OutgoingText::reply_to_in_group(message, format!("Unknown command {} ⚠", parsed))
                .send(self.messenger.as_ref());
            return true;
        };

        if let Some(reason) = self.authorizer.authorize(&parsed, &command) {
            tracing::debug!("[{}] {} rejected: {}", message.chat_id(), parsed, reason);
            OutgoingText::reply_to_in_group(message, reason).send(self.messenger.as_ref());
            return true;
        }

        self.run(&command, &parsed);
        true
    }
}
