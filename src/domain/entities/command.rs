use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::application::messaging::ParsedCommand;
use super::Message;

/// Where a command may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locality {
    /// Anywhere
    #[default]
    All,
    /// Private chats only
    User,
    /// Groups and supergroups only
    Group,
}

/// Who may use a command, weakest to strictest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Privilege {
    /// Anyone
    #[default]
    Public,
    /// Group admins, bot admins and bot owners
    GroupAdmin,
    /// Bot admins and bot owners
    Admin,
    /// Bot owners only
    Owner,
}

/// Command action function type
pub type CommandAction = Arc<dyn Fn(&Message, &ParsedCommand) -> Result<(), CommandError> + Send + Sync>;

/// Immutable configuration a [`Command`] is built from
#[derive(Clone, Default)]
pub struct CommandConfig {
    pub name: String,
    pub description: Option<String>,
    pub locality: Locality,
    pub privilege: Privilege,
    pub action: Option<CommandAction>,
}

impl CommandConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_locality(mut self, locality: Locality) -> Self {
        self.locality = locality;
        self
    }

    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Message, &ParsedCommand) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn build(self) -> Result<Command, CommandError> {
        Command::build(self)
    }
}

/// A command the bot can execute
pub struct Command {
    name: String,
    description: Option<String>,
    locality: Locality,
    privilege: Privilege,
    action: CommandAction,
}

impl Command {
    /// Validate a configuration and produce the command.
    pub fn build(config: CommandConfig) -> Result<Self, CommandError> {
        let name = config.name.trim().to_string();
        if name.is_empty() {
            return Err(CommandError::InvalidConfig("command name has not been set".to_string()));
        }
        if name.contains(char::is_whitespace) || name.contains('@') {
            return Err(CommandError::InvalidConfig(format!("invalid command name '{}'", name)));
        }
        let Some(action) = config.action else {
            return Err(CommandError::InvalidConfig(format!("command '{}' has no action", name)));
        };

        Ok(Self {
            name,
            description: config.description,
            locality: config.locality,
            privilege: config.privilege,
            action,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn locality(&self) -> Locality {
        self.locality
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn execute(&self, message: &Message, parsed: &ParsedCommand) -> Result<(), CommandError> {
        (self.action)(message, parsed)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("locality", &self.locality)
            .field("privilege", &self.privilege)
            .finish_non_exhaustive()
    }
}

/// Command registry keyed by command name
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) -> Result<Arc<Command>, CommandError> {
        if self.commands.contains_key(command.name()) {
            return Err(CommandError::Duplicate(command.name().to_string()));
        }
        let command = Arc::new(command);
        self.commands.insert(command.name().to_string(), Arc::clone(&command));
        Ok(command)
    }

    /// Remove `command` if it is the exact instance registered under its name.
    pub fn unregister(&mut self, command: &Arc<Command>) -> bool {
        match self.commands.get(command.name()) {
            Some(registered) if Arc::ptr_eq(registered, command) => {
                self.commands.remove(command.name());
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Command>> {
        self.commands.get(name)
    }

    /// Snapshot of every registered command, sorted by name
    pub fn list(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<_> = self.commands.values().cloned().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
