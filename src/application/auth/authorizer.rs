//! Command authorization - locality then privilege

use std::sync::Arc;

use crate::application::messaging::ParsedCommand;
use crate::domain::entities::{Command, Locality, Privilege};
use crate::domain::traits::PrivilegeAuthority;

pub const GROUP_ADMINS_ONLY: &str = "Only group admins are allowed to use this command ⚠";
pub const STAFF_ONLY: &str = "Only the bot staff are allowed to use this command ⚠";
pub const OWNERS_ONLY: &str = "Only the bot owners are allowed to use this command ⚠";

/// Decides whether a requested command may run.
///
/// `None` accepts the request, `Some(reason)` rejects it with a reason meant
/// for the requester.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, parsed: &ParsedCommand, command: &Command) -> Option<String>;
}

impl<F> Authorizer for F
where
    F: Fn(&ParsedCommand, &Command) -> Option<String> + Send + Sync,
{
    fn authorize(&self, parsed: &ParsedCommand, command: &Command) -> Option<String> {
        self(parsed, command)
    }
}

/// Check the command's locality against the chat it was requested in
pub fn check_locality(parsed: &ParsedCommand, command: &Command) -> Option<String> {
    let chat = &parsed.origin.chat;
    match command.locality() {
        Locality::All => None,
        Locality::User if chat.is_private() => None,
        Locality::User => Some(format!("{} is available only in private chats ⚠", parsed)),
        Locality::Group if chat.is_group() => None,
        Locality::Group => Some(format!("{} is available only in groups ⚠", parsed)),
    }
}

/// Check the command's privilege level against the requester.
///
/// A requester meeting a stricter level than required is accepted. Lookups
/// run owner, admin, group admin, and stop at the first hit.
pub fn check_privilege(
    authority: &dyn PrivilegeAuthority,
    parsed: &ParsedCommand,
    command: &Command,
) -> Option<String> {
    let required = command.privilege();
    if required == Privilege::Public {
        return None;
    }

    let message = &parsed.origin;
    let requester = message.sender_id();
    let is_owner = || requester.is_some_and(|id| authority.is_owner(id));
    let is_admin = || requester.is_some_and(|id| authority.is_admin(id));
    let is_group_admin = || authority.is_group_admin(message);

    let accepted = is_owner()
        || (required <= Privilege::Admin && is_admin())
        || (required == Privilege::GroupAdmin && is_group_admin());

    if accepted {
        return None;
    }

    let reason = match required {
        Privilege::GroupAdmin => GROUP_ADMINS_ONLY,
        Privilege::Admin => STAFF_ONLY,
        Privilege::Owner | Privilege::Public => OWNERS_ONLY,
    };
    Some(reason.to_string())
}

/// Locality check followed by privilege check; the first rejection wins.
pub struct StandardAuthorizer {
    authority: Arc<dyn PrivilegeAuthority>,
}

impl StandardAuthorizer {
    pub fn new(authority: Arc<dyn PrivilegeAuthority>) -> Self {
        Self { authority }
    }
}

impl Authorizer for StandardAuthorizer {
    fn authorize(&self, parsed: &ParsedCommand, command: &Command) -> Option<String> {
        check_locality(parsed, command)
            .or_else(|| check_privilege(self.authority.as_ref(), parsed, command))
    }
}
