use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{Message, UserId};
use crate::domain::traits::{AdminRoster, Messenger, PrivilegeAuthority};

/// Privilege answers backed by configured owners, a persisted admin roster
/// and the platform's chat membership.
pub struct StaffAuthority {
    messenger: Arc<dyn Messenger>,
    owners: HashSet<UserId>,
    roster: Option<Arc<dyn AdminRoster>>,
}

impl StaffAuthority {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            messenger,
            owners: HashSet::new(),
            roster: None,
        }
    }

    pub fn with_owner(mut self, user_id: UserId) -> Self {
        self.owners.insert(user_id);
        self
    }

    pub fn with_roster(mut self, roster: Arc<dyn AdminRoster>) -> Self {
        self.roster = Some(roster);
        self
    }
}

impl PrivilegeAuthority for StaffAuthority {
    fn is_admin(&self, user_id: UserId) -> bool {
        let Some(roster) = &self.roster else {
            return false;
        };
        match roster.is_admin(user_id) {
            Ok(admin) => admin,
            Err(e) => {
                tracing::warn!("Admin lookup failed for {}: {}", user_id, e);
                false
            }
        }
    }

    fn is_owner(&self, user_id: UserId) -> bool {
        self.owners.contains(&user_id)
    }

    /// Everyone administers their own private chat.
    fn is_group_admin(&self, message: &Message) -> bool {
        if message.is_private() {
            return true;
        }
        let Some(user_id) = message.sender_id() else {
            return false;
        };
        match self.messenger.member_status(message.chat_id(), user_id) {
            Ok(status) => status.is_admin(),
            Err(e) => {
                tracing::warn!("[{}] Member lookup failed for {}: {}", message.chat_id(), user_id, e);
                false
            }
        }
    }
}
