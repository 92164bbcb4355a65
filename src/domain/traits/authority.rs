use crate::domain::entities::{Message, UserId};

/// Source of the booleans the privilege check combines.
///
/// Implementations swallow lookup failures and answer `false`.
pub trait PrivilegeAuthority: Send + Sync {
    /// Bot staff member
    fn is_admin(&self, user_id: UserId) -> bool;

    /// Bot owner
    fn is_owner(&self, user_id: UserId) -> bool;

    /// Administrator of the chat `message` was sent in
    fn is_group_admin(&self, message: &Message) -> bool;
}
