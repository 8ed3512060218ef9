//! Identity/workspace directory abstraction.
//!
//! The engine never stores identity facts itself; it asks this directory two
//! narrow questions (managership, contact linkage) and keeps authorization
//! policy elsewhere.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use dealdesk_core::{ContactId, UserId, WorkspaceId};

/// Resolves identity facts needed by the authority matrix.
pub trait IdentityDirectory: Send + Sync {
    /// Is `user_id` a manager of `workspace_id`?
    fn is_workspace_manager(&self, user_id: UserId, workspace_id: WorkspaceId) -> bool;

    /// The user behind a workspace's contact record, if the contact is linked
    /// to a platform user at all.
    fn user_for_contact(&self, contact_id: ContactId) -> Option<UserId>;
}

impl<D> IdentityDirectory for Arc<D>
where
    D: IdentityDirectory + ?Sized,
{
    fn is_workspace_manager(&self, user_id: UserId, workspace_id: WorkspaceId) -> bool {
        (**self).is_workspace_manager(user_id, workspace_id)
    }

    fn user_for_contact(&self, contact_id: ContactId) -> Option<UserId> {
        (**self).user_for_contact(contact_id)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    managers: RwLock<HashSet<(UserId, WorkspaceId)>>,
    contact_users: RwLock<HashMap<ContactId, UserId>>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_manager(&self, user_id: UserId, workspace_id: WorkspaceId) {
        if let Ok(mut managers) = self.managers.write() {
            managers.insert((user_id, workspace_id));
        }
    }

    pub fn link_contact(&self, contact_id: ContactId, user_id: UserId) {
        if let Ok(mut contacts) = self.contact_users.write() {
            contacts.insert(contact_id, user_id);
        }
    }
}

impl IdentityDirectory for InMemoryIdentityDirectory {
    fn is_workspace_manager(&self, user_id: UserId, workspace_id: WorkspaceId) -> bool {
        self.managers
            .read()
            .map(|managers| managers.contains(&(user_id, workspace_id)))
            .unwrap_or(false)
    }

    fn user_for_contact(&self, contact_id: ContactId) -> Option<UserId> {
        self.contact_users
            .read()
            .ok()
            .and_then(|contacts| contacts.get(&contact_id).copied())
    }
}
