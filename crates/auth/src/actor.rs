use serde::{Deserialize, Serialize};

use dealdesk_core::UserId;

/// Identity of the caller performing an operation.
///
/// Construction is decoupled from transport: the API layer authenticates a
/// request however it likes and hands the engine a resolved `Actor`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.user_id, f)
    }
}
