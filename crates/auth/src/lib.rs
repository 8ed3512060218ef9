//! `dealdesk-auth` — pure authorization boundary for document decisions.
//!
//! This crate is intentionally decoupled from HTTP and storage. Identity facts
//! (workspace managership, contact-to-user links) come from an injected
//! [`IdentityDirectory`]; the authority matrix itself is pure policy.

pub mod actor;
pub mod authorize;
pub mod directory;

pub use actor::Actor;
pub use authorize::{
    AuthzError, DecisionKind, QuoteAuthority, QuoteParties, authorize_quote_decision,
    ensure_workspace_manager, resolve_quote_authority,
};
pub use directory::{IdentityDirectory, InMemoryIdentityDirectory};
