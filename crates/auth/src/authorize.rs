use thiserror::Error;

use dealdesk_core::{ContactId, DomainError, WorkspaceId};

use crate::actor::Actor;
use crate::directory::IdentityDirectory;

/// The parties of a quote that matter for authorization.
///
/// Construction of this view is decoupled from storage: the orchestrator
/// projects it out of a loaded quote before asking for a decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QuoteParties {
    pub seller_workspace_id: WorkspaceId,
    pub buyer_workspace_id: Option<WorkspaceId>,
    pub sellers_buyer_contact_id: ContactId,
}

/// Authority class under which an actor may decide on a quote.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QuoteAuthority {
    /// The buyer individual behind the quote's buyer contact.
    BuyerContact,
    /// A manager of the quote's buyer workspace.
    BuyerWorkspaceManager,
    /// A manager of the seller workspace acting on the buyer's behalf.
    SellerOnBehalf,
}

/// The decision being authorized.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecisionKind {
    Accept,
    Reject,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("actor is not a permitted party for this quote")]
    NotAParty,

    #[error("seller acceptance on the buyer's behalf requires a non-empty approval confirmation")]
    MissingApprovalConfirmation,

    #[error("actor is not a manager of workspace {0}")]
    NotWorkspaceManager(WorkspaceId),
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        DomainError::forbidden(err.to_string())
    }
}

/// Resolve the authority class an actor holds over a quote, if any.
///
/// Checked in order: buyer contact, buyer workspace manager, seller manager.
/// An actor who is both the buyer individual and a seller manager acts as the
/// buyer (no approval confirmation needed).
///
/// - No IO beyond the directory lookups
/// - No panics
/// - No business logic (pure policy resolution)
pub fn resolve_quote_authority<D>(
    directory: &D,
    actor: Actor,
    parties: &QuoteParties,
) -> Option<QuoteAuthority>
where
    D: IdentityDirectory + ?Sized,
{
    if directory.user_for_contact(parties.sellers_buyer_contact_id) == Some(actor.user_id) {
        return Some(QuoteAuthority::BuyerContact);
    }

    if let Some(buyer_workspace_id) = parties.buyer_workspace_id {
        if directory.is_workspace_manager(actor.user_id, buyer_workspace_id) {
            return Some(QuoteAuthority::BuyerWorkspaceManager);
        }
    }

    if directory.is_workspace_manager(actor.user_id, parties.seller_workspace_id) {
        return Some(QuoteAuthority::SellerOnBehalf);
    }

    None
}

/// Authorize an accept/reject decision on a quote.
///
/// A seller deciding on the buyer's behalf may *reject* freely, but
/// *acceptance* additionally requires a non-empty `approval_confirmation`.
/// Its absence is an authority gap (`Forbidden`), not bad input.
pub fn authorize_quote_decision<D>(
    directory: &D,
    actor: Actor,
    parties: &QuoteParties,
    decision: DecisionKind,
    approval_confirmation: Option<&str>,
) -> Result<QuoteAuthority, AuthzError>
where
    D: IdentityDirectory + ?Sized,
{
    let authority =
        resolve_quote_authority(directory, actor, parties).ok_or(AuthzError::NotAParty)?;

    let confirmed = approval_confirmation
        .map(str::trim)
        .is_some_and(|c| !c.is_empty());

    if authority == QuoteAuthority::SellerOnBehalf
        && decision == DecisionKind::Accept
        && !confirmed
    {
        return Err(AuthzError::MissingApprovalConfirmation);
    }

    Ok(authority)
}

/// Require the actor to be a manager of the given workspace.
pub fn ensure_workspace_manager<D>(
    directory: &D,
    actor: Actor,
    workspace_id: WorkspaceId,
) -> Result<(), AuthzError>
where
    D: IdentityDirectory + ?Sized,
{
    if directory.is_workspace_manager(actor.user_id, workspace_id) {
        Ok(())
    } else {
        Err(AuthzError::NotWorkspaceManager(workspace_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryIdentityDirectory;
    use dealdesk_core::UserId;

    fn parties(buyer_workspace: Option<WorkspaceId>) -> QuoteParties {
        QuoteParties {
            seller_workspace_id: WorkspaceId::new(),
            buyer_workspace_id: buyer_workspace,
            sellers_buyer_contact_id: ContactId::new(),
        }
    }

    #[test]
    fn buyer_contact_accepts_without_confirmation() {
        let directory = InMemoryIdentityDirectory::new();
        let buyer = Actor::new(UserId::new());
        let parties = parties(None);
        directory.link_contact(parties.sellers_buyer_contact_id, buyer.user_id);

        let authority =
            authorize_quote_decision(&directory, buyer, &parties, DecisionKind::Accept, None)
                .unwrap();
        assert_eq!(authority, QuoteAuthority::BuyerContact);
    }

    #[test]
    fn buyer_workspace_manager_accepts() {
        let directory = InMemoryIdentityDirectory::new();
        let manager = Actor::new(UserId::new());
        let buyer_workspace = WorkspaceId::new();
        let parties = parties(Some(buyer_workspace));
        directory.grant_manager(manager.user_id, buyer_workspace);

        let authority =
            authorize_quote_decision(&directory, manager, &parties, DecisionKind::Accept, None)
                .unwrap();
        assert_eq!(authority, QuoteAuthority::BuyerWorkspaceManager);
    }

    #[test]
    fn seller_acceptance_requires_confirmation() {
        let directory = InMemoryIdentityDirectory::new();
        let seller = Actor::new(UserId::new());
        let parties = parties(None);
        directory.grant_manager(seller.user_id, parties.seller_workspace_id);

        let err =
            authorize_quote_decision(&directory, seller, &parties, DecisionKind::Accept, None)
                .unwrap_err();
        assert_eq!(err, AuthzError::MissingApprovalConfirmation);

        // Whitespace does not count as confirmation.
        let err = authorize_quote_decision(
            &directory,
            seller,
            &parties,
            DecisionKind::Accept,
            Some("   "),
        )
        .unwrap_err();
        assert_eq!(err, AuthzError::MissingApprovalConfirmation);

        let authority = authorize_quote_decision(
            &directory,
            seller,
            &parties,
            DecisionKind::Accept,
            Some("Confirmed by phone with J. Alvarez"),
        )
        .unwrap();
        assert_eq!(authority, QuoteAuthority::SellerOnBehalf);
    }

    #[test]
    fn seller_rejection_needs_no_confirmation() {
        let directory = InMemoryIdentityDirectory::new();
        let seller = Actor::new(UserId::new());
        let parties = parties(None);
        directory.grant_manager(seller.user_id, parties.seller_workspace_id);

        let authority =
            authorize_quote_decision(&directory, seller, &parties, DecisionKind::Reject, None)
                .unwrap();
        assert_eq!(authority, QuoteAuthority::SellerOnBehalf);
    }

    #[test]
    fn unrelated_actor_is_not_a_party() {
        let directory = InMemoryIdentityDirectory::new();
        let stranger = Actor::new(UserId::new());
        let parties = parties(Some(WorkspaceId::new()));

        let err = authorize_quote_decision(
            &directory,
            stranger,
            &parties,
            DecisionKind::Accept,
            Some("confirmation"),
        )
        .unwrap_err();
        assert_eq!(err, AuthzError::NotAParty);
    }

    #[test]
    fn manager_of_other_workspace_is_not_a_party() {
        let directory = InMemoryIdentityDirectory::new();
        let manager = Actor::new(UserId::new());
        let parties = parties(None);
        directory.grant_manager(manager.user_id, WorkspaceId::new());

        assert_eq!(
            resolve_quote_authority(&directory, manager, &parties),
            None
        );
    }

    #[test]
    fn workspace_manager_check() {
        let directory = InMemoryIdentityDirectory::new();
        let manager = Actor::new(UserId::new());
        let workspace = WorkspaceId::new();
        directory.grant_manager(manager.user_id, workspace);

        assert!(ensure_workspace_manager(&directory, manager, workspace).is_ok());

        let other = WorkspaceId::new();
        assert_eq!(
            ensure_workspace_manager(&directory, manager, other),
            Err(AuthzError::NotWorkspaceManager(other))
        );
    }
}
