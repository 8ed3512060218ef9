//! `dealdesk-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod patch;
pub mod value;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AggregateId, ContactId, IntakeFormLineItemId, OrderLineItemId, PimCategoryId, PimProductId,
    PriceId, ProjectId, QuoteLineItemId, RevisionId, UserId, WorkspaceId,
};
pub use patch::Patch;
pub use value::RentalWindow;
pub use value_object::ValueObject;
