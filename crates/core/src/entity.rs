//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Line items inside a document are entities: they keep their identity while
/// their attributes change between revisions.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
