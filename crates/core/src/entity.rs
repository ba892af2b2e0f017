//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stores key records by `Entity::Id`, so every persisted domain type
/// implements this.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
