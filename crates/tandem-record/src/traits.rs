//! Store capabilities.

use tandem_common::error::TandemResult;

use crate::entity::Entity;

/// Stores that can look entities up.
pub trait Gettable {
    /// Lookup key.
    type Key: ?Sized;
    /// Lookup result (`Entity` or `Option<Entity>`).
    type Output;

    /// Looks up one entity.
    fn get(&self, key: &Self::Key) -> TandemResult<Self::Output>;
}

/// Stores that can persist entities.
pub trait Savable {
    /// Persists `entity`, updating it with anything the store assigned.
    fn save(&self, entity: &mut Entity) -> TandemResult<()>;
}

/// Stores that can remove entities.
pub trait Deletable {
    /// Removes `entity`. Returns whether it existed.
    fn delete(&self, entity: &Entity) -> TandemResult<bool>;
}
