//! Visibility-filtered entity lookup.
//!
//! The graph engine only ever asks one question of storage: "give me the entity
//! of this type with this id, if the caller can see it".

#[cfg(test)]
mod failing;
mod memory;
mod sqlite;

#[cfg(test)]
pub(crate) use failing::FailingRepository;

pub use memory::MemoryRepository;
pub use sqlite::{analyst_sources, SqliteRepository};

use crate::entity::{Entity, EntityKind, SourceSet};
use crate::error::Result;

/// Read access to the entity collections.
pub trait EntityRepository {
    /// Look up `id` in the `kind` collection.
    ///
    /// Returns `Ok(None)` when the entity does not exist or none of its sources
    /// is in `allowed`. Storage failures are errors.
    fn find_visible(&self, kind: EntityKind, id: &str, allowed: &SourceSet) -> Result<Option<Entity>>;
}

impl<R: EntityRepository + ?Sized> EntityRepository for &R {
    fn find_visible(&self, kind: EntityKind, id: &str, allowed: &SourceSet) -> Result<Option<Entity>> {
        (**self).find_visible(kind, id, allowed)
    }
}
