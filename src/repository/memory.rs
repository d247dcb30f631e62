use std::cell::Cell;
use std::collections::HashMap;

use super::EntityRepository;
use crate::entity::{Entity, EntityKind, SourceSet};
use crate::error::Result;

/// In-memory entity store, keyed by collection and id.
///
/// Backs fixture-driven runs of the `vis` binary and the traversal tests.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    entities: HashMap<(EntityKind, String), Entity>,
    lookups: Cell<usize>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity.
    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert((entity.kind, entity.id.clone()), entity);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of `find_visible` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl FromIterator<Entity> for MemoryRepository {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut repo = MemoryRepository::new();
        for entity in iter {
            repo.insert(entity);
        }
        repo
    }
}

impl EntityRepository for MemoryRepository {
    fn find_visible(&self, kind: EntityKind, id: &str, allowed: &SourceSet) -> Result<Option<Entity>> {
        self.lookups.set(self.lookups.get() + 1);
        Ok(self
            .entities
            .get(&(kind, id.to_string()))
            .filter(|entity| entity.is_visible_to(allowed))
            .cloned())
    }
}
