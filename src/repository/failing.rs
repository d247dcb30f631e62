use std::collections::HashSet;

use super::EntityRepository;
use crate::entity::{Entity, EntityKind, SourceSet};
use crate::error::{Result, VisError};

/// Wraps a repository and fails every lookup of the chosen ids, the way an
/// unavailable store would.
pub(crate) struct FailingRepository<R> {
    inner: R,
    failing_ids: HashSet<String>,
}

impl<R: EntityRepository> FailingRepository<R> {
    pub(crate) fn new(inner: R, failing_ids: &[&str]) -> Self {
        Self {
            inner,
            failing_ids: failing_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub(crate) fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: EntityRepository> EntityRepository for FailingRepository<R> {
    fn find_visible(&self, kind: EntityKind, id: &str, allowed: &SourceSet) -> Result<Option<Entity>> {
        if self.failing_ids.contains(id) {
            return Err(VisError::Repository(format!("lookup of {} failed", id)));
        }
        self.inner.find_visible(kind, id, allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    #[test]
    fn test_only_chosen_ids_fail() {
        let inner: MemoryRepository =
            vec![Entity::new(EntityKind::Event, "ok", "fine").with_source("a")].into_iter().collect();
        let repo = FailingRepository::new(inner, &["broken"]);
        let allowed: SourceSet = ["a".to_string()].into_iter().collect();

        let result = repo.find_visible(EntityKind::Event, "broken", &allowed);
        assert!(matches!(result, Err(VisError::Repository(_))));
        assert!(repo.find_visible(EntityKind::Event, "ok", &allowed).unwrap().is_some());
        assert_eq!(repo.inner().lookups(), 1);
    }
}
