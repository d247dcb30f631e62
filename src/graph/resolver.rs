//! Untyped id resolution.

use crate::entity::{Entity, EntityKind, SourceSet};
use crate::error::Result;
use crate::repository::EntityRepository;

/// Find the visible entity behind `id`, probing each collection in
/// [`EntityKind::PROBE_ORDER`]. At most six lookups.
pub fn find_document<R: EntityRepository + ?Sized>(
    repo: &R,
    id: &str,
    allowed: &SourceSet,
) -> Result<Option<Entity>> {
    for kind in EntityKind::PROBE_ORDER {
        if let Some(entity) = repo.find_visible(kind, id, allowed)? {
            log::debug!("Resolved {} as {}", id, kind);
            return Ok(Some(entity));
        }
    }
    Ok(None)
}
