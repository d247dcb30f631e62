use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};

use super::EntityRepository;
use crate::entity::{Entity, EntityKind, Relationship, SourceSet};
use crate::error::Result;

/// Allowed sources bound per visibility query. Larger sets are checked in
/// several queries so they stay under SQLite's bound-variable limit.
const SOURCE_CHUNK: usize = 500;

/// Entity repository over the SQLite collections.
///
/// Borrows a connection so a whole traversal runs on one connection inside
/// [`crate::db::Db::with_connection`].
pub struct SqliteRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn load_sources(&self, kind: EntityKind, id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT name FROM entity_sources WHERE object_type = ?1 AND object_id = ?2 ORDER BY name",
        )?;
        let names = stmt
            .query_map(params![kind.tag(), id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(names)
    }

    fn load_relationships(&self, kind: EntityKind, id: &str) -> Result<Vec<Relationship>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT target_id, target_type FROM relationships \
             WHERE object_type = ?1 AND object_id = ?2 \
             ORDER BY position",
        )?;
        let rels = stmt
            .query_map(params![kind.tag(), id], |row| {
                Ok(Relationship {
                    target_id: row.get(0)?,
                    target_type: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(rels)
    }

    /// Label of `id` if it carries any source in `sources`.
    fn visible_label(&self, kind: EntityKind, id: &str, sources: &[&String]) -> Result<Option<String>> {
        // Table and column names come from the closed EntityKind set.
        let placeholders = (0..sources.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(",");
        let query = format!(
            "SELECT e.{label} FROM {table} e \
             WHERE e.id = ?1 AND EXISTS ( \
                 SELECT 1 FROM entity_sources s \
                 WHERE s.object_type = ?2 AND s.object_id = e.id AND s.name IN ({placeholders}) \
             )",
            label = kind.label_column(),
            table = kind.table(),
            placeholders = placeholders,
        );

        let tag = kind.tag();
        let mut bound: Vec<&dyn ToSql> = vec![&id, &tag];
        for source in sources {
            bound.push(*source);
        }

        let label = self
            .conn
            .prepare_cached(&query)?
            .query_row(params_from_iter(bound), |row| row.get(0))
            .optional()?;
        Ok(label)
    }
}

impl EntityRepository for SqliteRepository<'_> {
    fn find_visible(&self, kind: EntityKind, id: &str, allowed: &SourceSet) -> Result<Option<Entity>> {
        let allowed: Vec<&String> = allowed.iter().collect();
        let mut label = None;
        for chunk in allowed.chunks(SOURCE_CHUNK) {
            label = self.visible_label(kind, id, chunk)?;
            if label.is_some() {
                break;
            }
        }

        let Some(label) = label else {
            return Ok(None);
        };

        Ok(Some(Entity {
            id: id.to_string(),
            kind,
            label,
            sources: self.load_sources(kind, id)?,
            relationships: self.load_relationships(kind, id)?,
        }))
    }
}

/// Sources an analyst is allowed to see. Unknown analysts get an empty set.
pub fn analyst_sources(conn: &Connection, analyst: &str) -> Result<SourceSet> {
    let mut stmt = conn.prepare_cached("SELECT source FROM analyst_sources WHERE analyst = ?1")?;
    let sources = stmt
        .query_map([analyst], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<SourceSet, rusqlite::Error>>()?;
    Ok(sources)
}
