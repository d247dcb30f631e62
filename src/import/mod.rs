//! JSON fixtures: entities, their sources and relationships, and analysts.
//!
//! A fixture can be written into SQLite with [`import_fixture`] or loaded
//! straight into a [`MemoryRepository`].

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::db::Db;
use crate::entity::{Entity, EntityKind, Relationship, SourceSet};
use crate::error::{Result, VisError};
use crate::repository::MemoryRepository;

/// Top-level fixture document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub analysts: Vec<AnalystRecord>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystRecord {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl EntityRecord {
    fn to_entity(&self) -> Result<Entity> {
        let kind = EntityKind::from_tag(&self.kind).ok_or_else(|| {
            VisError::InvalidInput(format!("unsupported entity type: {}", self.kind))
        })?;
        let id = match &self.id {
            Some(id) if id.trim().is_empty() => {
                return Err(VisError::InvalidInput(format!("empty id for {} '{}'", kind, self.label)));
            }
            Some(id) => id.clone(),
            None => Uuid::new_v4().to_string(),
        };
        Ok(Entity {
            id,
            kind,
            label: self.label.clone(),
            sources: self.sources.clone(),
            relationships: self.relationships.clone(),
        })
    }
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub entities: usize,
    pub relationships: usize,
    pub analysts: usize,
}

impl Fixture {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Validated entities; ids are generated where missing.
    pub fn entities(&self) -> Result<Vec<Entity>> {
        self.entities.iter().map(EntityRecord::to_entity).collect()
    }

    /// Sources granted to `analyst` by this fixture.
    pub fn analyst_sources(&self, analyst: &str) -> SourceSet {
        self.analysts
            .iter()
            .filter(|a| a.name == analyst)
            .flat_map(|a| a.sources.iter().cloned())
            .collect()
    }

    pub fn to_memory_repository(&self) -> Result<MemoryRepository> {
        Ok(self.entities()?.into_iter().collect())
    }
}

/// Write a fixture in one transaction. Existing entities and analysts are
/// replaced along with their sources and relationships.
pub fn import_fixture(conn: &mut Connection, fixture: &Fixture) -> Result<ImportStats> {
    let entities = fixture.entities()?;
    let mut stats = ImportStats::default();

    let tx = conn.transaction()?;

    for entity in &entities {
        let tag = entity.kind.tag();
        let upsert = format!(
            "INSERT INTO {table} (id, {label}) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET {label} = excluded.{label}",
            table = entity.kind.table(),
            label = entity.kind.label_column(),
        );
        tx.execute(&upsert, params![entity.id, entity.label])?;

        tx.execute(
            "DELETE FROM entity_sources WHERE object_type = ?1 AND object_id = ?2",
            params![tag, entity.id],
        )?;
        for source in &entity.sources {
            tx.execute(
                "INSERT OR IGNORE INTO entity_sources (object_type, object_id, name) VALUES (?1, ?2, ?3)",
                params![tag, entity.id, source],
            )?;
        }

        tx.execute(
            "DELETE FROM relationships WHERE object_type = ?1 AND object_id = ?2",
            params![tag, entity.id],
        )?;
        for (position, rel) in entity.relationships.iter().enumerate() {
            tx.execute(
                "INSERT INTO relationships (object_type, object_id, position, target_id, target_type) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![tag, entity.id, position as i64, rel.target_id, rel.target_type],
            )?;
        }

        log::debug!("Imported {} {} ({} relationships)", tag, entity.id, entity.relationships.len());
        stats.entities += 1;
        stats.relationships += entity.relationships.len();
    }

    for analyst in &fixture.analysts {
        tx.execute("INSERT OR IGNORE INTO analysts (name) VALUES (?1)", [&analyst.name])?;
        tx.execute("DELETE FROM analyst_sources WHERE analyst = ?1", [&analyst.name])?;
        for source in &analyst.sources {
            tx.execute(
                "INSERT OR IGNORE INTO analyst_sources (analyst, source) VALUES (?1, ?2)",
                params![analyst.name, source],
            )?;
        }
        stats.analysts += 1;
    }

    tx.commit()?;
    Ok(stats)
}

/// [`import_fixture`] on the blocking pool.
pub async fn import_into(db: &Db, fixture: Fixture) -> Result<ImportStats> {
    db.with_connection(move |conn| import_fixture(conn, &fixture)).await
}
