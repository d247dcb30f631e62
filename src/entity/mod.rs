//! Traversable threat-intelligence entities.
//!
//! Only the shape the relationship graph needs is modeled: id, display label,
//! source attribution and the ordered list of outgoing relationships.

mod style;

pub use style::{escape_label, NodeStyle};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Set of source names a caller is allowed to see.
pub type SourceSet = HashSet<String>;

/// The six entity variants that participate in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Indicator,
    Event,
    Sample,
    Email,
    Domain,
    Ip,
}

impl EntityKind {
    /// Order in which an untyped id is probed against the collections.
    pub const PROBE_ORDER: [EntityKind; 6] = [
        EntityKind::Indicator,
        EntityKind::Event,
        EntityKind::Email,
        EntityKind::Sample,
        EntityKind::Domain,
        EntityKind::Ip,
    ];

    /// Parse a relationship type tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Indicator" => Some(EntityKind::Indicator),
            "Event" => Some(EntityKind::Event),
            "Sample" => Some(EntityKind::Sample),
            "Email" => Some(EntityKind::Email),
            "Domain" => Some(EntityKind::Domain),
            "IP" => Some(EntityKind::Ip),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            EntityKind::Indicator => "Indicator",
            EntityKind::Event => "Event",
            EntityKind::Sample => "Sample",
            EntityKind::Email => "Email",
            EntityKind::Domain => "Domain",
            EntityKind::Ip => "IP",
        }
    }

    /// Backing table in the SQLite store.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Indicator => "indicators",
            EntityKind::Event => "events",
            EntityKind::Sample => "samples",
            EntityKind::Email => "emails",
            EntityKind::Domain => "domains",
            EntityKind::Ip => "ips",
        }
    }

    /// Column holding the display label (value, title, filename, ...).
    pub fn label_column(self) -> &'static str {
        match self {
            EntityKind::Indicator => "value",
            EntityKind::Event => "title",
            EntityKind::Sample => "filename",
            EntityKind::Email => "subject",
            EntityKind::Domain => "domain",
            EntityKind::Ip => "ip",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A directed reference from the owning entity to another entity.
///
/// `target_type` is kept as the raw tag so that references to collections the
/// graph does not know about can be stored and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub target_id: String,
    pub target_type: String,
}

impl Relationship {
    pub fn new(target_id: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            target_type: target_type.into(),
        }
    }

    /// Resolved variant of the target, if supported.
    pub fn target_kind(&self) -> Option<EntityKind> {
        EntityKind::from_tag(&self.target_type)
    }
}

/// A stored entity as the graph sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub label: String,
    pub sources: Vec<String>,
    pub relationships: Vec<Relationship>,
}

impl Entity {
    pub fn new(kind: EntityKind, id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            sources: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn with_relationship(mut self, target_id: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationships.push(Relationship::new(target_id, target_type));
        self
    }

    /// True when at least one source tag is in `allowed`.
    pub fn is_visible_to(&self, allowed: &SourceSet) -> bool {
        self.sources.iter().any(|s| allowed.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(names: &[&str]) -> SourceSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tag_round_trip() {
        for kind in EntityKind::PROBE_ORDER {
            assert_eq!(EntityKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_tags() {
        assert_eq!(EntityKind::from_tag("Campaign"), None);
        assert_eq!(EntityKind::from_tag("ip"), None);
        assert_eq!(EntityKind::from_tag(""), None);
    }

    #[test]
    fn test_probe_order() {
        let tags: Vec<_> = EntityKind::PROBE_ORDER.iter().map(|k| k.tag()).collect();
        assert_eq!(tags, ["Indicator", "Event", "Email", "Sample", "Domain", "IP"]);
    }

    #[test]
    fn test_visibility() {
        let entity = Entity::new(EntityKind::Domain, "d1", "evil.example")
            .with_source("osint")
            .with_source("partner");
        assert!(entity.is_visible_to(&sources(&["partner"])));
        assert!(!entity.is_visible_to(&sources(&["internal"])));
        assert!(!entity.is_visible_to(&SourceSet::new()));
    }

    #[test]
    fn test_entity_without_sources_is_invisible() {
        let entity = Entity::new(EntityKind::Ip, "ip1", "10.0.0.1");
        assert!(!entity.is_visible_to(&sources(&["osint"])));
    }

    #[test]
    fn test_relationship_target_kind() {
        assert_eq!(Relationship::new("x", "Sample").target_kind(), Some(EntityKind::Sample));
        assert_eq!(Relationship::new("x", "Actor").target_kind(), None);
    }
}
