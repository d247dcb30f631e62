//! Relationship graph: output model, entity resolution and traversal.
//!
//! Starting from one entity, walks the typed relationships between indicators,
//! events, samples, emails, domains and IPs, honoring the caller's source
//! visibility at every hop, and emits a node/edge list for the vis front end.

mod resolver;
mod traversal;

pub use resolver::find_document;
pub use traversal::{generate_vis_graph, TraversalLimits, DEFAULT_MAX_DEPTH};

use serde::{Deserialize, Serialize};

use crate::entity::{escape_label, Entity};

/// One node as the front end draws it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    pub shape: String,
    pub size: u32,
    pub color: String,
    pub border_color: String,
    pub highlight_color: String,
    pub highlight_border_color: String,
}

impl RenderNode {
    /// Styled, label-escaped node for an entity.
    pub fn for_entity(entity: &Entity) -> Self {
        let style = entity.kind.style();
        Self {
            id: entity.id.clone(),
            label: escape_label(&entity.label),
            shape: style.shape.to_string(),
            size: style.size,
            color: style.color.to_string(),
            border_color: style.border.to_string(),
            highlight_color: style.highlight.to_string(),
            highlight_border_color: style.highlight_border.to_string(),
        }
    }
}

/// An undirected edge; the orientation is whichever side was walked first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from_id: String,
    pub to_id: String,
}

impl GraphEdge {
    /// Whether this edge joins `a` and `b` in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from_id == a && self.to_id == b) || (self.from_id == b && self.to_id == a)
    }
}

/// Nodes in visitation order plus the edges observed while walking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<GraphEdge>,
}

impl VisGraph {
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn contains_edge(&self, a: &str, b: &str) -> bool {
        self.edges.iter().any(|e| e.connects(a, b))
    }
}

/// Outcome of a graph request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GraphResult {
    /// The start entity resolved; the graph has at least one node.
    #[serde(rename = "ok")]
    Found(VisGraph),
    /// No entity with that id is visible to the caller.
    NotFound,
}

impl GraphResult {
    pub fn graph(&self) -> Option<&VisGraph> {
        match self {
            GraphResult::Found(graph) => Some(graph),
            GraphResult::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphResult::NotFound)
    }
}
