//! Depth-first relationship walk with an explicit frame stack.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::{find_document, GraphEdge, GraphResult, RenderNode, VisGraph};
use crate::entity::{Entity, Relationship, SourceSet};
use crate::error::{Result, VisError};
use crate::repository::EntityRepository;

pub const DEFAULT_MAX_DEPTH: usize = 30;

/// Bounds on a single traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalLimits {
    /// The start entity is at depth 1; entities at `max_depth` are drawn but
    /// their relationships are not followed.
    pub max_depth: usize,
    /// Fail the request once more than this many nodes would be emitted.
    pub max_nodes: Option<usize>,
    /// Fail the request once the walk has used up this much wall-clock time.
    pub time_budget: Option<Duration>,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: None,
            time_budget: None,
        }
    }
}

/// Build the relationship graph around `start_id` as seen with `allowed`.
///
/// Returns [`GraphResult::NotFound`] when the id does not resolve to an entity
/// visible to the caller. A failed lookup anywhere in the walk aborts the whole
/// request; a partial graph is never returned.
pub fn generate_vis_graph<R: EntityRepository + ?Sized>(
    repo: &R,
    start_id: &str,
    allowed: &SourceSet,
    limits: &TraversalLimits,
) -> Result<GraphResult> {
    if start_id.trim().is_empty() {
        return Err(VisError::InvalidInput("start id must not be empty".to_string()));
    }

    let started = Instant::now();
    let Some(start) = find_document(repo, start_id, allowed)? else {
        log::info!("Graph start {} not found or not visible", start_id);
        return Ok(GraphResult::NotFound);
    };

    let graph = GraphBuilder::new(repo, allowed, limits, started).build(start)?;
    log::info!(
        "Built graph from {}: {} nodes, {} edges in {:?}",
        start_id,
        graph.nodes.len(),
        graph.edges.len(),
        started.elapsed()
    );
    Ok(GraphResult::Found(graph))
}

/// An entity whose relationships are being walked.
struct Frame {
    entity: Entity,
    depth: usize,
    next: usize,
}

struct GraphBuilder<'a, R: ?Sized> {
    repo: &'a R,
    allowed: &'a SourceSet,
    limits: &'a TraversalLimits,
    started: Instant,
    visited: HashSet<String>,
    edge_keys: HashSet<(String, String)>,
    graph: VisGraph,
}

impl<'a, R: EntityRepository + ?Sized> GraphBuilder<'a, R> {
    fn new(repo: &'a R, allowed: &'a SourceSet, limits: &'a TraversalLimits, started: Instant) -> Self {
        Self {
            repo,
            allowed,
            limits,
            started,
            visited: HashSet::new(),
            edge_keys: HashSet::new(),
            graph: VisGraph::default(),
        }
    }

    fn build(mut self, start: Entity) -> Result<VisGraph> {
        let mut stack = Vec::new();
        self.enter(start, 1, &mut stack)?;

        // Each relationship is handled to completion (including the whole
        // subtree it opens) before the owner's next relationship.
        while let Some(frame) = stack.last_mut() {
            let Some(rel) = frame.entity.relationships.get(frame.next).cloned() else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let owner_id = frame.entity.id.clone();
            let depth = frame.depth;

            if let Some(target) = self.follow(&owner_id, &rel)? {
                if !self.visited.contains(&target.id) {
                    self.enter(target, depth, &mut stack)?;
                }
            }
        }

        Ok(self.graph)
    }

    /// Emit the node for `entity` and schedule its relationships if the depth allows.
    fn enter(&mut self, entity: Entity, depth: usize, stack: &mut Vec<Frame>) -> Result<()> {
        if let Some(max_nodes) = self.limits.max_nodes {
            if self.graph.nodes.len() >= max_nodes {
                return Err(VisError::BudgetExceeded(format!("node limit {} reached", max_nodes)));
            }
        }

        self.visited.insert(entity.id.clone());
        log::debug!("Graph node {} ({}) at depth {}", entity.id, entity.kind, depth);
        self.graph.nodes.push(RenderNode::for_entity(&entity));

        let depth = depth + 1;
        if depth > self.limits.max_depth {
            return Ok(());
        }
        stack.push(Frame { entity, depth, next: 0 });
        Ok(())
    }

    /// Resolve one relationship. Records the edge when the target is visible and
    /// the pair has not been seen, and returns the target for possible descent.
    fn follow(&mut self, owner_id: &str, rel: &Relationship) -> Result<Option<Entity>> {
        if self.edge_keys.contains(&edge_key(owner_id, &rel.target_id)) {
            return Ok(None);
        }
        let Some(kind) = rel.target_kind() else {
            log::debug!("Skipping {} -> {}: unsupported type {}", owner_id, rel.target_id, rel.target_type);
            return Ok(None);
        };

        self.check_time()?;
        let target = self.repo.find_visible(kind, &rel.target_id, self.allowed)?;
        if target.is_some() {
            self.edge_keys.insert(edge_key(owner_id, &rel.target_id));
            self.graph.edges.push(GraphEdge {
                from_id: owner_id.to_string(),
                to_id: rel.target_id.clone(),
            });
        }
        Ok(target)
    }

    fn check_time(&self) -> Result<()> {
        if let Some(budget) = self.limits.time_budget {
            let elapsed = self.started.elapsed();
            if elapsed >= budget {
                return Err(VisError::BudgetExceeded(format!(
                    "time budget {:?} exceeded after {:?}",
                    budget, elapsed
                )));
            }
        }
        Ok(())
    }
}

fn edge_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
