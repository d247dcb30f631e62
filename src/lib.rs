pub mod config;
pub mod error;
pub mod db;
pub mod entity;
pub mod repository;
pub mod graph;
pub mod import;
pub mod api;

pub use config::Config;
pub use error::{Result, VisError};
pub use entity::{Entity, EntityKind, Relationship, SourceSet};
pub use graph::{find_document, generate_vis_graph, GraphResult, TraversalLimits, VisGraph};
pub use repository::EntityRepository;
