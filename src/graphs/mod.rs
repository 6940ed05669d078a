/// Typed directed graph shared by the pipeline stages
pub mod pedigree_graph;

/// Relationship-graph compiler
pub mod relationship;

/// Variable-elimination order and junction tree
pub mod peeling;

pub use pedigree_graph::{EdgeData, EdgeKind, PedigreeGraph, VertexData, VertexType};
pub use peeling::PeelingOrder;
pub use relationship::{InheritanceModel, RelationshipGraph};
