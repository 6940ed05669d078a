use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::{BitOr, BitOrAssign};

use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, NodeIndexable};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::pedigree::Sex;

pub use petgraph::graph::{EdgeIndex, NodeIndex};

/// The graph under construction. Vertex indices are stable across edge
/// surgery, so a pedigree member keeps its position for the whole pipeline.
pub type PedigreeGraph = StableGraph<VertexData, EdgeData, Directed>;

/// The finalized, immutable graph with contiguous banded indices.
pub type FinalizedGraph = petgraph::graph::Graph<VertexData, EdgeData, Directed>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexType {
    Founder,
    Germline,
    Somatic,
    Sample,
}

/// Bitset over the three transmission kinds. Chain bypass unions the kinds of
/// the composed edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeKind(u8);

impl EdgeKind {
    pub const GERM: EdgeKind = EdgeKind(0b001);
    pub const SOMA: EdgeKind = EdgeKind(0b010);
    pub const LIB: EdgeKind = EdgeKind(0b100);

    pub fn contains(self, other: EdgeKind) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for EdgeKind {
    type Output = EdgeKind;

    fn bitor(self, rhs: EdgeKind) -> EdgeKind {
        EdgeKind(self.0 | rhs.0)
    }
}

impl BitOrAssign for EdgeKind {
    fn bitor_assign(&mut self, rhs: EdgeKind) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexData {
    pub label: String,
    pub sex: Sex,
    pub ploidy: u8,
    pub ty: VertexType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub length: f64,
    pub kind: EdgeKind,
}

pub fn in_degree(graph: &PedigreeGraph, v: NodeIndex) -> usize {
    graph.edges_directed(v, Direction::Incoming).count()
}

pub fn out_degree(graph: &PedigreeGraph, v: NodeIndex) -> usize {
    graph.edges_directed(v, Direction::Outgoing).count()
}

pub fn degree(graph: &PedigreeGraph, v: NodeIndex) -> usize {
    in_degree(graph, v) + out_degree(graph, v)
}

/// Removes every edge adjacent to `v`, leaving the vertex in place.
pub fn clear_vertex(graph: &mut PedigreeGraph, v: NodeIndex) {
    let adjacent: Vec<EdgeIndex> = graph
        .edges_directed(v, Direction::Incoming)
        .chain(graph.edges_directed(v, Direction::Outgoing))
        .map(|e| e.id())
        .collect();
    for e in adjacent {
        graph.remove_edge(e);
    }
}

pub fn clear_in_edges(graph: &mut PedigreeGraph, v: NodeIndex) {
    let incoming: Vec<EdgeIndex> = graph
        .edges_directed(v, Direction::Incoming)
        .map(|e| e.id())
        .collect();
    for e in incoming {
        graph.remove_edge(e);
    }
}

/// Topological order over all vertices, isolated ones included. Ready
/// vertices are drained smallest-index first so the order is a deterministic
/// function of the graph.
pub fn topological_order(graph: &PedigreeGraph) -> Vec<NodeIndex> {
    let bound = graph.node_bound();
    let mut remaining = vec![0usize; bound];
    let mut ready = BinaryHeap::new();

    for v in graph.node_indices() {
        remaining[v.index()] = in_degree(graph, v);
        if remaining[v.index()] == 0 {
            ready.push(Reverse(v.index()));
        }
    }

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(idx)) = ready.pop() {
        let v = NodeIndex::new(idx);
        order.push(v);
        for child in graph.neighbors_directed(v, Direction::Outgoing) {
            remaining[child.index()] -= 1;
            if remaining[child.index()] == 0 {
                ready.push(Reverse(child.index()));
            }
        }
    }

    order
}
