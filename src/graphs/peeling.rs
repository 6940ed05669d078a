//! Peeling order and junction tree.
//!
//! Factorizes the finalized graph into local potentials, moralizes them, and
//! computes a min-fill variable-elimination order with a priority queue and
//! incremental clique maintenance. The junction tree is assembled from the
//! elimination cliques in reverse order.
//!
//! Almond and Kong (1991) Optimality Issues in Constructing a Markov Tree
//! from Graphical Models. Research Report 329. University of Chicago,
//! Dept. of Statistics.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::Write;

use color_eyre::Result;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::{Direction, Undirected};

use crate::graphs::pedigree_graph::FinalizedGraph;

/// Undirected tree whose nodes are elimination cliques or the separators
/// spliced between them.
pub type JunctionTree = Graph<CliqueNode, (), Undirected>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliqueNode {
    /// Vertices of the finalized graph, sorted by index.
    pub members: Vec<NodeIndex>,
    /// Separator nodes carry the variables shared between two cliques.
    pub is_intersection: bool,
}

/// The compile side of the compile/infer contract: elimination order, the
/// separator recorded per vertex at its elimination, the factorization, and
/// the junction tree. Everything is immutable once built.
#[derive(Debug, Clone)]
pub struct PeelingOrder {
    pub elim_order: Vec<NodeIndex>,
    pub separators: Vec<Vec<NodeIndex>>,
    pub potentials: Vec<Vec<NodeIndex>>,
    pub junction_tree: JunctionTree,
}

impl PeelingOrder {
    /// Clique nodes of the junction tree, separators excluded.
    pub fn cliques(&self) -> impl Iterator<Item = &CliqueNode> {
        self.junction_tree
            .node_weights()
            .filter(|node| !node.is_intersection)
    }

    pub fn print(&self, graph: &FinalizedGraph, w: &mut impl Write) -> Result<()> {
        for &v in &self.elim_order {
            let clique = std::iter::once(v)
                .chain(self.separators[v.index()].iter().copied())
                .map(|x| graph[x].label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(w, "eliminate {} clique {{ {clique} }}", graph[v].label)?;
        }
        writeln!(w)?;
        for j in self.junction_tree.node_indices() {
            let node = &self.junction_tree[j];
            let members = node
                .members
                .iter()
                .map(|x| graph[*x].label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let kind = match node.is_intersection {
                true => "separator",
                false => "clique",
            };
            writeln!(w, "{kind} {} {{ {members} }}", j.index())?;
        }
        for e in self.junction_tree.edge_indices() {
            if let Some((a, b)) = self.junction_tree.edge_endpoints(e) {
                writeln!(w, "{} --- {}", a.index(), b.index())?;
            }
        }
        Ok(())
    }
}

/// Computes the min-fill elimination order over the moralized graph and
/// builds the junction tree. Fill-in ties break on the smaller vertex index,
/// so the order is a deterministic function of the graph.
pub fn peeling_order(graph: &FinalizedGraph) -> PeelingOrder {
    let n = graph.node_count();

    // conditioning set of each vertex's local factor
    let mut depends: Vec<Vec<NodeIndex>> = vec![vec![]; n];
    for v in graph.node_indices() {
        let mut sources: Vec<NodeIndex> = graph.neighbors_directed(v, Direction::Incoming).collect();
        sources.sort_unstable();
        // parallel edges left behind by chain bypass count once
        sources.dedup();
        depends[v.index()] = sources;
    }

    // Factorize the probability distribution into potentials: a unary factor
    // per leaf and per founder, a conditional factor per non-founder
    let mut potentials: Vec<Vec<NodeIndex>> = Vec::with_capacity(2 * n);
    for v in graph.node_indices() {
        if graph.neighbors_directed(v, Direction::Outgoing).next().is_none() {
            potentials.push(vec![v]);
        }
        if depends[v.index()].is_empty() {
            potentials.push(vec![v]);
        } else {
            let mut factor = vec![v];
            factor.extend_from_slice(&depends[v.index()]);
            potentials.push(factor);
        }
    }

    // Moralize: every pair inside a potential becomes adjacent
    let mut neighbors: Vec<Vec<NodeIndex>> = vec![vec![]; n];
    for factor in &potentials {
        for (i, &a) in factor.iter().enumerate() {
            for &b in &factor[i + 1..] {
                sorted_insert(&mut neighbors[a.index()], b);
                sorted_insert(&mut neighbors[b.index()], a);
            }
        }
    }

    let mut fill: Vec<usize> = (0..n).map(|i| fill_in_count(&neighbors, i)).collect();
    let mut queue: BinaryHeap<Reverse<(usize, usize)>> =
        (0..n).map(|i| Reverse((fill[i], i))).collect();
    let mut eliminated = vec![false; n];
    let mut elim_order: Vec<NodeIndex> = Vec::with_capacity(n);
    let mut separators: Vec<Vec<NodeIndex>> = vec![vec![]; n];

    while let Some(Reverse((score, idx))) = queue.pop() {
        // entries left behind by reprioritization are stale
        if eliminated[idx] || score != fill[idx] {
            continue;
        }
        eliminated[idx] = true;
        let v = NodeIndex::new(idx);
        elim_order.push(v);

        let clique = neighbors[idx].clone();
        separators[idx] = clique.clone();

        if score > 0 {
            for (i, &a) in clique.iter().enumerate() {
                for &b in &clique[i + 1..] {
                    sorted_insert(&mut neighbors[a.index()], b);
                    sorted_insert(&mut neighbors[b.index()], a);
                }
            }
        }
        for &a in &clique {
            sorted_remove(&mut neighbors[a.index()], v);
        }
        for &a in &clique {
            let updated = fill_in_count(&neighbors, a.index());
            if updated != fill[a.index()] {
                fill[a.index()] = updated;
                queue.push(Reverse((updated, a.index())));
            }
        }
    }

    let junction_tree = build_junction_tree(&elim_order, &separators);

    PeelingOrder {
        elim_order,
        separators,
        potentials,
        junction_tree,
    }
}

fn build_junction_tree(elim_order: &[NodeIndex], separators: &[Vec<NodeIndex>]) -> JunctionTree {
    let mut tree = JunctionTree::default();

    for &v in elim_order.iter().rev() {
        let separator = &separators[v.index()];
        let mut clique = separator.clone();
        sorted_insert(&mut clique, v);

        if let Some(found) = tree
            .node_indices()
            .find(|&j| tree[j].members == *separator)
        {
            // the separator already exists as a node: mark it and attach
            tree[found].is_intersection = true;
            let node = tree.add_node(CliqueNode {
                members: clique,
                is_intersection: false,
            });
            tree.add_edge(found, node, ());
        } else if let Some(host) = tree
            .node_indices()
            .filter(|&j| is_subset(separator, &tree[j].members))
            .min_by_key(|&j| (tree[j].members.len(), j.index()))
        {
            // splice a separator node between the smallest superset clique
            // and the new clique
            let step = tree.add_node(CliqueNode {
                members: separator.clone(),
                is_intersection: true,
            });
            let node = tree.add_node(CliqueNode {
                members: clique,
                is_intersection: false,
            });
            tree.add_edge(host, step, ());
            tree.add_edge(step, node, ());
        } else {
            tree.add_node(CliqueNode {
                members: clique,
                is_intersection: false,
            });
        }
    }

    tree
}

fn fill_in_count(neighbors: &[Vec<NodeIndex>], idx: usize) -> usize {
    let k = &neighbors[idx];
    let mut fill = 0;
    for (i, &a) in k.iter().enumerate() {
        for &b in &k[i + 1..] {
            if !contains(&neighbors[a.index()], b) {
                fill += 1;
            }
            debug_assert_eq!(
                contains(&neighbors[a.index()], b),
                contains(&neighbors[b.index()], a)
            );
        }
    }
    fill
}

fn sorted_insert(set: &mut Vec<NodeIndex>, value: NodeIndex) {
    if let Err(pos) = set.binary_search(&value) {
        set.insert(pos, value);
    }
}

fn sorted_remove(set: &mut Vec<NodeIndex>, value: NodeIndex) {
    if let Ok(pos) = set.binary_search(&value) {
        set.remove(pos);
    }
}

fn contains(set: &[NodeIndex], value: NodeIndex) -> bool {
    set.binary_search(&value).is_ok()
}

fn is_subset(small: &[NodeIndex], big: &[NodeIndex]) -> bool {
    let mut big = big.iter();
    'outer: for x in small {
        for y in big.by_ref() {
            if y == x {
                continue 'outer;
            }
            if y > x {
                return false;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::pedigree_graph::{EdgeData, EdgeKind, VertexData, VertexType};
    use crate::pedigree::Sex;

    fn idx(values: &[usize]) -> Vec<NodeIndex> {
        values.iter().map(|&i| NodeIndex::new(i)).collect()
    }

    fn germline_vertex(label: &str) -> VertexData {
        VertexData {
            label: label.to_string(),
            sex: Sex::Unknown,
            ploidy: 2,
            ty: VertexType::Germline,
        }
    }

    fn trio_graph() -> FinalizedGraph {
        let mut graph = FinalizedGraph::new();
        let a = graph.add_node(germline_vertex("A"));
        let b = graph.add_node(germline_vertex("B"));
        let c = graph.add_node(germline_vertex("C"));
        let edge = EdgeData {
            length: 1.0,
            kind: EdgeKind::GERM,
        };
        graph.add_edge(a, c, edge.clone());
        graph.add_edge(b, c, edge);
        graph
    }

    #[test]
    fn test_set_helpers() {
        let mut set = idx(&[1, 4]);
        sorted_insert(&mut set, NodeIndex::new(2));
        sorted_insert(&mut set, NodeIndex::new(2));
        assert_eq!(set, idx(&[1, 2, 4]));
        sorted_remove(&mut set, NodeIndex::new(1));
        assert_eq!(set, idx(&[2, 4]));

        assert!(is_subset(&idx(&[2, 4]), &idx(&[1, 2, 3, 4])));
        assert!(!is_subset(&idx(&[2, 5]), &idx(&[1, 2, 3, 4])));
        assert!(is_subset(&idx(&[]), &idx(&[1])));
    }

    #[test]
    fn test_trio_peeling() {
        let graph = trio_graph();
        let peeling = peeling_order(&graph);

        // all fill-ins are zero, ties break on the smaller index
        assert_eq!(peeling.elim_order, idx(&[0, 1, 2]));

        // founders contribute unary factors, the child both a unary factor
        // (it is a leaf) and its conditional factor
        assert_eq!(
            peeling.potentials,
            vec![idx(&[0]), idx(&[1]), idx(&[2]), idx(&[2, 0, 1])]
        );

        let cliques: Vec<&CliqueNode> = peeling.cliques().collect();
        assert_eq!(cliques.len(), 1);
        assert_eq!(cliques[0].members, idx(&[0, 1, 2]));
    }

    #[test]
    fn test_separators_record_elimination_cliques() {
        let graph = trio_graph();
        let peeling = peeling_order(&graph);

        assert_eq!(peeling.separators[0], idx(&[1, 2]));
        assert_eq!(peeling.separators[1], idx(&[2]));
        assert_eq!(peeling.separators[2], idx(&[]));
    }

    #[test]
    fn test_empty_graph() {
        let graph = FinalizedGraph::new();
        let peeling = peeling_order(&graph);
        assert!(peeling.elim_order.is_empty());
        assert_eq!(peeling.junction_tree.node_count(), 0);
    }
}
