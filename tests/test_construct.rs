mod common;

use common::{approx, child_of, find, labels, member, trio, MU_GERM, MU_SOMA};

use petgraph::algo::is_cyclic_directed;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use mutk::error::MutkError;
use mutk::graphs::pedigree_graph::{topological_order, EdgeKind, VertexType};
use mutk::graphs::peeling::peeling_order;
use mutk::graphs::relationship::{
    bypass_chains, construct_pedigree_graph, finalize, prune, update_edge_lengths,
    InheritanceModel, RelationshipGraph,
};
use mutk::pedigree::{Pedigree, Sex};

#[test]
fn trio_bands_and_scaling() {
    // staged pipeline over a bare trio: every vertex is informative here, so
    // the leaf cull is left out and the banding comes out in full
    let mut graph = construct_pedigree_graph(&trio(Sex::Female), &[], false).unwrap();
    update_edge_lengths(&mut graph, MU_GERM, MU_SOMA);
    prune(&mut graph, InheritanceModel::Autosomal).unwrap();
    let graph = finalize(&graph);

    assert_eq!(labels(&graph), vec!["A/z", "B/z", "C/z"]);
    let types: Vec<VertexType> = graph.node_indices().map(|v| graph[v].ty).collect();
    assert_eq!(
        types,
        vec![VertexType::Founder, VertexType::Founder, VertexType::Germline]
    );

    assert_eq!(graph.edge_count(), 2);
    for edge in graph.edge_references() {
        assert_eq!(edge.weight().kind, EdgeKind::GERM);
        assert!(approx(edge.weight().length, MU_GERM));
    }

    let peeling = peeling_order(&graph);
    let mut order: Vec<usize> = peeling.elim_order.iter().map(|v| v.index()).collect();
    order.sort_unstable();
    assert_eq!(order, vec![0, 1, 2]);

    let cliques: Vec<Vec<usize>> = peeling
        .cliques()
        .map(|c| c.members.iter().map(|v| v.index()).collect())
        .collect();
    assert_eq!(cliques, vec![vec![0, 1, 2]]);
}

#[test]
fn trio_with_observed_sample() {
    let mut pedigree = Pedigree::new();
    pedigree.add_member(member("A", Sex::Male)).unwrap();
    pedigree.add_member(member("B", Sex::Female)).unwrap();
    let mut child = child_of("C", Sex::Female, "A", "B");
    child.samples = vec!["(s1:0.5,s2:0.5)t:1.0;".to_string()];
    pedigree.add_member(child).unwrap();

    let known = vec!["s1".to_string()];
    let rg = RelationshipGraph::construct(
        &pedigree,
        &known,
        InheritanceModel::Autosomal,
        MU_GERM,
        MU_SOMA,
        false,
    )
    .unwrap();
    let graph = rg.graph();

    // the unobserved leaf s2 is culled, the single-parent founders sum out,
    // and the trunk is bypassed into the sample
    assert_eq!(labels(graph), vec!["C/z", "s1"]);
    let c = find(graph, "C/z");
    let s1 = find(graph, "s1");
    assert_eq!(graph[c].ty, VertexType::Founder);
    assert_eq!(graph[s1].ty, VertexType::Sample);

    assert_eq!(graph.edge_count(), 1);
    let edge = graph.edge_references().next().unwrap();
    assert_eq!(edge.source(), c);
    assert_eq!(edge.target(), s1);
    assert!(approx(edge.weight().length, 1.5 * MU_SOMA));
    assert!(edge.weight().kind.contains(EdgeKind::SOMA));
    assert!(edge.weight().kind.contains(EdgeKind::LIB));
    assert!(!edge.weight().kind.contains(EdgeKind::GERM));

    // every sample has one incoming edge and no outgoing edges
    assert_eq!(graph.neighbors_directed(s1, Direction::Incoming).count(), 1);
    assert_eq!(graph.neighbors_directed(s1, Direction::Outgoing).count(), 0);
}

#[test]
fn ylinked_daughter_without_sex_fails() {
    let mut pedigree = Pedigree::new();
    pedigree.add_member(member("A", Sex::Male)).unwrap();
    pedigree.add_member(member("B", Sex::Female)).unwrap();
    let mut child = child_of("C", Sex::Unknown, "A", "B");
    child.samples = vec!["(s1:0.5)t:1.0;".to_string()];
    pedigree.add_member(child).unwrap();

    let known = vec!["s1".to_string()];
    let report = RelationshipGraph::construct(
        &pedigree,
        &known,
        InheritanceModel::YLinked,
        MU_GERM,
        MU_SOMA,
        false,
    )
    .unwrap_err();

    let err = report.downcast_ref::<MutkError>().unwrap();
    assert!(matches!(err, MutkError::InvalidSex(_)));
    assert_eq!(err.subject(), "C");
}

#[test]
fn ylinked_father_son_line() {
    let mut pedigree = Pedigree::new();
    let mut dad = member("A", Sex::Male);
    dad.samples = vec!["(a1:0.5)at:1.0;".to_string()];
    pedigree.add_member(dad).unwrap();
    pedigree.add_member(member("B", Sex::Female)).unwrap();
    let mut son = child_of("C", Sex::Male, "A", "B");
    son.samples = vec!["(c1:0.5)ct:1.0;".to_string()];
    pedigree.add_member(son).unwrap();

    let known = vec!["a1".to_string(), "c1".to_string()];
    let rg = RelationshipGraph::construct(
        &pedigree,
        &known,
        InheritanceModel::YLinked,
        MU_GERM,
        MU_SOMA,
        false,
    )
    .unwrap();
    let graph = rg.graph();

    // the mother is suppressed entirely, everyone left is male and haploid
    assert_eq!(labels(graph), vec!["A/z", "a1", "c1"]);
    for v in graph.node_indices() {
        assert_eq!(graph[v].sex, Sex::Male);
        assert_eq!(graph[v].ploidy, 1);
    }

    // the son's line collapsed into its sample: germline transmission and
    // somatic branches compose, each scaled by its own rate
    let c1 = find(graph, "c1");
    let edge = graph
        .edges_directed(c1, Direction::Incoming)
        .next()
        .unwrap();
    assert_eq!(edge.source(), find(graph, "A/z"));
    assert!(approx(edge.weight().length, MU_GERM + 1.5 * MU_SOMA));
    assert!(edge.weight().kind.contains(EdgeKind::GERM));
    assert!(edge.weight().kind.contains(EdgeKind::SOMA));
    assert!(edge.weight().kind.contains(EdgeKind::LIB));
}

#[test]
fn clone_chain_contracts_to_one_edge() {
    let mut pedigree = Pedigree::new();
    pedigree.add_member(member("A", Sex::Male)).unwrap();
    let mut b = member("B", Sex::Unknown);
    b.tags = vec!["clone".to_string()];
    b.dad = Some("A".to_string());
    b.dad_length = Some(2.0);
    pedigree.add_member(b).unwrap();
    let mut c = member("C", Sex::Unknown);
    c.tags = vec!["clone".to_string()];
    c.dad = Some("B".to_string());
    c.dad_length = Some(3.0);
    pedigree.add_member(c).unwrap();

    let mut graph = construct_pedigree_graph(&pedigree, &[], false).unwrap();
    update_edge_lengths(&mut graph, 2.0, 1.0);
    let topo = topological_order(&graph);
    bypass_chains(&mut graph, &topo);

    // B drops out, its branch length folds into C's
    assert_eq!(graph.edge_count(), 1);
    let edge = graph.edge_indices().next().unwrap();
    let (src, tgt) = graph.edge_endpoints(edge).unwrap();
    assert_eq!((src.index(), tgt.index()), (0, 2));
    assert_eq!(graph[edge].length, 10.0);
    assert_eq!(graph[edge].kind, EdgeKind::GERM);

    // the sex and ploidy copied down the clone chain survive the bypass
    let c = petgraph::graph::NodeIndex::new(2);
    assert_eq!(graph[c].ploidy, 2);
    assert_eq!(graph[c].sex, Sex::Male);

    let graph = finalize(&graph);
    assert_eq!(labels(&graph), vec!["A/z", "C/z"]);
}

fn founder_cull_pedigree() -> Pedigree {
    let mut pedigree = Pedigree::new();
    pedigree.add_member(member("A", Sex::Male)).unwrap();
    let mut b = member("B", Sex::Male);
    b.samples = vec!["(b1:0.2)bt:1.0;".to_string()];
    pedigree.add_member(b).unwrap();
    pedigree.add_member(member("C", Sex::Female)).unwrap();
    let mut d = child_of("D", Sex::Female, "B", "C");
    d.samples = vec![
        "(d1:0.3)dt1:1.0;".to_string(),
        "(d2:0.3)dt2:1.0;".to_string(),
    ];
    pedigree.add_member(d).unwrap();
    pedigree
}

fn known_founder_cull_samples() -> Vec<String> {
    vec!["b1".to_string(), "d1".to_string(), "d2".to_string()]
}

#[test]
fn unused_founder_is_dropped() {
    let rg = RelationshipGraph::construct(
        &founder_cull_pedigree(),
        &known_founder_cull_samples(),
        InheritanceModel::Autosomal,
        MU_GERM,
        MU_SOMA,
        false,
    )
    .unwrap();
    let graph = rg.graph();

    // A contributed nothing and is gone; B and C head the founder band with
    // D alone in the germline band
    assert_eq!(labels(graph), vec!["B/z", "C/z", "D/z", "b1", "d1", "d2"]);
    let types: Vec<VertexType> = graph.node_indices().map(|v| graph[v].ty).collect();
    assert_eq!(
        types,
        vec![
            VertexType::Founder,
            VertexType::Founder,
            VertexType::Germline,
            VertexType::Sample,
            VertexType::Sample,
            VertexType::Sample,
        ]
    );
    assert_eq!(graph.edge_count(), 5);
}

#[test]
fn finalized_graph_invariants() {
    let rg = RelationshipGraph::construct(
        &founder_cull_pedigree(),
        &known_founder_cull_samples(),
        InheritanceModel::Autosomal,
        MU_GERM,
        MU_SOMA,
        false,
    )
    .unwrap();
    let graph = rg.graph();

    assert!(!is_cyclic_directed(graph));

    // bands are contiguous and in order
    let band = |ty: VertexType| match ty {
        VertexType::Founder => 0,
        VertexType::Germline => 1,
        VertexType::Somatic => 2,
        VertexType::Sample => 3,
    };
    let bands: Vec<u8> = graph.node_indices().map(|v| band(graph[v].ty)).collect();
    let mut sorted = bands.clone();
    sorted.sort_unstable();
    assert_eq!(bands, sorted);

    // ancestors precede descendants
    for edge in graph.edge_references() {
        assert!(edge.source().index() < edge.target().index());
    }

    // band labels carry their suffixes
    for v in graph.node_indices() {
        match graph[v].ty {
            VertexType::Founder | VertexType::Germline => {
                assert!(graph[v].label.ends_with("/z"))
            }
            VertexType::Somatic => assert!(graph[v].label.ends_with("/t")),
            VertexType::Sample => assert!(!graph[v].label.ends_with("/z")),
        }

        // a pruned-out vertex never reaches the finalized graph
        assert!(graph[v].ploidy > 0);
    }

    // sample vertices have exactly one origin and no descendants
    for v in graph.node_indices() {
        if graph[v].ty == VertexType::Sample {
            assert_eq!(graph.neighbors_directed(v, Direction::Incoming).count(), 1);
            assert_eq!(graph.neighbors_directed(v, Direction::Outgoing).count(), 0);
        }
    }
}

#[test]
fn construct_is_deterministic() {
    let build = || {
        RelationshipGraph::construct(
            &founder_cull_pedigree(),
            &known_founder_cull_samples(),
            InheritanceModel::Autosomal,
            MU_GERM,
            MU_SOMA,
            false,
        )
        .unwrap()
    };
    let first = build();
    let second = build();

    assert_eq!(labels(first.graph()), labels(second.graph()));
    assert_eq!(
        first.peeling().elim_order,
        second.peeling().elim_order
    );

    let mut left = vec![];
    let mut right = vec![];
    first.print_graph(&mut left).unwrap();
    second.print_graph(&mut right).unwrap();
    assert_eq!(left, right);
}

#[test]
fn normalized_somatic_trees_have_unit_depth() {
    let mut pedigree = Pedigree::new();
    let mut a = member("A", Sex::Male);
    a.samples = vec!["(s1:3.0,s2:1.0)t:1.0;".to_string()];
    pedigree.add_member(a).unwrap();

    let known = vec!["s1".to_string(), "s2".to_string()];
    let rg = RelationshipGraph::construct(
        &pedigree,
        &known,
        InheritanceModel::Autosomal,
        1.0,
        1.0,
        true,
    )
    .unwrap();
    let graph = rg.graph();

    // deepest root-to-leaf path rescales to 1 before rates apply
    let s1 = find(graph, "s1");
    let t = find(graph, "t/t");
    let length = |v| {
        graph
            .edges_directed(v, Direction::Incoming)
            .next()
            .unwrap()
            .weight()
            .length
    };
    assert!(approx(length(t) + length(s1), 1.0));
    assert!(approx(length(s1), 0.75));
}
