#![allow(dead_code)]
use mutk::graphs::pedigree_graph::{FinalizedGraph, NodeIndex};
use mutk::pedigree::{Member, Pedigree, Sex};

pub const MU_GERM: f64 = 2e-8;
pub const MU_SOMA: f64 = 1e-9;

pub fn member(name: &str, sex: Sex) -> Member {
    Member {
        name: name.to_string(),
        sex,
        ..Default::default()
    }
}

pub fn child_of(name: &str, sex: Sex, dad: &str, mom: &str) -> Member {
    Member {
        name: name.to_string(),
        sex,
        dad: Some(dad.to_string()),
        mom: Some(mom.to_string()),
        ..Default::default()
    }
}

pub fn trio(child_sex: Sex) -> Pedigree {
    let mut pedigree = Pedigree::new();
    pedigree.add_member(member("A", Sex::Male)).unwrap();
    pedigree.add_member(member("B", Sex::Female)).unwrap();
    pedigree
        .add_member(child_of("C", child_sex, "A", "B"))
        .unwrap();
    pedigree
}

pub fn find(graph: &FinalizedGraph, label: &str) -> NodeIndex {
    graph
        .node_indices()
        .find(|&v| graph[v].label == label)
        .unwrap_or_else(|| panic!("no vertex labeled {label}"))
}

pub fn labels(graph: &FinalizedGraph) -> Vec<String> {
    graph
        .node_indices()
        .map(|v| graph[v].label.clone())
        .collect()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-20
}
