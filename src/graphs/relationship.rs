//! Relationship-graph compiler.
//!
//! Builds a typed directed graph from a pedigree and its somatic sample
//! trees, rewrites it under an inheritance model and emits a finalized graph
//! whose vertex indices form four contiguous bands (founders, germline,
//! somatic, sample) in topological order, ready for peeling.

use std::collections::HashSet;
use std::io::Write;

use color_eyre::{eyre::eyre, Result};
use indexmap::IndexMap;
use petgraph::visit::NodeIndexable;
use petgraph::Direction::{Incoming, Outgoing};
use serde::{Deserialize, Serialize};

use crate::error::MutkError::{self, InvalidSex, PedigreeInvalid, SomaticParseError};
use crate::graphs::pedigree_graph::{
    clear_in_edges, clear_vertex, degree, in_degree, out_degree, topological_order, EdgeData,
    EdgeIndex, EdgeKind, FinalizedGraph, NodeIndex, PedigreeGraph, VertexData, VertexType,
};
use crate::graphs::peeling::{peeling_order, PeelingOrder};
use crate::newick::parse_newick;
use crate::pedigree::{Member, Pedigree, Sex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InheritanceModel {
    #[default]
    Autosomal,
    Maternal,
    Paternal,
    XLinked,
    YLinked,
    WLinked,
    ZLinked,
}

impl InheritanceModel {
    pub fn name(&self) -> &'static str {
        match self {
            InheritanceModel::Autosomal => "autosomal",
            InheritanceModel::Maternal => "maternal",
            InheritanceModel::Paternal => "paternal",
            InheritanceModel::XLinked => "x-linked",
            InheritanceModel::YLinked => "y-linked",
            InheritanceModel::WLinked => "w-linked",
            InheritanceModel::ZLinked => "z-linked",
        }
    }
}

impl std::str::FromStr for InheritanceModel {
    type Err = MutkError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "autosomal" => Ok(InheritanceModel::Autosomal),
            "maternal" | "mitochondrial" => Ok(InheritanceModel::Maternal),
            "paternal" => Ok(InheritanceModel::Paternal),
            "x-linked" | "xlinked" => Ok(InheritanceModel::XLinked),
            "y-linked" | "ylinked" => Ok(InheritanceModel::YLinked),
            "w-linked" | "wlinked" => Ok(InheritanceModel::WLinked),
            "z-linked" | "zlinked" => Ok(InheritanceModel::ZLinked),
            _ => Err(MutkError::ModelUnsupported(name.to_string())),
        }
    }
}

/// The compiled relationship graph together with its peeling order. The
/// contained graph is immutable once constructed; downstream inference reads
/// the graph, the elimination order, the potentials and the junction tree.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    graph: FinalizedGraph,
    model: InheritanceModel,
    peeling: PeelingOrder,
}

impl RelationshipGraph {
    pub fn construct(
        pedigree: &Pedigree,
        known_samples: &[String],
        model: InheritanceModel,
        mu: f64,
        mu_somatic: f64,
        normalize_somatic_trees: bool,
    ) -> Result<Self> {
        let mut graph = construct_pedigree_graph(pedigree, known_samples, normalize_somatic_trees)?;

        // Multiply edge lengths by mutation rates
        update_edge_lengths(&mut graph, mu, mu_somatic);

        // Remove structure that is non-informative
        simplify(&mut graph);

        // Prune pedigree
        prune(&mut graph, model)?;

        // Sort and eliminate cleared vertices
        let graph = finalize(&graph);

        let peeling = peeling_order(&graph);

        Ok(Self {
            graph,
            model,
            peeling,
        })
    }

    pub fn graph(&self) -> &FinalizedGraph {
        &self.graph
    }

    pub fn model(&self) -> InheritanceModel {
        self.model
    }

    pub fn peeling(&self) -> &PeelingOrder {
        &self.peeling
    }

    /// Emits the graph as a YAML document with the four band sections.
    pub fn print_graph(&self, w: &mut impl Write) -> Result<()> {
        write!(w, "%YAML 1.2\n---\n")?;
        serde_yaml::to_writer(&mut *w, &self.to_yaml())?;
        Ok(())
    }

    pub fn print_peeling(&self, w: &mut impl Write) -> Result<()> {
        self.peeling.print(&self.graph, w)
    }

    pub fn to_yaml(&self) -> GraphYaml {
        GraphYaml {
            founding: self.yaml_section(|graph, v| {
                graph.neighbors_directed(v, Incoming).next().is_none()
            }),
            germline: self.yaml_section(|graph, v| {
                graph.neighbors_directed(v, Incoming).next().is_some()
                    && graph[v].ty == VertexType::Germline
            }),
            somatic: self.yaml_section(|graph, v| {
                graph.neighbors_directed(v, Incoming).next().is_some()
                    && graph[v].ty == VertexType::Somatic
            }),
            sample: self.yaml_section(|graph, v| {
                graph.neighbors_directed(v, Incoming).next().is_some()
                    && graph[v].ty == VertexType::Sample
            }),
        }
    }

    fn yaml_section(
        &self,
        keep: impl Fn(&FinalizedGraph, NodeIndex) -> bool,
    ) -> IndexMap<String, VertexYaml> {
        use petgraph::visit::EdgeRef;

        let graph = &self.graph;
        let mut section = IndexMap::new();
        for v in graph.node_indices() {
            if !keep(graph, v) {
                continue;
            }
            let mut origin: Vec<(usize, OriginYaml)> = graph
                .edges_directed(v, Incoming)
                .map(|e| {
                    let parent = e.source();
                    (
                        parent.index(),
                        OriginYaml {
                            label: graph[parent].label.clone(),
                            length: e.weight().length,
                            sex: graph[parent].sex.as_str().to_string(),
                        },
                    )
                })
                .collect();
            origin.sort_by_key(|(parent, _)| *parent);

            section.insert(
                graph[v].label.clone(),
                VertexYaml {
                    sex: graph[v].sex.as_str().to_string(),
                    ploidy: graph[v].ploidy,
                    origin: origin.into_iter().map(|(_, o)| o).collect(),
                },
            );
        }
        section
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphYaml {
    pub founding: IndexMap<String, VertexYaml>,
    pub germline: IndexMap<String, VertexYaml>,
    pub somatic: IndexMap<String, VertexYaml>,
    pub sample: IndexMap<String, VertexYaml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexYaml {
    pub sex: String,
    pub ploidy: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub origin: Vec<OriginYaml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginYaml {
    pub label: String,
    pub length: f64,
    pub sex: String,
}

fn ploidy_from_tags(member: &Member) -> u8 {
    const HAPLOID: [&str; 4] = ["haploid", "gamete", "p=1", "ploidy=1"];
    const DIPLOID: [&str; 3] = ["diploid", "p=2", "ploidy=2"];

    if HAPLOID.iter().any(|tag| member.has_tag(tag)) {
        return 1;
    }
    if DIPLOID.iter().any(|tag| member.has_tag(tag)) {
        return 2;
    }
    // a clone with no explicit ploidy resolves against its parent later
    if member.has_tag("clone") {
        return 0;
    }
    2
}

/// Materializes the typed graph: one germline vertex per pedigree member at
/// its position, parent edges keyed on child ploidy, somatic trees from
/// Newick, and sample relabeling from the known-sample set.
pub fn construct_pedigree_graph(
    pedigree: &Pedigree,
    known_samples: &[String],
    normalize_somatic_trees: bool,
) -> Result<PedigreeGraph> {
    let n = pedigree.number_of_members();
    let mut graph = PedigreeGraph::with_capacity(n, 2 * n);

    for member in pedigree.members() {
        graph.add_node(VertexData {
            label: member.name.clone(),
            sex: member.sex,
            ploidy: ploidy_from_tags(member),
            ty: VertexType::Germline,
        });
    }
    add_edges_to_pedigree_graph(pedigree, &mut graph)?;

    // Add somatic branches and nodes
    for (j, member) in pedigree.members().iter().enumerate() {
        for sample in &member.samples {
            parse_newick(
                sample,
                &mut graph,
                NodeIndex::new(j),
                normalize_somatic_trees,
            )
            .map_err(|report| {
                eyre!(SomaticParseError((member.name.clone(), report.to_string())))
            })?;
        }
    }

    // Mark somatic vertices that connect to known samples
    let known: HashSet<&str> = known_samples.iter().map(String::as_str).collect();
    let vertices: Vec<NodeIndex> = graph.node_indices().collect();
    for v in vertices {
        if graph[v].ty != VertexType::Somatic || !known.contains(graph[v].label.as_str()) {
            continue;
        }
        graph[v].ty = VertexType::Sample;
        let incoming: Vec<EdgeIndex> = {
            use petgraph::visit::EdgeRef;
            graph.edges_directed(v, Incoming).map(|e| e.id()).collect()
        };
        for e in incoming {
            graph[e].kind |= EdgeKind::LIB;
        }
    }

    Ok(graph)
}

fn add_edges_to_pedigree_graph(pedigree: &Pedigree, graph: &mut PedigreeGraph) -> Result<()> {
    let lookup = |parent: &str| {
        pedigree
            .lookup_member_position(parent)
            .map(NodeIndex::new)
    };

    for (j, member) in pedigree.members().iter().enumerate() {
        if member.has_tag("founder") || (member.dad.is_none() && member.mom.is_none()) {
            continue;
        }
        let v = NodeIndex::new(j);
        let name = &member.name;

        match graph[v].ploidy {
            0 => {
                // clone: one parent, properties copy through
                if member.dad.is_some() && member.mom.is_some() {
                    return Err(eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("clone '{name}' has two parents instead of one"),
                    ))));
                }
                let (parent_name, length) = if let Some(dad) = &member.dad {
                    (dad, member.dad_length)
                } else if let Some(mom) = &member.mom {
                    (mom, member.mom_length)
                } else {
                    continue;
                };
                let parent = lookup(parent_name).ok_or_else(|| {
                    eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the clone parent of '{name}' is unknown"),
                    )))
                })?;
                graph.add_edge(
                    parent,
                    v,
                    EdgeData {
                        length: length.unwrap_or(1.0),
                        kind: EdgeKind::GERM,
                    },
                );
                graph[v].ploidy = graph[parent].ploidy;
                graph[v].sex = graph[parent].sex;
            }
            1 => {
                // haploid/gamete: one parent of the right sex
                if member.dad.is_some() && member.mom.is_some() {
                    return Err(eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("gamete '{name}' has two parents instead of one"),
                    ))));
                }
                let (parent_name, length, from_dad) = if let Some(dad) = &member.dad {
                    (dad, member.dad_length, true)
                } else if let Some(mom) = &member.mom {
                    (mom, member.mom_length, false)
                } else {
                    continue;
                };
                let parent = lookup(parent_name).ok_or_else(|| {
                    eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the parent of '{name}' is unknown"),
                    )))
                })?;
                if from_dad && graph[parent].sex == Sex::Female {
                    return Err(eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the father of '{name}' is female"),
                    ))));
                }
                if !from_dad && graph[parent].sex == Sex::Male {
                    return Err(eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the mother of '{name}' is male"),
                    ))));
                }
                graph.add_edge(
                    parent,
                    v,
                    EdgeData {
                        length: length.unwrap_or(1.0),
                        kind: EdgeKind::GERM,
                    },
                );
            }
            _ => {
                // diploid: both parents required
                let dad_name = member.dad.as_ref().ok_or_else(|| {
                    eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the father of '{name}' is unspecified"),
                    )))
                })?;
                let mom_name = member.mom.as_ref().ok_or_else(|| {
                    eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the mother of '{name}' is unspecified"),
                    )))
                })?;
                let dad = lookup(dad_name).ok_or_else(|| {
                    eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the father of '{name}' is unknown"),
                    )))
                })?;
                let mom = lookup(mom_name).ok_or_else(|| {
                    eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the mother of '{name}' is unknown"),
                    )))
                })?;
                if graph[dad].sex == Sex::Female {
                    return Err(eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the father of '{name}' is female"),
                    ))));
                }
                if graph[mom].sex == Sex::Male {
                    return Err(eyre!(PedigreeInvalid((
                        name.clone(),
                        format!("the mother of '{name}' is male"),
                    ))));
                }
                graph.add_edge(
                    dad,
                    v,
                    EdgeData {
                        length: member.dad_length.unwrap_or(1.0),
                        kind: EdgeKind::GERM,
                    },
                );
                graph.add_edge(
                    mom,
                    v,
                    EdgeData {
                        length: member.mom_length.unwrap_or(1.0),
                        kind: EdgeKind::GERM,
                    },
                );
            }
        }
    }
    Ok(())
}

/// Multiplies germline edges by `mu` and somatic/library edges by
/// `mu_somatic`.
pub fn update_edge_lengths(graph: &mut PedigreeGraph, mu: f64, mu_somatic: f64) {
    let edges: Vec<EdgeIndex> = graph.edge_indices().collect();
    for e in edges {
        let rate = match graph[e].kind.contains(EdgeKind::GERM) {
            true => mu,
            false => mu_somatic,
        };
        graph[e].length *= rate;
    }
}

/// Removes non-informative structure. All three passes run over one cached
/// topological order, which edge removal cannot invalidate.
pub fn simplify(graph: &mut PedigreeGraph) {
    let topo = topological_order(graph);
    cull_leaves(graph, &topo);
    unlink_summed_founders(graph, &topo);
    bypass_chains(graph, &topo);
}

/// Clears leaf vertices that are not samples, tips first, so whole unobserved
/// subtrees cascade away.
pub fn cull_leaves(graph: &mut PedigreeGraph, topo: &[NodeIndex]) {
    for &v in topo.iter().rev() {
        if out_degree(graph, v) == 0 && graph[v].ty != VertexType::Sample {
            clear_vertex(graph, v);
        }
    }
}

/// Unlinks founders whose every contribution goes to a single child; they sum
/// out to a constant and the child keeps no dependency on them.
pub fn unlink_summed_founders(graph: &mut PedigreeGraph, topo: &[NodeIndex]) {
    for &v in topo {
        if graph[v].ty != VertexType::Germline {
            continue;
        }
        let parents: Vec<NodeIndex> = graph.neighbors_directed(v, Incoming).collect();
        if parents.is_empty() {
            continue;
        }
        if parents.iter().all(|&p| degree(graph, p) == 1) {
            clear_in_edges(graph, v);
        }
    }
}

/// Bypasses a vertex with exactly one out-edge by composing its transmission
/// onto the child: lengths add, edge kinds union. Applies only when the
/// merged vertex would keep at most two in-edges and ploidies match.
pub fn bypass_chains(graph: &mut PedigreeGraph, topo: &[NodeIndex]) {
    use petgraph::visit::EdgeRef;

    for &v in topo {
        if in_degree(graph, v) == 0 || out_degree(graph, v) != 1 {
            continue;
        }
        let out_edge = graph.edges_directed(v, Outgoing).next().unwrap();
        let (out_id, child) = (out_edge.id(), out_edge.target());

        if in_degree(graph, child) + in_degree(graph, v) - 1 > 2 {
            continue;
        }
        if graph[child].ploidy != graph[v].ploidy {
            continue;
        }

        let out_length = graph[out_id].length;
        let out_kind = graph[out_id].kind;
        let incoming: Vec<(NodeIndex, f64, EdgeKind)> = graph
            .edges_directed(v, Incoming)
            .map(|e| (e.source(), e.weight().length, e.weight().kind))
            .collect();
        for (grand, length, kind) in incoming {
            graph.add_edge(
                grand,
                child,
                EdgeData {
                    length: out_length + length,
                    kind: out_kind | kind,
                },
            );
        }
        clear_vertex(graph, v);
    }
}

/// Deletes germline edges disallowed by the model and adjusts ploidies.
pub fn prune(graph: &mut PedigreeGraph, model: InheritanceModel) -> Result<()> {
    match model {
        InheritanceModel::Autosomal => Ok(()),
        InheritanceModel::YLinked => prune_ylinked(graph),
        InheritanceModel::XLinked => prune_xlinked(graph),
        InheritanceModel::WLinked => prune_wlinked(graph),
        InheritanceModel::ZLinked => prune_zlinked(graph),
        InheritanceModel::Maternal => prune_maternal(graph),
        InheritanceModel::Paternal => prune_paternal(graph),
    }
}

fn remove_germline_edges(graph: &mut PedigreeGraph, disallowed: impl Fn(Sex, Sex) -> bool) {
    let doomed: Vec<EdgeIndex> = graph
        .edge_indices()
        .filter(|&e| {
            if !graph[e].kind.contains(EdgeKind::GERM) {
                return false;
            }
            match graph.edge_endpoints(e) {
                Some((a, b)) => disallowed(graph[a].sex, graph[b].sex),
                None => false,
            }
        })
        .collect();
    for e in doomed {
        graph.remove_edge(e);
    }
}

fn unresolved_sex(graph: &mut PedigreeGraph, v: NodeIndex, model: InheritanceModel) -> Result<()> {
    if out_degree(graph, v) != 0 {
        return Err(eyre!(InvalidSex((
            graph[v].label.clone(),
            model.name().to_string(),
        ))));
    }
    Ok(())
}

fn prune_ylinked(graph: &mut PedigreeGraph) -> Result<()> {
    remove_germline_edges(graph, |a, b| a == Sex::Female || b == Sex::Female);

    let vertices: Vec<NodeIndex> = graph.node_indices().collect();
    for v in vertices {
        match graph[v].sex {
            Sex::Female => {
                clear_vertex(graph, v);
                graph[v].ploidy = 0;
            }
            Sex::Male => graph[v].ploidy = 1,
            _ => unresolved_sex(graph, v, InheritanceModel::YLinked)?,
        }
    }
    Ok(())
}

fn prune_xlinked(graph: &mut PedigreeGraph) -> Result<()> {
    remove_germline_edges(graph, |a, b| a == Sex::Male && b == Sex::Male);

    let vertices: Vec<NodeIndex> = graph.node_indices().collect();
    for v in vertices {
        match graph[v].sex {
            Sex::Female => {}
            Sex::Male => graph[v].ploidy = 1,
            _ => unresolved_sex(graph, v, InheritanceModel::XLinked)?,
        }
    }
    Ok(())
}

fn prune_wlinked(graph: &mut PedigreeGraph) -> Result<()> {
    remove_germline_edges(graph, |a, b| a == Sex::Male || b == Sex::Male);

    let vertices: Vec<NodeIndex> = graph.node_indices().collect();
    for v in vertices {
        match graph[v].sex {
            Sex::Male => {
                clear_vertex(graph, v);
                graph[v].ploidy = 0;
            }
            Sex::Female => graph[v].ploidy = 1,
            _ => unresolved_sex(graph, v, InheritanceModel::WLinked)?,
        }
    }
    Ok(())
}

fn prune_zlinked(graph: &mut PedigreeGraph) -> Result<()> {
    remove_germline_edges(graph, |a, b| a == Sex::Female && b == Sex::Female);

    let vertices: Vec<NodeIndex> = graph.node_indices().collect();
    for v in vertices {
        match graph[v].sex {
            Sex::Male => {}
            Sex::Female => graph[v].ploidy = 1,
            _ => unresolved_sex(graph, v, InheritanceModel::ZLinked)?,
        }
    }
    Ok(())
}

fn prune_maternal(graph: &mut PedigreeGraph) -> Result<()> {
    remove_germline_edges(graph, |a, _| a == Sex::Male);

    let vertices: Vec<NodeIndex> = graph.node_indices().collect();
    for v in vertices {
        graph[v].ploidy = 1;
    }
    Ok(())
}

// Paternal transmission keeps father-to-child edges, so maternal ones go.
fn prune_paternal(graph: &mut PedigreeGraph) -> Result<()> {
    remove_germline_edges(graph, |a, _| a == Sex::Female);

    let vertices: Vec<NodeIndex> = graph.node_indices().collect();
    for v in vertices {
        graph[v].ploidy = 1;
    }
    Ok(())
}

/// Emits a fresh graph with vertices renumbered into the four bands, each in
/// topological order. Founder/germline labels gain `/z`, somatic labels gain
/// `/t`. Isolated vertices are dropped.
pub fn finalize(input: &PedigreeGraph) -> FinalizedGraph {
    let topo = topological_order(input);

    let mut order: Vec<NodeIndex> = vec![];
    // Founders
    order.extend(topo.iter().copied().filter(|&v| {
        in_degree(input, v) == 0 && out_degree(input, v) > 0 && input[v].ty == VertexType::Germline
    }));
    // Germline
    order.extend(
        topo.iter()
            .copied()
            .filter(|&v| in_degree(input, v) > 0 && input[v].ty == VertexType::Germline),
    );
    // Somatic
    order.extend(
        topo.iter()
            .copied()
            .filter(|&v| degree(input, v) > 0 && input[v].ty == VertexType::Somatic),
    );
    // Samples
    order.extend(
        topo.iter()
            .copied()
            .filter(|&v| degree(input, v) > 0 && input[v].ty == VertexType::Sample),
    );

    let mut output = FinalizedGraph::with_capacity(order.len(), input.edge_count());
    let mut relocated: Vec<Option<NodeIndex>> = vec![None; input.node_bound()];

    for &v in &order {
        let mut data = input[v].clone();
        if data.ty == VertexType::Germline && in_degree(input, v) == 0 {
            data.ty = VertexType::Founder;
        }
        match data.ty {
            VertexType::Founder | VertexType::Germline => data.label.push_str("/z"),
            VertexType::Somatic => data.label.push_str("/t"),
            VertexType::Sample => {}
        }
        relocated[v.index()] = Some(output.add_node(data));
    }

    for e in input.edge_indices() {
        let Some((src, tgt)) = input.edge_endpoints(e) else {
            continue;
        };
        let (Some(src), Some(tgt)) = (relocated[src.index()], relocated[tgt.index()]) else {
            continue;
        };
        output.add_edge(src, tgt, input[e].clone());
    }

    output
}
