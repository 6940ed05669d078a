use color_eyre::Result;

use crate::args::StandardArgs;
use crate::graphs::relationship::RelationshipGraph;
use crate::io::{get_output, read_pedigree_file, read_sample_ids};

pub fn run(args: StandardArgs) -> Result<()> {
    let relationship_graph = construct_graph(&args)?;

    let mut output = get_output(args.output.clone())?;
    relationship_graph.print_graph(&mut output)?;

    Ok(())
}

pub fn construct_graph(args: &StandardArgs) -> Result<RelationshipGraph> {
    let pedigree = read_pedigree_file(&args.file)?;
    let known_samples = read_sample_ids(&args.samples)?.unwrap_or_default();

    let now = std::time::Instant::now();
    let relationship_graph = RelationshipGraph::construct(
        &pedigree,
        &known_samples,
        args.model,
        args.mu,
        args.mu_somatic,
        args.normalize,
    )?;

    tracing::info!(
        "Constructed a {} relationship graph with {} vertices and {} edges in {:?}.",
        args.model.name(),
        relationship_graph.graph().node_count(),
        relationship_graph.graph().edge_count(),
        now.elapsed()
    );

    Ok(relationship_graph)
}
