use std::io::Write;

use color_eyre::Result;

use crate::args::StandardArgs;
use crate::io::get_output;
use crate::subcommands::construct::construct_graph;

pub fn run(args: StandardArgs) -> Result<()> {
    let relationship_graph = construct_graph(&args)?;

    tracing::info!(
        "Peeling eliminates {} vertices into {} junction-tree nodes.",
        relationship_graph.peeling().elim_order.len(),
        relationship_graph.peeling().junction_tree.node_count()
    );

    let mut output = get_output(args.output.clone())?;
    relationship_graph.print_graph(&mut output)?;
    writeln!(output)?;
    relationship_graph.print_peeling(&mut output)?;

    Ok(())
}
