//! Dot command - export the graph for graphviz

use anyhow::{Context, Result};
use console::style;
use provquery::{export, Querier};
use std::path::Path;

pub fn run(querier: &Querier, output: Option<&Path>) -> Result<()> {
    let dot = export::to_dot(querier).context("Failed to decode the graph")?;
    match output {
        Some(path) => {
            std::fs::write(path, &dot)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote {} nodes to {}",
                style("[OK]").green(),
                querier.entity_count(),
                style(path.display()).cyan()
            );
        }
        None => println!("{}", dot),
    }
    Ok(())
}
