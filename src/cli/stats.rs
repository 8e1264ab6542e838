//! Stats command - summarize the loaded corpus

use anyhow::Result;
use console::style;
use provquery::{Querier, QuerierConfig};

pub fn run(querier: &Querier, config: &QuerierConfig, json: bool) -> Result<()> {
    let stats = querier.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\nProvenance Corpus\n");
    println!("  Data: {}", style(config.data_dir.display()).dim());
    println!("  {}: {}", style("Nodes").cyan(), style(stats.nodes).bold());
    println!("  {}: {}", style("Relations").cyan(), style(stats.relations).bold());
    println!("  {}: {:?}", style("Graph encoding").cyan(), stats.graph_format);
    if let (Some(groups), Some(collapsed)) = (stats.groups, stats.collapsed_groups) {
        println!(
            "  {}: {} ({} collapsed)",
            style("Groups").cyan(),
            style(groups).bold(),
            collapsed
        );
    }
    println!("\n  Dictionaries");
    for (name, len) in &stats.dictionaries {
        println!("    {:<10} {}", name, len);
    }
    Ok(())
}
