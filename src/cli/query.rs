//! Identifier-level lookups: metadata, ancestry, paths, friends, ids

use anyhow::Result;
use console::style;
use provquery::Querier;

/// Print a list of identifiers under a heading
pub fn print_ids(title: &str, id: &str, ids: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ids)?);
        return Ok(());
    }
    println!(
        "\n{} of {} ({})\n",
        style(title).bold(),
        style(id).cyan(),
        ids.len()
    );
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}

pub fn metadata(querier: &Querier, id: &str, json: bool) -> Result<()> {
    let record = querier.get_metadata(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    if record.is_empty() {
        println!("{} {}", style("No metadata for").dim(), style(id).cyan());
        return Ok(());
    }

    println!("\n{}\n", style(id).bold());
    let width = record.keys().map(|k| k.len()).max().unwrap_or(0);
    for (key, value) in &record {
        println!("  {}  {}", style(format!("{:width$}", key, width = width)).cyan(), value);
    }
    Ok(())
}

pub fn paths(querier: &Querier, source: &str, sink: &str, json: bool) -> Result<()> {
    let paths = querier.all_paths(source, sink)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }
    println!(
        "\n{} {} -> {} ({})\n",
        style("Paths").bold(),
        style(source).cyan(),
        style(sink).cyan(),
        paths.len()
    );
    for path in &paths {
        println!("  {}", path.join(&format!(" {} ", style("->").dim())));
    }
    Ok(())
}

pub fn friends(querier: &Querier, pathname: &str, task: &str, json: bool) -> Result<()> {
    let friends = querier.friends_of(pathname, task)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&friends)?);
        return Ok(());
    }
    if friends.is_empty() {
        println!(
            "{} {} and {}",
            style("No friends for").dim(),
            style(pathname).cyan(),
            style(task).cyan()
        );
        return Ok(());
    }
    for (relation, pathnames) in &friends {
        println!("\n{} ({})", style(relation).green().bold(), pathnames.len());
        for path in pathnames {
            println!("  {}", path);
        }
    }
    Ok(())
}

pub fn ids(querier: &Querier, json: bool) -> Result<()> {
    let ids = querier.get_node_ids();
    if json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
    } else {
        for id in &ids {
            println!("{}", id);
        }
    }
    Ok(())
}
