//! CLI command definitions and handlers

mod bench;
mod dot;
mod query;
mod stats;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use provquery::{Querier, QuerierConfig};
use std::path::PathBuf;

/// provq - query compressed provenance graphs
#[derive(Parser, Debug)]
#[command(name = "provq")]
#[command(
    version,
    about = "Query a bit-packed provenance corpus without decompressing it",
    after_help = "\
Examples:
  provq --data-dir ./corpus stats               Summarize the loaded corpus
  provq metadata <ID>                           Decoded key/value record
  provq ancestors <ID> --direct                 Immediate predecessors only
  provq paths <SOURCE> <SINK> --format json     Every simple path, as JSON
  provq friends <PATHNAME> <TASK>               Files tied to the task the same way
  provq dot -o prov.dot                         Export the graph for graphviz"
)]
pub struct Cli {
    /// Config file (default: ./provquery.toml, then the user config)
    #[arg(long, global = true, env = "PROVQUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the input files are read from
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Output format: text, json
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the decoded metadata record of an entity
    Metadata {
        /// Node or relation identifier
        id: String,
    },

    /// List the ancestors of a node
    Ancestors {
        id: String,

        /// Only immediate predecessors
        #[arg(long)]
        direct: bool,
    },

    /// List the descendants of a node
    Descendants {
        id: String,

        /// Only immediate successors
        #[arg(long)]
        direct: bool,
    },

    /// Enumerate every simple path between two nodes
    Paths { source: String, sink: String },

    /// Pathnames of files linked to a task by the same relation types
    Friends { pathname: String, task: String },

    /// List every node identifier
    Ids,

    /// Summarize the loaded corpus
    Stats,

    /// Export the graph in graphviz DOT format
    Dot {
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Time every query over every node
    Bench {
        /// Repetitions per query and node
        #[arg(long, default_value = "1")]
        reps: usize,

        /// Sweep nodes on all cores
        #[arg(long)]
        parallel: bool,
    },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let config = QuerierConfig::load(cli.config.as_deref())?.with_data_dir(cli.data_dir.as_deref());
    let querier = Querier::open(&config)
        .with_context(|| format!("Failed to open corpus in {}", config.data_dir.display()))?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Metadata { id } => query::metadata(&querier, &id, json),
        Commands::Ancestors { id, direct } => {
            let ids = if direct {
                querier.get_direct_ancestors(&id)?
            } else {
                querier.get_all_ancestors(&id)?
            };
            query::print_ids("Ancestors", &id, &ids, json)
        }
        Commands::Descendants { id, direct } => {
            let ids = if direct {
                querier.get_direct_descendants(&id)?
            } else {
                querier.get_all_descendants(&id)?
            };
            query::print_ids("Descendants", &id, &ids, json)
        }
        Commands::Paths { source, sink } => query::paths(&querier, &source, &sink, json),
        Commands::Friends { pathname, task } => query::friends(&querier, &pathname, &task, json),
        Commands::Ids => query::ids(&querier, json),
        Commands::Stats => stats::run(&querier, &config, json),
        Commands::Dot { output } => dot::run(&querier, output.as_deref()),
        Commands::Bench { reps, parallel } => bench::run(&querier, reps, parallel, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_with_globals() {
        let cli = Cli::try_parse_from([
            "provq",
            "ancestors",
            "node-1",
            "--direct",
            "--format",
            "json",
            "--data-dir",
            "/tmp/corpus",
        ])
        .unwrap();
        assert_eq!(cli.format, "json");
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/corpus")));
        match cli.command {
            Commands::Ancestors { id, direct } => {
                assert_eq!(id, "node-1");
                assert!(direct);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["provq", "stats", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_bench_defaults() {
        let cli = Cli::try_parse_from(["provq", "bench"]).unwrap();
        match cli.command {
            Commands::Bench { reps, parallel } => {
                assert_eq!(reps, 1);
                assert!(!parallel);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.log_level, "warn");
    }
}
