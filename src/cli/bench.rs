//! Bench command - time every query over every node id
//!
//! Each query runs `reps` times per node; totals are wall-clock sums. With
//! `--parallel` the node sweep is split across the rayon pool, which shares
//! the querier read-only.
//!
//! `friends_of` needs a (pathname, task) pair, so it only runs for pathnames
//! whose file touches a task; the first such task is used.

use anyhow::Result;
use console::style;
use provquery::{DecodeError, DecodeResult, GraphFormat, Querier};
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};

const QUERIES: [&str; 7] = [
    "get_metadata",
    "get_all_ancestors",
    "get_direct_ancestors",
    "get_all_descendants",
    "get_direct_descendants",
    "friends_of",
    "all_paths",
];

const FRIENDS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
struct Sample {
    elapsed: Duration,
    calls: u64,
}

type Totals = [Sample; QUERIES.len()];

#[derive(Debug, Serialize)]
struct BenchRow {
    query: &'static str,
    calls: u64,
    total_ms: f64,
    mean_us: f64,
}

fn timed<T>(f: impl FnOnce() -> DecodeResult<T>) -> DecodeResult<Duration> {
    let start = Instant::now();
    f()?;
    Ok(start.elapsed())
}

fn has_type(querier: &Querier, id: &str, typ: &str) -> DecodeResult<bool> {
    Ok(querier
        .get_metadata(id)?
        .get("cf:type")
        .is_some_and(|t| t == typ))
}

/// First task adjacent to the file behind `pathname`
fn task_partner(querier: &Querier, pathname: &str) -> DecodeResult<Option<String>> {
    if !has_type(querier, pathname, "file_name")? {
        return Ok(None);
    }
    let ancestors = querier.get_direct_ancestors(pathname)?;
    let [file] = ancestors.as_slice() else {
        return Ok(None);
    };
    let neighbours = querier
        .get_direct_ancestors(file)?
        .into_iter()
        .chain(querier.get_direct_descendants(file)?);
    for node in neighbours {
        if has_type(querier, &node, "task")? {
            return Ok(Some(node));
        }
    }
    Ok(None)
}

fn time_node(querier: &Querier, id: &str, reps: usize, friends: bool) -> DecodeResult<Totals> {
    let partner = if friends {
        task_partner(querier, id)?
    } else {
        None
    };
    let mut totals = [Sample::default(); QUERIES.len()];
    let mut record = |query: usize, elapsed: Duration| {
        totals[query].elapsed += elapsed;
        totals[query].calls += 1;
    };
    for _ in 0..reps {
        record(0, timed(|| querier.get_metadata(id))?);
        record(1, timed(|| querier.get_all_ancestors(id))?);
        record(2, timed(|| querier.get_direct_ancestors(id))?);
        record(3, timed(|| querier.get_all_descendants(id))?);
        record(4, timed(|| querier.get_direct_descendants(id))?);
        if let Some(task) = &partner {
            record(FRIENDS, timed(|| querier.friends_of(id, task))?);
        }
        record(6, timed(|| querier.all_paths(id, id))?);
    }
    Ok(totals)
}

fn add(mut a: Totals, b: Totals) -> Totals {
    for (x, y) in a.iter_mut().zip(b) {
        x.elapsed += y.elapsed;
        x.calls += y.calls;
    }
    a
}

pub fn run(querier: &Querier, reps: usize, parallel: bool, json: bool) -> Result<()> {
    let ids = querier.get_node_ids();
    let friends = querier.graph().format() == GraphFormat::Grouped;
    let zero = [Sample::default(); QUERIES.len()];

    let start = Instant::now();
    let totals = if parallel {
        ids.par_iter()
            .map(|id| time_node(querier, id, reps, friends))
            .try_reduce(|| zero, |a, b| Ok(add(a, b)))?
    } else {
        ids.iter().try_fold(zero, |acc, id| {
            Ok::<_, DecodeError>(add(acc, time_node(querier, id, reps, friends)?))
        })?
    };
    let wall = start.elapsed();

    let rows: Vec<BenchRow> = QUERIES
        .iter()
        .enumerate()
        .zip(totals)
        .filter(|((i, _), _)| friends || *i != FRIENDS)
        .map(|((_, &query), sample)| BenchRow {
            query,
            calls: sample.calls,
            total_ms: sample.elapsed.as_secs_f64() * 1e3,
            mean_us: if sample.calls == 0 {
                0.0
            } else {
                sample.elapsed.as_secs_f64() * 1e6 / sample.calls as f64
            },
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "\n{} {} nodes x {} reps{}\n",
        style("Benchmark").bold(),
        ids.len(),
        reps,
        if parallel { " (parallel)" } else { "" }
    );
    for row in &rows {
        println!(
            "  {:<24} {:>12.3} ms  {:>10.3} us/call",
            style(row.query).cyan(),
            row.total_ms,
            row.mean_us
        );
    }
    println!("\n  Wall clock: {:.3} ms", wall.as_secs_f64() * 1e3);
    Ok(())
}
