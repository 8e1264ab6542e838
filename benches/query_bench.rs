//! Benchmark: query latency over a synthetic corpus
//!
//! Builds an in-memory corpus of `FILES` files (each with its pathname node)
//! and `TASKS` tasks, each task reading three files and writing one, then
//! measures the per-identifier queries against it.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use provquery::encode::{
    encode_identifiers, DictionarySpec, EntrySpec, GroupedGraphEncoder, MetadataEncoder,
};
use provquery::{
    CompactGraph, Dictionaries, GraphFormat, IdentifierTable, MetadataDecoder, MetadataOptions,
    Querier,
};
use std::time::Duration;

const FILES: u64 = 2000;
const TASKS: u64 = 500;

fn pathname(f: u64) -> u64 {
    2 * f
}

fn file(f: u64) -> u64 {
    2 * f + 1
}

fn task(t: u64) -> u64 {
    2 * FILES + t
}

/// (head, tail, typ, cf:type)
fn relations() -> Vec<(u64, u64, &'static str, &'static str)> {
    let mut out = Vec::new();
    for f in 0..FILES {
        out.push((pathname(f), file(f), "relation", "named"));
    }
    for t in 0..TASKS {
        for k in 0..3 {
            let f = (t * 7 + k * 13) % FILES;
            out.push((file(f), task(t), "used", "read"));
        }
        let written = (t * 11 + 5) % FILES;
        out.push((task(t), file(written), "wasGeneratedBy", "write"));
    }
    out.sort_unstable_by_key(|&(head, tail, _, _)| (head, tail));
    out.dedup_by_key(|r| (r.0, r.1));
    out
}

fn build() -> Querier<CompactGraph<Vec<u8>>, Vec<u8>> {
    let nodes = 2 * FILES + TASKS;
    let options = MetadataOptions::default();
    let dicts = DictionarySpec::new(
        &["cf:id", "cf:type", "cf:pathname"],
        &["read", "write", "named"],
        &["[file] "],
        &["entity", "activity", "used", "wasGeneratedBy", "relation"],
        &["file", "task", "file_name"],
    );

    let mut identifiers: Vec<String> = (0..nodes).map(|n| format!("node-{}", n)).collect();
    let rels = relations();
    identifiers.extend((0..rels.len()).map(|k| format!("rel-{}", k)));

    let mut enc = MetadataEncoder::new(dicts.clone(), options, nodes)
        .default_node(EntrySpec::new("entity").encoded("cf:type", "file"));
    for n in 0..nodes {
        let entry = if n >= 2 * FILES {
            EntrySpec::new("activity").encoded("cf:type", "task")
        } else if n % 2 == 0 {
            EntrySpec::new("entity")
                .encoded("cf:type", "file_name")
                .other("cf:pathname", format!("/data/{}", n / 2))
        } else {
            EntrySpec::new("entity").equal("cf:type").other("cf:id", n.to_string())
        };
        enc = enc.node(entry);
    }
    for &(head, tail, typ, cf_type) in &rels {
        enc = enc.relation(head, tail, EntrySpec::new(typ).encoded("cf:type", cf_type));
    }

    let edges: Vec<(u64, u64)> = rels.iter().map(|&(head, tail, _, _)| (tail, head)).collect();
    let graph_blob = GroupedGraphEncoder::new(nodes, &edges).encode().unwrap();

    let table = IdentifierTable::parse(&encode_identifiers(nodes as u32, &identifiers)).unwrap();
    let parsed = Dictionaries::parse(&dicts.to_text(), options.width_rule).unwrap();
    let metadata = MetadataDecoder::load(table, parsed, enc.encode().unwrap(), options).unwrap();
    let graph = CompactGraph::load(graph_blob, GraphFormat::Grouped).unwrap();
    Querier::new(metadata, graph).unwrap()
}

fn bench_queries(c: &mut Criterion) {
    let q = build();
    let task_id = format!("node-{}", task(0));
    let read_path = format!("node-{}", pathname(0));
    let file_id = format!("node-{}", file(0));

    let mut group = c.benchmark_group("queries");
    group.bench_function("get_metadata", |b| {
        b.iter(|| q.get_metadata(black_box(&file_id)).unwrap())
    });
    group.bench_function("get_direct_descendants", |b| {
        b.iter(|| q.get_direct_descendants(black_box(&task_id)).unwrap())
    });
    group.bench_function("get_all_ancestors", |b| {
        b.iter(|| q.get_all_ancestors(black_box(&read_path)).unwrap())
    });
    group.bench_function("friends_of", |b| {
        b.iter(|| q.friends_of(black_box(&read_path), black_box(&task_id)).unwrap())
    });
    group.finish();

    let mut group = c.benchmark_group("descendants");
    for t in [0u64, TASKS / 2, TASKS - 1] {
        let id = format!("node-{}", task(t));
        group.bench_with_input(BenchmarkId::from_parameter(t), &id, |b, id| {
            b.iter(|| q.get_all_descendants(id).unwrap())
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(3))
        .sample_size(50);
    targets = bench_queries
}
criterion_main!(benches);
