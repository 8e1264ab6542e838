//! Shared on-disk corpus for integration tests
//!
//! Pathname P names file F; task T reads F and F3, writes F2 and mmaps F4.
//! Every file has its own pathname node linked by a `named` relation.

#![allow(dead_code)]

use provquery::encode::{
    encode_delta_graph, encode_identifiers, DictionarySpec, EntrySpec, GroupedGraphEncoder,
    MetadataEncoder,
};
use provquery::{DateLayout, GraphFormat, MetadataOptions};
use std::path::Path;
use tempfile::TempDir;

pub const NODES: &[&str] = &[
    "path:/home/a.txt",
    "inode:a",
    "task:editor",
    "inode:c",
    "path:/home/c.txt",
    "inode:b",
    "path:/home/b.txt",
    "inode:d",
    "path:/home/d.txt",
];

/// (head, tail, relation typ, cf:type); graph edge is tail -> head
pub const RELATIONS: &[(u64, u64, &str, &str)] = &[
    (1, 2, "used", "read"),
    (3, 2, "used", "read"),
    (2, 5, "wasGeneratedBy", "write"),
    (7, 2, "used", "mmap"),
    (0, 1, "relation", "named"),
    (4, 3, "relation", "named"),
    (6, 5, "relation", "named"),
    (8, 7, "relation", "named"),
];

pub fn edges() -> Vec<(u64, u64)> {
    RELATIONS.iter().map(|&(head, tail, _, _)| (tail, head)).collect()
}

fn dictionaries(options: MetadataOptions) -> DictionarySpec {
    let spec = DictionarySpec::new(
        &["cf:id", "cf:type", "cf:pathname", "prov:label", "@"],
        &["read", "write", "mmap", "named"],
        &["[file] "],
        &[
            "entity",
            "activity",
            "used",
            "wasGeneratedBy",
            "wasDerivedFrom",
            "wasInformedBy",
            "relation",
        ],
        &["file", "task", "file_name"],
    );
    if options.common_strings {
        spec.with_common_strings(&["write", "mmap", "read", "named"])
    } else {
        spec
    }
}

fn metadata(options: MetadataOptions) -> Vec<u8> {
    let mut enc = MetadataEncoder::new(dictionaries(options), options, NODES.len() as u64)
        .default_node(EntrySpec::new("entity").encoded("cf:type", "file"))
        .default_relation(EntrySpec::new("used").encoded("cf:type", "read"));
    if options.date_layout.has_dates() {
        let mut date = vec![2017, 5, 4, 12, 30, 0, 0];
        date.truncate(options.date_layout.field_count());
        enc = enc.default_date(&date);
    }
    for (id, name) in NODES.iter().enumerate() {
        let entry = if let Some(path) = name.strip_prefix("path:") {
            EntrySpec::new("entity")
                .encoded("cf:type", "file_name")
                .other("cf:pathname", path)
        } else if name.starts_with("task:") {
            EntrySpec::new("activity")
                .encoded("cf:type", "task")
                .other("cf:id", id.to_string())
        } else {
            let mut label = vec![0u8];
            label.extend_from_slice(name.as_bytes());
            EntrySpec::new("entity")
                .equal("cf:type")
                .other("cf:id", id.to_string())
                .other("prov:label", label)
        };
        enc = enc.node(entry);
    }
    for &(head, tail, typ, cf_type) in RELATIONS {
        let entry = if options.common_strings {
            EntrySpec::new(typ).common("cf:type", cf_type)
        } else {
            EntrySpec::new(typ).encoded("cf:type", cf_type)
        };
        enc = enc.relation(head, tail, entry);
    }
    enc.encode().unwrap()
}

fn graph(format: GraphFormat) -> Vec<u8> {
    match format {
        GraphFormat::Grouped => GroupedGraphEncoder::new(NODES.len() as u64, &edges())
            .encode()
            .unwrap(),
        GraphFormat::Delta => encode_delta_graph(NODES.len() as u64, &edges()).unwrap(),
    }
}

/// Write the four inputs and a `provquery.toml` into `dir`
pub fn write_corpus(dir: &Path, format: GraphFormat, mmap: bool) {
    write_corpus_with(dir, format, mmap, MetadataOptions::default());
}

/// Like [`write_corpus`] with explicit metadata options; a common-string
/// table is written alongside when `options.common_strings` is set
pub fn write_corpus_with(dir: &Path, format: GraphFormat, mmap: bool, options: MetadataOptions) {
    let mut identifiers: Vec<String> = NODES.iter().map(|s| s.to_string()).collect();
    identifiers.extend((0..RELATIONS.len()).map(|k| format!("rel-{}", k)));

    std::fs::write(
        dir.join("identifiers.txt"),
        encode_identifiers(NODES.len() as u32, &identifiers),
    )
    .unwrap();
    let dicts = dictionaries(options);
    std::fs::write(dir.join("prov_data_dicts.txt"), dicts.to_text()).unwrap();
    if options.common_strings {
        let (bin, txt) = dicts.common_strings_files().unwrap();
        std::fs::write(dir.join("common_strs.bin"), bin).unwrap();
        std::fs::write(dir.join("common_strs.txt"), txt).unwrap();
    }
    std::fs::write(dir.join("compressed_metadata.txt"), metadata(options)).unwrap();
    std::fs::write(dir.join("graph.cpg"), graph(format)).unwrap();

    let format_name = match format {
        GraphFormat::Grouped => "grouped",
        GraphFormat::Delta => "delta",
    };
    let date_fields = match options.date_layout {
        DateLayout::WithFraction => "with-fraction",
        DateLayout::Seconds => "seconds",
        DateLayout::None => "none",
    };
    std::fs::write(
        dir.join("provquery.toml"),
        format!(
            "[encoding]\ngraph_format = \"{}\"\ndate_fields = \"{}\"\ncommon_strings = {}\n\n[loading]\nmmap = {}\n",
            format_name, date_fields, options.common_strings, mmap
        ),
    )
    .unwrap();
}

pub fn corpus(format: GraphFormat, mmap: bool) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), format, mmap);
    dir
}
