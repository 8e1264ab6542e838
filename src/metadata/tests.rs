//! Metadata decoding tests; the fixture here is shared with the querier tests

use super::*;
use crate::encode::{encode_identifiers, DictionarySpec, EntrySpec, MetadataEncoder};

pub(crate) const IDENTIFIERS: &[&str] = &[
    "path:/etc/passwd",
    "file:passwd:v1",
    "file:passwd:v2",
    "task:cat",
    "file:shadow",
    "path:/etc/shadow",
    "rel:used:passwd",
    "rel:generated:passwd",
    "rel:named:passwd",
    "rel:used:shadow",
    "rel:named:shadow",
];

pub(crate) fn dictionaries() -> DictionarySpec {
    DictionarySpec::new(
        &["cf:id", "cf:type", "cf:mode", "cf:version", "prov:label", "@"],
        &["read", "write", "named", "version", "0644", "0600"],
        &["[file] ", "[task] "],
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
    )
}

fn label(code: u8, rest: &str) -> Vec<u8> {
    let mut bytes = vec![code];
    bytes.extend_from_slice(rest.as_bytes());
    bytes
}

/// Six nodes: pathname 0 of file 1..3 (two versions), task 3 which reads
/// version 1 and is written by version 2, file 4 read by the task with
/// pathname 5.
pub(crate) fn encoder(options: MetadataOptions) -> MetadataEncoder {
    let mut enc = MetadataEncoder::new(dictionaries(), options, 6)
        .default_node(EntrySpec::new("entity").encoded("cf:mode", "0644"))
        .default_relation(EntrySpec::new("used").encoded("cf:type", "read"));
    if options.date_layout.has_dates() {
        let mut date = vec![2023, 1, 2, 3, 4, 5, 0];
        date.truncate(options.date_layout.field_count());
        enc = enc.default_date(&date);
    }
    let dated = |entry: EntrySpec| {
        if options.date_layout == DateLayout::WithFraction {
            entry.date(0, 2024).date(6, 5)
        } else {
            entry
        }
    };
    enc.node(
        EntrySpec::new("entity")
            .encoded("cf:type", "file_name")
            .other("cf:id", "/etc/passwd"),
    )
    .node(dated(
        EntrySpec::new("entity")
            .encoded("cf:type", "file")
            .equal("cf:mode")
            .other("prov:label", label(0, "passwd")),
    ))
    .node(
        EntrySpec::new("entity")
            .relative(1)
            .equal("cf:type")
            .equal("prov:label")
            .equal("cf:mode")
            .equal("cf:id")
            .other("cf:version", "2"),
    )
    .node(
        EntrySpec::new("activity")
            .encoded("cf:type", "task")
            .other("prov:label", label(1, "cat")),
    )
    .node(
        EntrySpec::new("entity")
            .encoded("cf:type", "file")
            .encoded("cf:mode", "0600"),
    )
    .node(
        EntrySpec::new("entity")
            .encoded("cf:type", "file_name")
            .other("cf:id", "/etc/shadow"),
    )
    .relation(1, 3, EntrySpec::new("used").equal("cf:type"))
    .relation(3, 2, EntrySpec::new("wasGeneratedBy").encoded("cf:type", "write"))
    .relation(0, 2, EntrySpec::new("relation").encoded("cf:type", "named"))
    .relation(4, 3, EntrySpec::new("used").equal("cf:type"))
    .relation(5, 4, EntrySpec::new("relation").encoded("cf:type", "named"))
}

/// Graph edges (tail -> head) of the fixture, version edge included
pub(crate) const EDGES: &[(u64, u64)] = &[(2, 1), (3, 1), (2, 3), (2, 0), (3, 4), (4, 5)];
pub(crate) const GROUPS: &[u64] = &[1, 2, 1, 1, 1];

pub(crate) fn decoder_with(
    enc: &MetadataEncoder,
    options: MetadataOptions,
) -> DecodeResult<MetadataDecoder<Vec<u8>>> {
    let table = IdentifierTable::parse(&encode_identifiers(6, IDENTIFIERS))?;
    let dicts = Dictionaries::parse(&dictionaries().to_text(), options.width_rule)?;
    MetadataDecoder::load(table, dicts, enc.encode()?, options)
}

pub(crate) fn decoder() -> MetadataDecoder<Vec<u8>> {
    let options = MetadataOptions::default();
    decoder_with(&encoder(options), options).unwrap()
}

fn record(pairs: &[(&str, &str)]) -> MetadataRecord {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_defaults_are_decoded() {
    let dec = decoder();
    let ctx = dec.context();
    assert_eq!(ctx.default_node(), &record(&[("cf:mode", "0644")]));
    assert_eq!(ctx.default_relation(), &record(&[("cf:type", "read")]));
    assert_eq!(ctx.default_date(), &[2023, 1, 2, 3, 4, 5, 0]);
    assert_eq!(dec.num_nodes(), 6);
    assert_eq!(dec.num_relations(), 5);
}

#[test]
fn test_node_record_diffs_against_default() {
    let dec = decoder();
    assert_eq!(
        dec.get_metadata("file:passwd:v1").unwrap(),
        record(&[
            ("typ", "entity"),
            ("cf:type", "file"),
            ("cf:mode", "0644"),
            ("prov:label", "[file] passwd"),
            ("cf:date", "2024:01:02T03:04:05.5"),
        ])
    );
    assert_eq!(
        dec.get_metadata("task:cat").unwrap().get("prov:label").map(String::as_str),
        Some("[task] cat")
    );
}

#[test]
fn test_relative_node_fills_equal_keys() {
    let dec = decoder();
    let v2 = dec.get_metadata("file:passwd:v2").unwrap();
    assert_eq!(
        v2,
        record(&[
            ("typ", "entity"),
            ("cf:type", "file"),
            ("cf:mode", "0644"),
            ("prov:label", "[file] passwd"),
            ("cf:version", "2"),
            ("cf:date", "2023:01:02T03:04:05.0"),
        ])
    );
    assert!(!v2.contains_key("@"));
    assert!(!v2.contains_key("cf:id"));
}

#[test]
fn test_relation_endpoints_and_default_fallback() {
    let dec = decoder();
    assert_eq!(
        dec.get_metadata("rel:used:passwd").unwrap(),
        record(&[
            ("typ", "used"),
            ("prov:entity", "file:passwd:v1"),
            ("prov:activity", "task:cat"),
            ("cf:type", "read"),
            ("cf:date", "2023:01:02T03:04:05.0"),
        ])
    );
    let generated = dec.get_metadata("rel:generated:passwd").unwrap();
    assert_eq!(generated["prov:activity"], "task:cat");
    assert_eq!(generated["prov:entity"], "file:passwd:v2");
    assert_eq!(generated["cf:type"], "write");
}

#[test]
fn test_relation_ids_follow_record_order() {
    let dec = decoder();
    let space = *dec.context().relation_space();
    let used = dec.identifiers().lookup("rel:used:passwd").unwrap();
    assert_eq!(Some(used), space.relation_id(1, 3));
    assert_eq!(space.endpoints(used).unwrap(), (1, 3));
    assert_eq!(dec.identifiers().identifier(used), Some("rel:used:passwd"));
    assert_eq!(dec.type_of(used).unwrap().as_deref(), Some("used"));
}

#[test]
fn test_power_of_two_node_count_round_trips_relations() {
    // 4 nodes need 2 id bits; every packed pair must still fit 4 bits
    let options = MetadataOptions::default();
    let mut enc = MetadataEncoder::new(dictionaries(), options, 4)
        .default_date(&[2023, 1, 2, 3, 4, 5, 0]);
    for _ in 0..4 {
        enc = enc.node(EntrySpec::new("entity"));
    }
    let enc = enc
        .relation(3, 2, EntrySpec::new("used").equal("cf:type"))
        .relation(0, 3, EntrySpec::new("wasGeneratedBy").encoded("cf:type", "write"));

    let ids = ["a", "b", "c", "d", "r:used", "r:generated"];
    let table = IdentifierTable::parse(&encode_identifiers(4, &ids)).unwrap();
    let dicts = Dictionaries::parse(&dictionaries().to_text(), options.width_rule).unwrap();
    let dec = MetadataDecoder::load(table, dicts, enc.encode().unwrap(), options).unwrap();

    assert_eq!(dec.context().relation_space().id_bits(), 2);
    let used = dec.get_metadata("r:used").unwrap();
    assert_eq!(used["prov:entity"], "d");
    assert_eq!(used["prov:activity"], "c");
    assert_eq!(
        dec.identifiers().lookup("r:used"),
        dec.context().relation_space().relation_id(3, 2)
    );
    let generated = dec.get_metadata("r:generated").unwrap();
    assert_eq!(generated["prov:activity"], "a");
    assert_eq!(generated["prov:entity"], "d");
}

#[test]
fn test_entity_types_for_friend_lookup() {
    let dec = decoder();
    assert_eq!(dec.node_type(0).unwrap().as_deref(), Some("file_name"));
    assert_eq!(dec.node_type(3).unwrap().as_deref(), Some("task"));
    assert_eq!(dec.node_type(99).unwrap(), None);
    // edge 3 -> 1 is the "used" relation with head 1
    assert_eq!(dec.relation_type(3, 1).unwrap().as_deref(), Some("read"));
    assert_eq!(dec.relation_type(2, 3).unwrap().as_deref(), Some("write"));
    assert_eq!(dec.relation_type(1, 3).unwrap(), None);
}

#[test]
fn test_unknown_identifier_is_empty() {
    let dec = decoder();
    assert!(dec.get_metadata("nope").unwrap().is_empty());
    assert_eq!(dec.metadata_by_id(1_000_000).unwrap(), None);
}

#[test]
fn test_self_relative_uses_defaults() {
    let options = MetadataOptions {
        date_layout: DateLayout::None,
        ..Default::default()
    };
    let enc = MetadataEncoder::new(dictionaries(), options, 6)
        .default_node(EntrySpec::new("entity").encoded("cf:mode", "0600"))
        .node(EntrySpec::new("entity").relative(0).equal("cf:mode"))
        .node(EntrySpec::new("entity"))
        .node(EntrySpec::new("entity"))
        .node(EntrySpec::new("entity"))
        .node(EntrySpec::new("entity"))
        .node(EntrySpec::new("entity"));
    let dec = decoder_with(&enc, options).unwrap();
    assert_eq!(
        dec.get_metadata(IDENTIFIERS[0]).unwrap(),
        record(&[("typ", "entity"), ("cf:mode", "0600")])
    );
}

#[test]
fn test_relative_cycle_is_corrupt() {
    let options = MetadataOptions {
        date_layout: DateLayout::None,
        ..Default::default()
    };
    let enc = MetadataEncoder::new(dictionaries(), options, 6)
        .node(EntrySpec::new("entity").relative(1).equal("cf:mode"))
        .node(EntrySpec::new("entity").relative(0).equal("cf:mode"))
        .node(EntrySpec::new("entity"))
        .node(EntrySpec::new("entity"))
        .node(EntrySpec::new("entity"))
        .node(EntrySpec::new("entity"));
    let dec = decoder_with(&enc, options).unwrap();
    assert!(matches!(
        dec.get_metadata(IDENTIFIERS[0]),
        Err(DecodeError::CorruptEncoding(_))
    ));
    // node 2 has no relative and still decodes
    assert!(dec.get_metadata(IDENTIFIERS[2]).is_ok());
}

#[test]
fn test_layout_without_dates() {
    let options = MetadataOptions {
        date_layout: DateLayout::None,
        ..Default::default()
    };
    let dec = decoder_with(&encoder(options), options).unwrap();
    let v1 = dec.get_metadata("file:passwd:v1").unwrap();
    assert!(!v1.contains_key("cf:date"));
    assert_eq!(v1["cf:mode"], "0644");
}

#[test]
fn test_seconds_layout_has_no_fraction() {
    let options = MetadataOptions {
        date_layout: DateLayout::Seconds,
        ..Default::default()
    };
    let dec = decoder_with(&encoder(options), options).unwrap();
    assert_eq!(
        dec.get_metadata("task:cat").unwrap()["cf:date"],
        "2023:01:02T03:04:05"
    );
}

#[test]
fn test_common_string_section() {
    let options = MetadataOptions {
        date_layout: DateLayout::Seconds,
        common_strings: true,
        ..Default::default()
    };
    let spec = dictionaries().with_common_strings(&["true", "mmap_read", "/etc/passwd"]);
    let mut enc = MetadataEncoder::new(spec.clone(), options, 6)
        .default_date(&[2023, 1, 2, 3, 4, 5])
        .default_node(EntrySpec::new("entity").common("cf:mode", "true"))
        .node(
            EntrySpec::new("entity")
                .encoded("cf:type", "file_name")
                .common("cf:id", "/etc/passwd")
                .date(5, 9),
        );
    for _ in 1..6 {
        enc = enc.node(EntrySpec::new("entity").equal("cf:mode"));
    }
    let enc = enc.relation(1, 3, EntrySpec::new("used").common("cf:type", "mmap_read"));

    let (bin, txt) = spec.common_strings_files().unwrap();
    let common = crate::dictionary::Dictionary::common_strings(&bin, &txt).unwrap();
    let table = IdentifierTable::parse(&encode_identifiers(6, &IDENTIFIERS[..7])).unwrap();
    let dicts = Dictionaries::parse(&spec.to_text(), options.width_rule)
        .unwrap()
        .with_common_strings(common);
    let dec = MetadataDecoder::load(table, dicts, enc.encode().unwrap(), options).unwrap();

    assert_eq!(
        dec.get_metadata("path:/etc/passwd").unwrap(),
        record(&[
            ("typ", "entity"),
            ("cf:type", "file_name"),
            ("cf:id", "/etc/passwd"),
            ("cf:date", "2023:01:02T03:04:09"),
        ])
    );
    assert_eq!(dec.get_metadata("file:passwd:v1").unwrap()["cf:mode"], "true");
    assert_eq!(dec.get_metadata("rel:used:passwd").unwrap()["cf:type"], "mmap_read");
}

#[test]
fn test_common_strings_need_their_table() {
    let options = MetadataOptions {
        common_strings: true,
        ..Default::default()
    };
    let table = IdentifierTable::parse(&encode_identifiers(6, IDENTIFIERS)).unwrap();
    let dicts = Dictionaries::parse(&dictionaries().to_text(), options.width_rule).unwrap();
    let err = MetadataDecoder::load(table, dicts, encoder(options).encode().unwrap(), options)
        .unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_bit_length_widths() {
    let options = MetadataOptions {
        width_rule: WidthRule::BitLength,
        ..Default::default()
    };
    let dec = decoder_with(&encoder(options), options).unwrap();
    assert_eq!(dec.context().relation_space().id_bits(), 3);
    assert_eq!(
        dec.get_metadata("rel:named:shadow").unwrap()["cf:sender"],
        "path:/etc/shadow"
    );
}

#[test]
fn test_total_size_mismatch() {
    let options = MetadataOptions::default();
    let mut blob = encoder(options).encode().unwrap();
    // claim one more bit than the records fill
    let total = u32::from_be_bytes([blob[0], blob[1], blob[2], blob[3]]) + 1;
    blob[..4].copy_from_slice(&total.to_be_bytes());
    blob.push(0);
    let table = IdentifierTable::parse(&encode_identifiers(6, IDENTIFIERS)).unwrap();
    let dicts = Dictionaries::parse(&dictionaries().to_text(), options.width_rule).unwrap();
    let err = MetadataDecoder::load(table, dicts, blob, options).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_unknown_dictionary_code() {
    let dicts = Dictionaries::parse(&dictionaries().to_text(), WidthRule::CeilLog2).unwrap();
    assert!(matches!(
        dicts.value.decode(7),
        Err(DecodeError::UnknownCode { code: 7, .. })
    ));
}
