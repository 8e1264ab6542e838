//! Metadata blob writer

use super::DictionarySpec;
use crate::bits::BitWriter;
use crate::dictionary::{Dictionaries, COMMON_STRING_BITS};
use crate::error::{DecodeError, DecodeResult};
use crate::metadata::{MetadataOptions, RecordLayout, RelationIdSpace, RelationKind, MAX_STRING_SIZE_BITS};

/// One record described by names instead of codes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySpec {
    pub typ: String,
    pub equal: Vec<String>,
    pub encoded: Vec<(String, String)>,
    pub common: Vec<(String, String)>,
    pub other: Vec<(String, Vec<u8>)>,
    pub dates: Vec<(usize, u64)>,
}

impl EntrySpec {
    pub fn new(typ: &str) -> Self {
        Self {
            typ: typ.to_string(),
            ..Default::default()
        }
    }

    pub fn equal(mut self, key: &str) -> Self {
        self.equal.push(key.to_string());
        self
    }

    pub fn encoded(mut self, key: &str, value: &str) -> Self {
        self.encoded.push((key.to_string(), value.to_string()));
        self
    }

    /// Value taken from the common-string table
    pub fn common(mut self, key: &str, value: &str) -> Self {
        self.common.push((key.to_string(), value.to_string()));
        self
    }

    pub fn other(mut self, key: &str, value: impl AsRef<[u8]>) -> Self {
        self.other.push((key.to_string(), value.as_ref().to_vec()));
        self
    }

    pub fn date(mut self, index: usize, value: u64) -> Self {
        self.dates.push((index, value));
        self
    }

    /// Diff this node against another node instead of the default
    pub fn relative(self, node: u64) -> Self {
        self.other("@", node.to_string())
    }
}

/// Builds a metadata blob from record descriptions
#[derive(Debug, Clone)]
pub struct MetadataEncoder {
    dictionaries: DictionarySpec,
    options: MetadataOptions,
    num_nodes: u64,
    default_date: Vec<u64>,
    default_node: EntrySpec,
    default_relation: EntrySpec,
    nodes: Vec<EntrySpec>,
    relations: Vec<(u64, u64, EntrySpec)>,
}

fn check_fits(value: u64, bits: u32, what: &str) -> DecodeResult<()> {
    if bits < 64 && value >> bits != 0 {
        return Err(DecodeError::corrupt(format!(
            "{} {} does not fit in {} bits",
            what, value, bits
        )));
    }
    Ok(())
}

impl MetadataEncoder {
    pub fn new(dictionaries: DictionarySpec, options: MetadataOptions, num_nodes: u64) -> Self {
        Self {
            dictionaries,
            options,
            num_nodes,
            default_date: vec![0; options.date_layout.field_count()],
            default_node: EntrySpec::default(),
            default_relation: EntrySpec::default(),
            nodes: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn default_date(mut self, fields: &[u64]) -> Self {
        self.default_date = fields.to_vec();
        self
    }

    pub fn default_node(mut self, entry: EntrySpec) -> Self {
        self.default_node = entry;
        self
    }

    pub fn default_relation(mut self, entry: EntrySpec) -> Self {
        self.default_relation = entry;
        self
    }

    /// Next node record; nodes are written in call order as ids 0, 1, ...
    pub fn node(mut self, entry: EntrySpec) -> Self {
        self.nodes.push(entry);
        self
    }

    /// Relation behind graph edge `tail -> head`
    pub fn relation(mut self, head: u64, tail: u64, entry: EntrySpec) -> Self {
        self.relations.push((head, tail, entry));
        self
    }

    pub fn relation_space(&self) -> RelationIdSpace {
        RelationIdSpace::new(self.num_nodes, self.options.width_rule.bits_for(self.num_nodes))
    }

    pub fn encode(&self) -> DecodeResult<Vec<u8>> {
        if self.nodes.len() as u64 != self.num_nodes {
            return Err(DecodeError::corrupt(format!(
                "{} node records for {} nodes",
                self.nodes.len(),
                self.num_nodes
            )));
        }
        let parsed = Dictionaries::parse(&self.dictionaries.to_text(), self.options.width_rule)?;
        let layout = RecordLayout::new(
            &parsed,
            self.options.date_layout,
            self.options.width_rule,
            self.options.common_strings,
        );
        let space = self.relation_space();

        let mut body = BitWriter::new();
        let field_bits = layout.date.field_bits();
        if self.default_date.len() != field_bits.len() {
            return Err(DecodeError::corrupt("default date has the wrong field count"));
        }
        for (&value, &bits) in self.default_date.iter().zip(field_bits) {
            check_fits(value, bits, "default date field")?;
            body.push(value, bits);
        }
        self.write_entry(&mut body, &layout, &self.default_node, false, None)?;
        self.write_entry(&mut body, &layout, &self.default_relation, true, None)?;

        for node in &self.nodes {
            let is_relation = RelationKind::from_type(&node.typ).is_some();
            self.write_entry(&mut body, &layout, node, is_relation, Some(&node.typ))?;
        }
        for (head, tail, entry) in &self.relations {
            let packed = space.packed(*head, *tail).ok_or_else(|| {
                DecodeError::corrupt(format!("relation endpoints ({}, {}) are not nodes", head, tail))
            })?;
            check_fits(packed, space.field_bits(), "relation endpoints")?;
            body.push(packed, space.field_bits());
            let is_relation = RelationKind::from_type(&entry.typ).is_some();
            self.write_entry(&mut body, &layout, entry, is_relation, Some(&entry.typ))?;
        }

        let mut out = BitWriter::new();
        out.push(body.len_bits() + 32, 32);
        out.append(&body);
        Ok(out.into_bytes())
    }

    fn write_entry(
        &self,
        w: &mut BitWriter,
        layout: &RecordLayout,
        entry: &EntrySpec,
        is_relation: bool,
        typ: Option<&str>,
    ) -> DecodeResult<()> {
        let dicts = &self.dictionaries;
        if let Some(typ) = typ {
            w.push(DictionarySpec::code(&dicts.typ, "type", typ)?, layout.typ_bits);
        }

        let mut counts = vec![entry.equal.len(), entry.encoded.len()];
        if layout.common_strings {
            counts.push(entry.common.len());
        } else if !entry.common.is_empty() {
            return Err(DecodeError::corrupt("common strings without a common-string section"));
        }
        counts.push(entry.other.len());
        if layout.date.has_dates() {
            counts.push(entry.dates.len());
        } else if !entry.dates.is_empty() {
            return Err(DecodeError::corrupt("date diffs without a date layout"));
        }
        for count in counts {
            check_fits(count as u64, layout.key_bits, "key count")?;
            w.push(count as u64, layout.key_bits);
        }

        for key in &entry.equal {
            w.push(DictionarySpec::code(&dicts.key, "key", key)?, layout.key_bits);
        }
        for (key, value) in &entry.encoded {
            w.push(DictionarySpec::code(&dicts.key, "key", key)?, layout.key_bits);
            let code = if key == "cf:type" && !is_relation {
                DictionarySpec::code(&dicts.node_type, "node-type", value)?
            } else {
                DictionarySpec::code(&dicts.value, "value", value)?
            };
            w.push(code, layout.val_bits);
        }
        for (key, value) in &entry.common {
            w.push(DictionarySpec::code(&dicts.key, "key", key)?, layout.key_bits);
            w.push(
                DictionarySpec::code(&dicts.common, "common-string", value)?,
                COMMON_STRING_BITS,
            );
        }
        for (key, value) in &entry.other {
            w.push(DictionarySpec::code(&dicts.key, "key", key)?, layout.key_bits);
            let bits = value.len() as u64 * 8;
            check_fits(bits, MAX_STRING_SIZE_BITS, "string length")?;
            w.push(bits, MAX_STRING_SIZE_BITS);
            w.push_bytes(value);
        }
        let field_bits = layout.date.field_bits();
        for &(index, value) in &entry.dates {
            let bits = *field_bits
                .get(index)
                .ok_or_else(|| DecodeError::corrupt(format!("date index {} out of range", index)))?;
            check_fits(value, bits, "date field")?;
            w.push(index as u64, layout.date_index_bits);
            w.push(value, bits);
        }
        Ok(())
    }
}
