//! Metadata decoding
//!
//! The metadata blob stores every entity as a diff against a default record:
//!
//! ```text
//! [total_size: 32][default date][default node][default relation]
//! [node record] * num_nodes
//! ([endpoint pair: 2*id_bits][relation record]) * until total_size
//! ```
//!
//! Loading scans the blob once to build the `id -> bit offset` index; after
//! that, `get_metadata` decodes one record on demand. Node records may point
//! at a "relative" node (`@`) whose values replace their `=` placeholders.

mod date;
mod record;
mod relation;

pub use date::{format_date, DateLayout};
pub use record::{RawRecord, RecordLayout, MAX_STRING_SIZE_BITS};
pub use relation::{RelationIdSpace, RelationKind};

use crate::bits::{BitReader, WidthRule};
use crate::dictionary::Dictionaries;
use crate::error::{DecodeError, DecodeResult};
use crate::graph::EntityTypes;
use crate::identifiers::{EntityId, IdentifierIndex, IdentifierTable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

/// Decoded key/value record of one entity
pub type MetadataRecord = BTreeMap<String, String>;

/// Placeholder for "same as the relative (or default) record"
const EQUAL_SENTINEL: &str = "=";
/// Reserved key naming a node's relative
const RELATIVE_KEY: &str = "@";
const TYPE_KEY: &str = "typ";
const CF_TYPE_KEY: &str = "cf:type";
const DATE_KEY: &str = "cf:date";
const LABEL_KEY: &str = "prov:label";

/// Format options that cannot be inferred from the blob itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataOptions {
    pub date_layout: DateLayout,
    pub width_rule: WidthRule,
    /// Records carry a common-string section decoded through `Dictionaries::common`
    pub common_strings: bool,
}

/// Immutable state every record decode needs
#[derive(Debug)]
pub struct DecoderContext {
    dictionaries: Dictionaries,
    layout: RecordLayout,
    relation_space: RelationIdSpace,
    default_date: Vec<u64>,
    default_node: MetadataRecord,
    default_relation: MetadataRecord,
}

impl DecoderContext {
    pub fn dictionaries(&self) -> &Dictionaries {
        &self.dictionaries
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn relation_space(&self) -> &RelationIdSpace {
        &self.relation_space
    }

    pub fn default_node(&self) -> &MetadataRecord {
        &self.default_node
    }

    pub fn default_relation(&self) -> &MetadataRecord {
        &self.default_relation
    }

    pub fn default_date(&self) -> &[u64] {
        &self.default_date
    }

    fn key_name(&self, code: u64) -> DecodeResult<&str> {
        self.dictionaries.key.decode(code)
    }

    /// Decode the key/value sections of a record into `out`.
    ///
    /// Node `equal` keys become the `=` placeholder; relation ones resolve
    /// against the default relation record immediately.
    fn decode_fields(
        &self,
        raw: &RawRecord,
        is_relation: bool,
        out: &mut MetadataRecord,
    ) -> DecodeResult<()> {
        for &code in &raw.equal {
            let key = self.key_name(code)?;
            if is_relation {
                if let Some(value) = self.default_relation.get(key) {
                    out.insert(key.to_string(), value.clone());
                }
            } else {
                out.insert(key.to_string(), EQUAL_SENTINEL.to_string());
            }
        }

        for &(code, value) in &raw.encoded {
            let key = self.key_name(code)?;
            let dict = if key == CF_TYPE_KEY && !is_relation {
                &self.dictionaries.node_type
            } else {
                &self.dictionaries.value
            };
            out.insert(key.to_string(), dict.decode(value)?.to_string());
        }

        if !raw.common.is_empty() {
            let common = self.dictionaries.common.as_ref().ok_or_else(|| {
                DecodeError::corrupt("record holds common strings but no table is loaded")
            })?;
            for &(code, value) in &raw.common {
                let key = self.key_name(code)?;
                out.insert(key.to_string(), common.decode(value)?.to_string());
            }
        }

        for (code, bytes) in &raw.other {
            let key = self.key_name(*code)?;
            let value = if key == LABEL_KEY {
                self.dictionaries.expand_label(bytes)
            } else {
                String::from_utf8_lossy(bytes).into_owned()
            };
            out.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn decode_default(&self, raw: &RawRecord, is_relation: bool) -> DecodeResult<MetadataRecord> {
        if !raw.equal.is_empty() || !raw.dates.is_empty() {
            return Err(DecodeError::corrupt(
                "default record holds equal-to-default keys or date diffs",
            ));
        }
        let mut out = MetadataRecord::new();
        self.decode_fields(raw, is_relation, &mut out)?;
        Ok(out)
    }
}

/// Random-access decoder over one metadata blob
#[derive(Debug)]
pub struct MetadataDecoder<B = crate::blob::Blob> {
    context: DecoderContext,
    identifiers: IdentifierIndex,
    reader: BitReader<B>,
    node_offsets: Vec<u64>,
    relation_offsets: FxHashMap<EntityId, u64>,
}

impl<B: AsRef<[u8]>> MetadataDecoder<B> {
    /// Scan the blob, build the offset index and assign relation ids
    pub fn load(
        table: IdentifierTable,
        dictionaries: Dictionaries,
        blob: B,
        options: MetadataOptions,
    ) -> DecodeResult<Self> {
        if options.common_strings && dictionaries.common.is_none() {
            return Err(DecodeError::corrupt(
                "common-string encoding selected but no common-string table given",
            ));
        }
        let reader = BitReader::new(blob);
        let layout = RecordLayout::new(
            &dictionaries,
            options.date_layout,
            options.width_rule,
            options.common_strings,
        );
        let num_nodes = table.num_nodes();
        let relation_space =
            RelationIdSpace::new(num_nodes, options.width_rule.bits_for(num_nodes));

        let mut cursor = reader.cursor(0);
        let total_size = cursor.take::<u64>(32)?;
        let default_date = layout
            .date
            .field_bits()
            .iter()
            .map(|&bits| cursor.take::<u64>(bits))
            .collect::<DecodeResult<Vec<_>>>()?;
        let default_node_raw = RawRecord::read(&mut cursor, &layout, false)?;
        let default_relation_raw = RawRecord::read(&mut cursor, &layout, false)?;

        let mut context = DecoderContext {
            dictionaries,
            layout,
            relation_space,
            default_date,
            default_node: MetadataRecord::new(),
            default_relation: MetadataRecord::new(),
        };
        context.default_node = context.decode_default(&default_node_raw, false)?;
        context.default_relation = context.decode_default(&default_relation_raw, true)?;

        let mut node_offsets = Vec::with_capacity(num_nodes as usize);
        for _ in 0..num_nodes {
            node_offsets.push(cursor.position());
            RawRecord::skip(&mut cursor, &layout, true)?;
        }

        let mut relation_offsets = FxHashMap::default();
        let mut relation_ids = Vec::new();
        while cursor.position() < total_size {
            let packed = cursor.take::<u64>(relation_space.field_bits())?;
            let id = relation_space.from_packed(packed)?;
            if relation_offsets.insert(id, cursor.position()).is_some() {
                return Err(DecodeError::corrupt(format!(
                    "relation {} has two metadata records",
                    id
                )));
            }
            relation_ids.push(id);
            RawRecord::skip(&mut cursor, &layout, true)?;
        }
        if cursor.position() != total_size {
            return Err(DecodeError::SizeMismatch {
                expected: total_size,
                actual: cursor.position(),
            });
        }

        let identifiers = table.into_index(relation_ids)?;
        info!(
            "Indexed metadata: {} nodes, {} relations ({} bits)",
            node_offsets.len(),
            relation_offsets.len(),
            total_size
        );
        debug!(
            "Record widths: key {} val {} typ {} id {}",
            layout.key_bits,
            layout.val_bits,
            layout.typ_bits,
            relation_space.id_bits()
        );

        Ok(Self {
            context,
            identifiers,
            reader,
            node_offsets,
            relation_offsets,
        })
    }

    pub fn context(&self) -> &DecoderContext {
        &self.context
    }

    pub fn identifiers(&self) -> &IdentifierIndex {
        &self.identifiers
    }

    pub fn num_nodes(&self) -> u64 {
        self.identifiers.num_nodes()
    }

    pub fn num_relations(&self) -> usize {
        self.relation_offsets.len()
    }

    /// Bit offset of the record (past the relation id field, for relations)
    pub fn offset_of(&self, id: EntityId) -> Option<u64> {
        if id < self.num_nodes() {
            self.node_offsets.get(id as usize).copied()
        } else {
            self.relation_offsets.get(&id).copied()
        }
    }

    /// Metadata of an external identifier; empty if the identifier is unknown
    pub fn get_metadata(&self, identifier: &str) -> DecodeResult<MetadataRecord> {
        match self.identifiers.lookup(identifier) {
            Some(id) => Ok(self.metadata_by_id(id)?.unwrap_or_default()),
            None => {
                trace!("Unknown identifier {}", identifier);
                Ok(MetadataRecord::new())
            }
        }
    }

    /// Metadata of an internal id, `None` if no record exists for it
    pub fn metadata_by_id(&self, id: EntityId) -> DecodeResult<Option<MetadataRecord>> {
        if self.offset_of(id).is_none() {
            return Ok(None);
        }
        let mut chain = FxHashSet::default();
        self.decode_entity(id, &mut chain).map(Some)
    }

    /// Relation kind of a record, read without decoding its fields
    pub fn type_of(&self, id: EntityId) -> DecodeResult<Option<String>> {
        let Some(offset) = self.offset_of(id) else {
            return Ok(None);
        };
        let code = self.reader.read_uint::<u64>(self.context.layout.typ_bits, offset)?;
        Ok(Some(self.context.dictionaries.typ.decode(code)?.to_string()))
    }

    fn decode_entity(
        &self,
        id: EntityId,
        chain: &mut FxHashSet<EntityId>,
    ) -> DecodeResult<MetadataRecord> {
        if !chain.insert(id) {
            return Err(DecodeError::corrupt(format!(
                "relative chain loops back to entity {}",
                id
            )));
        }
        let offset = self
            .offset_of(id)
            .ok_or_else(|| DecodeError::corrupt(format!("entity {} has no metadata record", id)))?;

        let mut cursor = self.reader.cursor(offset);
        let raw = RawRecord::read(&mut cursor, &self.context.layout, true)?;
        let typ_code = raw.typ.unwrap_or_default();
        let typ = self.context.dictionaries.typ.decode(typ_code)?.to_string();
        let kind = RelationKind::from_type(&typ);

        let mut record = MetadataRecord::new();
        record.insert(TYPE_KEY.to_string(), typ);

        if let Some(kind) = kind {
            let (head, tail) = self.context.relation_space.endpoints(id)?;
            let (head_field, tail_field) = kind.endpoint_fields();
            record.insert(head_field.to_string(), self.node_identifier(head)?.to_string());
            record.insert(tail_field.to_string(), self.node_identifier(tail)?.to_string());
        }

        self.context
            .decode_fields(&raw, kind.is_some(), &mut record)?;

        if self.context.layout.date.has_dates() {
            let fields = date::apply_diffs(&self.context.default_date, &raw.dates);
            record.insert(DATE_KEY.to_string(), format_date(&fields));
        }

        if kind.is_some() {
            return Ok(record);
        }

        let relative = match record.remove(RELATIVE_KEY) {
            Some(value) if value != EQUAL_SENTINEL => self.parse_relative(id, &value)?,
            _ => None,
        };
        let relative_record = match relative {
            Some(rel) => Some(self.decode_entity(rel, chain)?),
            None => None,
        };
        let fallback = relative_record.as_ref().unwrap_or(&self.context.default_node);

        let pending: Vec<String> = record
            .iter()
            .filter(|(_, value)| value.as_str() == EQUAL_SENTINEL)
            .map(|(key, _)| key.clone())
            .collect();
        for key in pending {
            match fallback
                .get(&key)
                .or_else(|| self.context.default_node.get(&key))
            {
                Some(value) => {
                    record.insert(key, value.clone());
                }
                None => {
                    record.remove(&key);
                }
            }
        }
        Ok(record)
    }

    fn parse_relative(&self, id: EntityId, value: &str) -> DecodeResult<Option<EntityId>> {
        let relative: EntityId = value.trim().parse().map_err(|_| {
            DecodeError::corrupt(format!("entity {} has non-numeric relative '{}'", id, value))
        })?;
        if relative == id {
            return Ok(None);
        }
        if relative >= self.num_nodes() {
            return Err(DecodeError::corrupt(format!(
                "entity {} names relative {} outside the node range",
                id, relative
            )));
        }
        Ok(Some(relative))
    }

    fn node_identifier(&self, node: EntityId) -> DecodeResult<&str> {
        self.identifiers
            .identifier(node)
            .ok_or_else(|| DecodeError::corrupt(format!("node {} has no identifier", node)))
    }
}

impl<B: AsRef<[u8]>> EntityTypes for MetadataDecoder<B> {
    fn node_type(&self, node: EntityId) -> DecodeResult<Option<String>> {
        if node >= self.num_nodes() {
            return Ok(None);
        }
        Ok(self
            .metadata_by_id(node)?
            .and_then(|mut record| record.remove(CF_TYPE_KEY)))
    }

    fn relation_type(&self, source: EntityId, target: EntityId) -> DecodeResult<Option<String>> {
        let Some(id) = self.context.relation_space.relation_id(target, source) else {
            return Ok(None);
        };
        Ok(self
            .metadata_by_id(id)?
            .and_then(|mut record| record.remove(CF_TYPE_KEY)))
    }
}

#[cfg(test)]
pub(crate) mod tests;
