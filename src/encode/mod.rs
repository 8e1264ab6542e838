//! Writers for the encoded formats
//!
//! The production inputs come from an offline compressor; these writers
//! produce bit-identical inputs from an explicit description so fixtures,
//! benchmarks and synthetic corpora don't need the compressor.

mod graph;
mod metadata;

pub use graph::{encode_delta_graph, GroupedGraphEncoder};
pub use metadata::{EntrySpec, MetadataEncoder};

use crate::bits::BitWriter;
use crate::dictionary::{COMMON_STRING_BITS, MAX_COMMON_STRINGS};
use crate::error::{DecodeError, DecodeResult};

/// Name lists of the five dictionaries; an entry's code is its position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionarySpec {
    pub key: Vec<String>,
    pub value: Vec<String>,
    pub label: Vec<String>,
    pub typ: Vec<String>,
    pub node_type: Vec<String>,
    /// Common-string table, written as its own file pair
    pub common: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl DictionarySpec {
    pub fn new(
        key: &[&str],
        value: &[&str],
        label: &[&str],
        typ: &[&str],
        node_type: &[&str],
    ) -> Self {
        Self {
            key: owned(key),
            value: owned(value),
            label: owned(label),
            typ: owned(typ),
            node_type: owned(node_type),
            common: Vec::new(),
        }
    }

    pub fn with_common_strings(mut self, names: &[&str]) -> Self {
        self.common = owned(names);
        self
    }

    /// Render the common-string table as its (`.bin`, `.txt`) file contents
    pub fn common_strings_files(&self) -> DecodeResult<(Vec<u8>, String)> {
        if self.common.len() > MAX_COMMON_STRINGS {
            return Err(DecodeError::corrupt(format!(
                "{} common strings, at most {} allowed",
                self.common.len(),
                MAX_COMMON_STRINGS
            )));
        }
        let mut codes = BitWriter::new();
        for code in 0..self.common.len() {
            codes.push(code as u64, COMMON_STRING_BITS);
        }
        Ok((codes.into_bytes(), self.common.join(",")))
    }

    /// Render as the dictionaries file text
    pub fn to_text(&self) -> String {
        [&self.key, &self.value, &self.label, &self.typ, &self.node_type]
            .iter()
            .map(|names| {
                let entries: Vec<String> = names
                    .iter()
                    .enumerate()
                    .map(|(code, name)| format!("'{}': '{:b}'", name.replace('\'', "\\'"), code))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            })
            .collect()
    }

    pub(crate) fn code(names: &[String], dictionary: &'static str, name: &str) -> DecodeResult<u64> {
        names
            .iter()
            .position(|n| n == name)
            .map(|p| p as u64)
            .ok_or_else(|| {
                DecodeError::corrupt(format!("'{}' missing from the {} dictionary", name, dictionary))
            })
    }
}

/// Identifiers file: big-endian node count, then comma-terminated identifiers
pub fn encode_identifiers<S: AsRef<str>>(num_nodes: u32, identifiers: &[S]) -> Vec<u8> {
    let mut out = num_nodes.to_be_bytes().to_vec();
    for identifier in identifiers {
        out.extend_from_slice(identifier.as_ref().as_bytes());
        out.push(b',');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::WidthRule;
    use crate::dictionary::Dictionaries;
    use crate::identifiers::IdentifierTable;

    #[test]
    fn test_dictionary_text_parses_back() {
        let spec = DictionarySpec::new(
            &["cf:id", "cf:type"],
            &["file", "task", "o'clock"],
            &["[file]"],
            &["entity", "activity", "used"],
            &["file", "task", "file_name"],
        );
        let dicts = Dictionaries::parse(&spec.to_text(), WidthRule::CeilLog2).unwrap();
        assert_eq!(dicts.key.get(1), Some("cf:type"));
        assert_eq!(dicts.value.get(2), Some("o'clock"));
        assert_eq!(dicts.typ.get(2), Some("used"));
        assert_eq!(dicts.label.len(), 1);
    }

    #[test]
    fn test_common_strings_parse_back() {
        let spec = DictionarySpec::default().with_common_strings(&["true", "mmap_read", "file_name"]);
        let (bin, txt) = spec.common_strings_files().unwrap();
        let common = crate::dictionary::Dictionary::common_strings(&bin, &txt).unwrap();
        assert_eq!(common.get(1), Some("mmap_read"));
        assert_eq!(common.len(), 3);
    }

    #[test]
    fn test_identifiers_parse_back() {
        let bytes = encode_identifiers(2, &["a", "b", "r"]);
        let table = IdentifierTable::parse(&bytes).unwrap();
        assert_eq!(table.num_nodes(), 2);
        assert_eq!(table.relation_count(), 1);
    }
}
