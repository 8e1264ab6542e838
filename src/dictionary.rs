//! Code dictionaries
//!
//! The dictionaries file holds five groups shaped like a Python dict repr,
//! one after another:
//!
//! ```text
//! {'cf:id': '000', 'cf:type': '001'}{'file': '00', ...}{...}{...}{1: '0', 2: '1'}
//! ```
//!
//! Each entry maps a name to its code written as a binary string. Groups come
//! in a fixed order: key, value, prov-label, type, node-type.
//!
//! Encodings with a common-strings section carry one more table in a file
//! pair: `<name>.txt` lists the strings comma-separated and `<name>.bin`
//! holds their codes, `COMMON_STRING_BITS` each, in the same order.

use crate::bits::{BitReader, WidthRule};
use crate::error::{DecodeError, DecodeResult};
use rustc_hash::FxHashMap;
use std::iter::Peekable;
use std::str::Chars;
use tracing::debug;

pub const DICTIONARY_ORDER: [&str; 5] = ["key", "value", "label", "type", "node-type"];

/// Most entries a common-strings table may hold
pub const MAX_COMMON_STRINGS: usize = 300;
/// Width of a common-string code, wide enough for `MAX_COMMON_STRINGS`
pub const COMMON_STRING_BITS: u32 = 9;

/// One code -> string table with its fixed code width
#[derive(Debug, Clone)]
pub struct Dictionary {
    name: &'static str,
    entries: FxHashMap<u64, String>,
    code_bits: u32,
}

impl Dictionary {
    fn build(name: &'static str, pairs: Vec<(String, String)>, rule: WidthRule) -> DecodeResult<Self> {
        let mut entries = FxHashMap::default();
        for (entry_name, code) in pairs {
            let code = parse_binary_code(&code).ok_or_else(|| {
                DecodeError::MalformedDictionary(format!(
                    "{} dictionary: '{}' has non-binary code '{}'",
                    name, entry_name, code
                ))
            })?;
            if entries.insert(code, entry_name.clone()).is_some() {
                return Err(DecodeError::MalformedDictionary(format!(
                    "{} dictionary: code {} assigned twice (at '{}')",
                    name, code, entry_name
                )));
            }
        }
        let code_bits = rule.bits_for(entries.len() as u64);
        Ok(Self {
            name,
            entries,
            code_bits,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn code_bits(&self) -> u32 {
        self.code_bits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, code: u64) -> Option<&str> {
        self.entries.get(&code).map(String::as_str)
    }

    /// Like [`get`](Self::get) but a missing code is an error
    pub fn decode(&self, code: u64) -> DecodeResult<&str> {
        self.get(code).ok_or(DecodeError::UnknownCode {
            dictionary: self.name,
            code,
        })
    }

    /// Build the common-strings table from its `.bin` codes and `.txt` names
    pub fn common_strings(codes: &[u8], names: &str) -> DecodeResult<Self> {
        let names: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if names.len() > MAX_COMMON_STRINGS {
            return Err(malformed(format!(
                "{} common strings, at most {} allowed",
                names.len(),
                MAX_COMMON_STRINGS
            )));
        }
        let reader = BitReader::new(codes);
        let mut entries = FxHashMap::default();
        for (i, name) in names.into_iter().enumerate() {
            let pos = i as u64 * COMMON_STRING_BITS as u64;
            let code = reader.read_uint::<u64>(COMMON_STRING_BITS, pos)?;
            if entries.insert(code, name.to_string()).is_some() {
                return Err(malformed(format!(
                    "common-string dictionary: code {} assigned twice (at '{}')",
                    code, name
                )));
            }
        }
        debug!("Loaded {} common strings", entries.len());
        Ok(Self {
            name: "common-string",
            entries,
            code_bits: COMMON_STRING_BITS,
        })
    }

    /// Reverse lookup; linear, only used off the hot path
    pub fn code_of(&self, value: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(_, name)| name.as_str() == value)
            .map(|(code, _)| *code)
    }
}

/// The five dictionaries of one encoding
#[derive(Debug, Clone)]
pub struct Dictionaries {
    pub key: Dictionary,
    pub value: Dictionary,
    pub label: Dictionary,
    pub typ: Dictionary,
    pub node_type: Dictionary,
    /// Present only for encodings with a common-strings section
    pub common: Option<Dictionary>,
}

impl Dictionaries {
    pub fn parse(text: &str, rule: WidthRule) -> DecodeResult<Self> {
        let mut groups = parse_groups(text)?;
        if groups.len() != DICTIONARY_ORDER.len() {
            return Err(DecodeError::DictionaryCount {
                expected: DICTIONARY_ORDER.len(),
                found: groups.len(),
            });
        }
        let mut take = |i: usize| Dictionary::build(DICTIONARY_ORDER[i], std::mem::take(&mut groups[i]), rule);
        let dicts = Self {
            key: take(0)?,
            value: take(1)?,
            label: take(2)?,
            typ: take(3)?,
            node_type: take(4)?,
            common: None,
        };
        debug!(
            "Loaded dictionaries: {} keys ({} bits), {} values ({} bits), {} labels, {} types ({} bits), {} node types ({} bits)",
            dicts.key.len(),
            dicts.key.code_bits(),
            dicts.value.len(),
            dicts.value.code_bits(),
            dicts.label.len(),
            dicts.typ.len(),
            dicts.typ.code_bits(),
            dicts.node_type.len(),
            dicts.node_type.code_bits(),
        );
        Ok(dicts)
    }

    pub fn with_common_strings(mut self, common: Dictionary) -> Self {
        self.common = Some(common);
        self
    }

    pub fn key_bits(&self) -> u32 {
        self.key.code_bits()
    }

    /// One value-code width serves both generic values and node types
    pub fn val_bits(&self) -> u32 {
        self.value.code_bits().max(self.node_type.code_bits())
    }

    pub fn typ_bits(&self) -> u32 {
        self.typ.code_bits()
    }

    /// Expand a leading prov-label code byte into its label text
    pub fn expand_label(&self, raw: &[u8]) -> String {
        match raw.split_first() {
            Some((&first, rest)) => match self.label.get(first as u64) {
                Some(label) => {
                    let mut out = String::with_capacity(label.len() + rest.len());
                    out.push_str(label);
                    out.push_str(&String::from_utf8_lossy(rest));
                    out
                }
                None => String::from_utf8_lossy(raw).into_owned(),
            },
            None => String::new(),
        }
    }
}

fn parse_binary_code(code: &str) -> Option<u64> {
    if code.is_empty() || code.len() > 64 || !code.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u64::from_str_radix(code, 2).ok()
}

fn malformed(msg: impl Into<String>) -> DecodeError {
    DecodeError::MalformedDictionary(msg.into())
}

/// Split the file into `{...}` groups of `(name, code)` string pairs.
/// Quoted names may contain any of `{},:`.
fn parse_groups(text: &str) -> DecodeResult<Vec<Vec<(String, String)>>> {
    let mut chars = text.chars().peekable();
    let mut groups = Vec::new();
    loop {
        skip_ws(&mut chars);
        match chars.next() {
            None => return Ok(groups),
            Some('{') => groups.push(parse_group(&mut chars)?),
            Some(c) => {
                return Err(malformed(format!(
                    "expected '{{' to open dictionary {}, found '{}'",
                    groups.len() + 1,
                    c
                )))
            }
        }
    }
}

fn parse_group(chars: &mut Peekable<Chars<'_>>) -> DecodeResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    loop {
        skip_ws(chars);
        if chars.peek() == Some(&'}') {
            chars.next();
            return Ok(entries);
        }
        let name = parse_token(chars)?;
        skip_ws(chars);
        if chars.next() != Some(':') {
            return Err(malformed(format!("entry '{}' has no ':' separator", name)));
        }
        let code = parse_token(chars)?;
        entries.push((name, code));
        skip_ws(chars);
        match chars.next() {
            Some(',') => continue,
            Some('}') => return Ok(entries),
            Some(c) => return Err(malformed(format!("unexpected '{}' after entry", c))),
            None => return Err(malformed("unterminated dictionary group")),
        }
    }
}

fn parse_token(chars: &mut Peekable<Chars<'_>>) -> DecodeResult<String> {
    skip_ws(chars);
    match chars.peek().copied() {
        Some(quote @ ('\'' | '"')) => {
            chars.next();
            let mut out = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => out.push(escaped),
                        None => return Err(malformed("dangling escape")),
                    },
                    Some(c) if c == quote => return Ok(out.trim().to_string()),
                    Some(c) => out.push(c),
                    None => return Err(malformed("unterminated quoted name")),
                }
            }
        }
        _ => {
            let mut out = String::new();
            while let Some(&c) = chars.peek() {
                if matches!(c, ',' | ':' | '}') {
                    break;
                }
                out.push(c);
                chars.next();
            }
            let out = out.trim();
            if out.is_empty() {
                return Err(malformed("empty dictionary token"));
            }
            Ok(out.to_string())
        }
    }
}

fn skip_ws(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}
