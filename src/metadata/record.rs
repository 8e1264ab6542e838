//! Raw metadata record layout
//!
//! ```text
//! [typ: typ_bits]            (absent in default records)
//! [equal count][encoded count][common count][other count][date diff count]
//!                            key_bits each
//! equal keys                 key_bits
//! encoded pairs              key_bits + val_bits
//! common-string pairs        key_bits + COMMON_STRING_BITS
//! other values               key_bits + 10-bit length + length bits
//! date diffs                 date_index_bits + field width
//! ```
//!
//! The common count and section exist only in encodings with a common-strings
//! table; the date diff count and section only when the date layout has fields.
//! `read` and `skip` must consume the same number of bits for every record;
//! the offset index depends on it.

use crate::bits::{BitCursor, WidthRule};
use crate::dictionary::{Dictionaries, COMMON_STRING_BITS};
use crate::error::{DecodeError, DecodeResult};

use super::date::DateLayout;

/// Width of the bit-length prefix of a free-text value
pub const MAX_STRING_SIZE_BITS: u32 = 10;

/// Field widths shared by every record of one blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub key_bits: u32,
    pub val_bits: u32,
    pub typ_bits: u32,
    pub date: DateLayout,
    pub date_index_bits: u32,
    pub common_strings: bool,
}

impl RecordLayout {
    pub fn new(
        dicts: &Dictionaries,
        date: DateLayout,
        rule: WidthRule,
        common_strings: bool,
    ) -> Self {
        let date_index_bits = if date.has_dates() {
            rule.bits_for(date.field_count() as u64)
        } else {
            0
        };
        Self {
            key_bits: dicts.key_bits(),
            val_bits: dicts.val_bits(),
            typ_bits: dicts.typ_bits(),
            date,
            date_index_bits,
            common_strings,
        }
    }

    fn date_field_bits(&self, index: usize) -> DecodeResult<u32> {
        self.date
            .field_bits()
            .get(index)
            .copied()
            .ok_or_else(|| DecodeError::corrupt(format!("date field index {} out of range", index)))
    }
}

/// One record with codes still undecoded
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub typ: Option<u64>,
    pub equal: Vec<u64>,
    pub encoded: Vec<(u64, u64)>,
    pub common: Vec<(u64, u64)>,
    pub other: Vec<(u64, Vec<u8>)>,
    pub dates: Vec<(usize, u64)>,
}

struct Counts {
    equal: usize,
    encoded: usize,
    common: usize,
    other: usize,
    dates: usize,
}

fn read_counts<B: AsRef<[u8]>>(
    cursor: &mut BitCursor<'_, B>,
    layout: &RecordLayout,
) -> DecodeResult<Counts> {
    let equal = cursor.take::<usize>(layout.key_bits)?;
    let encoded = cursor.take::<usize>(layout.key_bits)?;
    let common = if layout.common_strings {
        cursor.take::<usize>(layout.key_bits)?
    } else {
        0
    };
    let other = cursor.take::<usize>(layout.key_bits)?;
    let dates = if layout.date.has_dates() {
        cursor.take::<usize>(layout.key_bits)?
    } else {
        0
    };
    Ok(Counts {
        equal,
        encoded,
        common,
        other,
        dates,
    })
}

impl RawRecord {
    pub fn read<B: AsRef<[u8]>>(
        cursor: &mut BitCursor<'_, B>,
        layout: &RecordLayout,
        with_typ: bool,
    ) -> DecodeResult<Self> {
        let typ = if with_typ {
            Some(cursor.take::<u64>(layout.typ_bits)?)
        } else {
            None
        };
        let counts = read_counts(cursor, layout)?;

        let equal = (0..counts.equal)
            .map(|_| cursor.take::<u64>(layout.key_bits))
            .collect::<DecodeResult<Vec<_>>>()?;

        let mut encoded = Vec::with_capacity(counts.encoded);
        for _ in 0..counts.encoded {
            let key = cursor.take::<u64>(layout.key_bits)?;
            let value = cursor.take::<u64>(layout.val_bits)?;
            encoded.push((key, value));
        }

        let mut common = Vec::with_capacity(counts.common);
        for _ in 0..counts.common {
            let key = cursor.take::<u64>(layout.key_bits)?;
            let value = cursor.take::<u64>(COMMON_STRING_BITS)?;
            common.push((key, value));
        }

        let mut other = Vec::with_capacity(counts.other);
        for _ in 0..counts.other {
            let key = cursor.take::<u64>(layout.key_bits)?;
            let len = cursor.take::<u64>(MAX_STRING_SIZE_BITS)?;
            other.push((key, cursor.take_bytes(len)?));
        }

        let mut dates = Vec::with_capacity(counts.dates);
        for _ in 0..counts.dates {
            let index = cursor.take::<usize>(layout.date_index_bits)?;
            let bits = layout.date_field_bits(index)?;
            dates.push((index, cursor.take::<u64>(bits)?));
        }

        Ok(Self {
            typ,
            equal,
            encoded,
            common,
            other,
            dates,
        })
    }

    /// Advance past one record without materializing it
    pub fn skip<B: AsRef<[u8]>>(
        cursor: &mut BitCursor<'_, B>,
        layout: &RecordLayout,
        with_typ: bool,
    ) -> DecodeResult<()> {
        if with_typ {
            cursor.skip(layout.typ_bits as u64)?;
        }
        let counts = read_counts(cursor, layout)?;
        cursor.skip(counts.equal as u64 * layout.key_bits as u64)?;
        cursor.skip(counts.encoded as u64 * (layout.key_bits + layout.val_bits) as u64)?;
        cursor.skip(counts.common as u64 * (layout.key_bits + COMMON_STRING_BITS) as u64)?;
        for _ in 0..counts.other {
            cursor.skip(layout.key_bits as u64)?;
            let len = cursor.take::<u64>(MAX_STRING_SIZE_BITS)?;
            if len % 8 != 0 {
                return Err(DecodeError::UnalignedRead { bits: len });
            }
            cursor.skip(len)?;
        }
        for _ in 0..counts.dates {
            let index = cursor.take::<usize>(layout.date_index_bits)?;
            cursor.skip(layout.date_field_bits(index)? as u64)?;
        }
        Ok(())
    }
}
