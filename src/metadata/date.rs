//! Delta-encoded timestamps
//!
//! The metadata header carries one default date vector. Each record lists
//! only the fields that differ from it as `(field index, value)` pairs.

use serde::{Deserialize, Serialize};

/// Field widths: year, month, day, hour, minute, second, fraction
const DATE_FIELD_BITS: [u32; 7] = [12, 4, 5, 5, 6, 6, 10];

/// Which date fields an encoding carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateLayout {
    /// Seven fields, the last one a sub-second fraction
    #[default]
    WithFraction,
    /// Six fields down to the second
    Seconds,
    /// No date section at all; records have three count fields
    None,
}

impl DateLayout {
    pub fn field_bits(self) -> &'static [u32] {
        match self {
            DateLayout::WithFraction => &DATE_FIELD_BITS,
            DateLayout::Seconds => &DATE_FIELD_BITS[..6],
            DateLayout::None => &[],
        }
    }

    pub fn field_count(self) -> usize {
        self.field_bits().len()
    }

    pub fn has_dates(self) -> bool {
        self != DateLayout::None
    }

    pub fn header_bits(self) -> u64 {
        self.field_bits().iter().map(|&b| b as u64).sum()
    }
}

/// Render a date vector as `YYYY:MM:DDTHH:MM:SS[.fraction]`
pub fn format_date(fields: &[u64]) -> String {
    let field = |i: usize| fields.get(i).copied().unwrap_or(0);
    let mut out = format!(
        "{:04}:{:02}:{:02}T{:02}:{:02}:{:02}",
        field(0),
        field(1),
        field(2),
        field(3),
        field(4),
        field(5)
    );
    if let Some(fraction) = fields.get(6) {
        out.push('.');
        out.push_str(&fraction.to_string());
    }
    out
}

/// Overlay `(index, value)` diffs onto the default vector
pub fn apply_diffs(defaults: &[u64], diffs: &[(usize, u64)]) -> Vec<u64> {
    let mut fields = defaults.to_vec();
    for &(index, value) in diffs {
        if let Some(slot) = fields.get_mut(index) {
            *slot = value;
        }
    }
    fields
}
