//! Delta-encoded edge lists
//!
//! ```text
//! [degree: degree_bits]
//! [first: delta_bits + 1]     zig-zag, relative to a base node id
//! [delta: delta_bits] * (degree - 1)
//! ```
//!
//! The first target is stored as `2*|d| + (d < 0)` where `d = target - base`;
//! later targets are unsigned gaps from the previous one, so lists are sorted.

use super::traits::NodeId;
use crate::bits::BitReader;
use crate::error::{DecodeError, DecodeResult};

/// Field widths of one edge-list flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeWidths {
    pub degree: u32,
    pub delta: u32,
}

impl EdgeWidths {
    pub(crate) fn validate(self) -> DecodeResult<Self> {
        if self.degree > 64 || self.delta >= 64 {
            return Err(DecodeError::corrupt(format!(
                "edge widths out of range (degree {}, delta {})",
                self.degree, self.delta
            )));
        }
        Ok(self)
    }

    /// Bits an edge list of `degree` entries occupies
    pub fn list_bits(self, degree: u64) -> u64 {
        if degree == 0 {
            self.degree as u64
        } else {
            (degree - 1)
                .saturating_mul(self.delta as u64)
                .saturating_add(self.degree as u64 + self.delta as u64 + 1)
        }
    }
}

/// Decode one edge list at `pos`; returns the targets and the end position
pub(crate) fn read_edge_list<B: AsRef<[u8]>>(
    reader: &BitReader<B>,
    pos: u64,
    widths: EdgeWidths,
    base: NodeId,
    node_count: u64,
) -> DecodeResult<(Vec<NodeId>, u64)> {
    let mut cursor = reader.cursor(pos);
    let degree = cursor.take::<u64>(widths.degree)?;
    if degree == 0 {
        return Ok((Vec::new(), cursor.position()));
    }
    // every entry costs at least one bit, so a degree past the buffer is corrupt
    if widths.list_bits(degree) > reader.len_bits().saturating_sub(pos) {
        return Err(DecodeError::OutOfRange {
            pos,
            bits: widths.list_bits(degree),
            len: reader.len_bits(),
        });
    }

    let zigzag = cursor.take::<u64>(widths.delta + 1)?;
    let magnitude = zigzag >> 1;
    let first = if zigzag & 1 == 1 {
        base.checked_sub(magnitude)
    } else {
        base.checked_add(magnitude)
    }
    .ok_or_else(|| DecodeError::corrupt(format!("edge delta {} overflows base {}", zigzag, base)))?;

    let mut targets = Vec::with_capacity(degree as usize);
    targets.push(first);
    let mut last = first;
    for _ in 1..degree {
        let gap = cursor.take::<u64>(widths.delta)?;
        last = last
            .checked_add(gap)
            .ok_or_else(|| DecodeError::corrupt("edge delta overflows"))?;
        targets.push(last);
    }

    if let Some(&bad) = targets.iter().find(|&&t| t >= node_count) {
        return Err(DecodeError::corrupt(format!(
            "edge target {} outside {} nodes (base {})",
            bad, node_count, base
        )));
    }
    Ok((targets, cursor.position()))
}

/// Position just past the edge list at `pos`, reading only its degree
pub(crate) fn edge_list_end<B: AsRef<[u8]>>(
    reader: &BitReader<B>,
    pos: u64,
    widths: EdgeWidths,
) -> DecodeResult<u64> {
    let degree = reader.read_uint::<u64>(widths.degree, pos)?;
    Ok(pos.saturating_add(widths.list_bits(degree)))
}

/// Encode `targets` (sorted ascending) against `base`
pub(crate) fn write_edge_list(
    w: &mut crate::bits::BitWriter,
    targets: &[NodeId],
    widths: EdgeWidths,
    base: NodeId,
) {
    w.push(targets.len() as u64, widths.degree);
    let Some((&first, rest)) = targets.split_first() else {
        return;
    };
    w.push(zigzag(first as i64 - base as i64), widths.delta + 1);
    let mut last = first;
    for &t in rest {
        w.push(t - last, widths.delta);
        last = t;
    }
}

#[inline]
pub(crate) fn zigzag(delta: i64) -> u64 {
    (delta.unsigned_abs() << 1) | (delta < 0) as u64
}
