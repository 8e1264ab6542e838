//! Bit-addressable reader and writer
//!
//! All encoded inputs are addressed by absolute bit offsets. Bit order is
//! MSB-first within each byte: bit 0 of a byte is its most significant bit,
//! so a value written across a byte boundary reads back in natural order.
//!
//! `BitReader` never clamps: any read that would run past the buffer end
//! fails with [`DecodeError::OutOfRange`].

use crate::error::{DecodeError, DecodeResult};
use serde::{Deserialize, Serialize};

/// Unsigned integer types `BitReader::read_uint` can produce
pub trait UnsignedBits: Copy {
    const BITS: u32;
    fn from_u64(value: u64) -> Self;
}

macro_rules! impl_unsigned_bits {
    ($($t:ty),*) => {
        $(
            impl UnsignedBits for $t {
                const BITS: u32 = <$t>::BITS;
                #[inline]
                fn from_u64(value: u64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_unsigned_bits!(u8, u16, u32, u64, usize);

/// Read-only view over a byte buffer at bit granularity
#[derive(Debug, Clone)]
pub struct BitReader<B = Vec<u8>> {
    bytes: B,
}

impl<B: AsRef<[u8]>> BitReader<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    /// Total addressable bits
    #[inline]
    pub fn len_bits(&self) -> u64 {
        self.bytes.as_ref().len() as u64 * 8
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    fn check_range(&self, pos: u64, bits: u64) -> DecodeResult<()> {
        let len = self.len_bits();
        match pos.checked_add(bits) {
            Some(end) if end <= len => Ok(()),
            _ => Err(DecodeError::OutOfRange { pos, bits, len }),
        }
    }

    #[inline]
    pub fn read_bit(&self, pos: u64) -> DecodeResult<bool> {
        self.check_range(pos, 1)?;
        let byte = self.bytes.as_ref()[(pos >> 3) as usize];
        Ok(byte & (0x80 >> (pos & 7)) != 0)
    }

    /// Read `num_bits` starting at `pos` as an unsigned integer.
    ///
    /// Fails if `num_bits` exceeds the width of `T`. Zero bits reads as 0.
    pub fn read_uint<T: UnsignedBits>(&self, num_bits: u32, pos: u64) -> DecodeResult<T> {
        if num_bits > T::BITS {
            return Err(DecodeError::WidthTooLarge {
                bits: num_bits,
                max: T::BITS,
            });
        }
        self.read_raw(num_bits, pos).map(T::from_u64)
    }

    fn read_raw(&self, num_bits: u32, pos: u64) -> DecodeResult<u64> {
        self.check_range(pos, num_bits as u64)?;
        let bytes = self.bytes.as_ref();
        let mut value: u64 = 0;
        let mut cur = pos;
        let mut remaining = num_bits;
        while remaining > 0 {
            let byte = bytes[(cur >> 3) as usize] as u64;
            let avail = 8 - (cur & 7) as u32;
            let take = avail.min(remaining);
            let chunk = (byte >> (avail - take)) & ((1u64 << take) - 1);
            value = (value << take) | chunk;
            cur += take as u64;
            remaining -= take;
        }
        Ok(value)
    }

    /// Read `num_bits` (a multiple of 8) as raw bytes
    pub fn read_bytes(&self, num_bits: u64, pos: u64) -> DecodeResult<Vec<u8>> {
        if num_bits % 8 != 0 {
            return Err(DecodeError::UnalignedRead { bits: num_bits });
        }
        self.check_range(pos, num_bits)?;
        let count = (num_bits / 8) as usize;
        if pos % 8 == 0 {
            let start = (pos / 8) as usize;
            return Ok(self.bytes.as_ref()[start..start + count].to_vec());
        }
        (0..count as u64)
            .map(|i| self.read_raw(8, pos + i * 8).map(|b| b as u8))
            .collect()
    }

    /// Sequential cursor starting at `pos`
    pub fn cursor(&self, pos: u64) -> BitCursor<'_, B> {
        BitCursor { reader: self, pos }
    }
}

/// Sequential reader that advances by exactly the bits it consumes
#[derive(Debug)]
pub struct BitCursor<'a, B> {
    reader: &'a BitReader<B>,
    pos: u64,
}

impl<'a, B: AsRef<[u8]>> BitCursor<'a, B> {
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    pub fn take<T: UnsignedBits>(&mut self, num_bits: u32) -> DecodeResult<T> {
        let value = self.reader.read_uint(num_bits, self.pos)?;
        self.pos += num_bits as u64;
        Ok(value)
    }

    pub fn take_bytes(&mut self, num_bits: u64) -> DecodeResult<Vec<u8>> {
        let value = self.reader.read_bytes(num_bits, self.pos)?;
        self.pos += num_bits;
        Ok(value)
    }

    /// Skip bits without reading them, still range-checked
    pub fn skip(&mut self, num_bits: u64) -> DecodeResult<()> {
        self.reader.check_range(self.pos, num_bits)?;
        self.pos += num_bits;
        Ok(())
    }

    /// Advance to the next byte boundary
    pub fn align_to_byte(&mut self) {
        self.pos = (self.pos + 7) & !7;
    }
}

/// MSB-first bit writer, the inverse of [`BitReader`]
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    len: u64,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len_bits(&self) -> u64 {
        self.len
    }

    pub fn push_bit(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Append the low `num_bits` of `value`, most significant first
    pub fn push(&mut self, value: u64, num_bits: u32) {
        debug_assert!(num_bits <= 64);
        for i in (0..num_bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b as u64, 8);
        }
    }

    /// Append every bit written to `other`
    pub fn append(&mut self, other: &BitWriter) {
        for i in 0..other.len {
            self.push_bit(other.bytes[(i >> 3) as usize] & (0x80 >> (i & 7)) != 0);
        }
    }

    /// Zero-pad to the next byte boundary
    pub fn align_to_byte(&mut self) {
        while self.len % 8 != 0 {
            self.push_bit(false);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// How a dictionary or id-space size turns into a fixed code width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidthRule {
    /// `max(1, ceil(log2(n)))`: the narrowest width that can address `n` codes
    #[default]
    CeilLog2,
    /// `floor(log2(max(n, 1))) + 1`: the bit length of `n` itself
    BitLength,
}

impl WidthRule {
    pub fn bits_for(self, n: u64) -> u32 {
        match self {
            WidthRule::CeilLog2 => ceil_log2(n).max(1),
            WidthRule::BitLength => bit_length(n.max(1)),
        }
    }
}

/// Bits needed to represent `n` itself
#[inline]
pub fn bit_length(n: u64) -> u32 {
    64 - n.leading_zeros()
}

#[inline]
pub fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        bit_length(n - 1)
    }
}
