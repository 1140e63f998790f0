//! # Bitstring
//!
//! Ordered bit vector backing a status list. Bits are indexed from the most
//! significant bit of the first byte:
//!
//! ```text
//! | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | ...
//! | byte 0                        | byte 1 ...
//! ```
//!
//! Every bit starts at 0. The length only grows.

/// Grow-only, MSB-first bit vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitstring {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitstring {
    /// A bitstring of `len` zero bits.
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Wrap raw bytes; the length is `8 * bytes.len()`. A list encoded from a
    /// length that is not a multiple of 8 therefore decodes rounded up to the
    /// next whole byte, with the padding bits zero.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() * 8;
        Self { bytes, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The bit at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        let byte = self.bytes.get(index / 8)?;
        Some(byte & mask(index) != 0)
    }

    /// Set the bit at `index`. Returns `false` without changing anything if
    /// `index` is past the end.
    pub fn set(&mut self, index: usize, value: bool) -> bool {
        if index >= self.len {
            return false;
        }
        let Some(byte) = self.bytes.get_mut(index / 8) else {
            return false;
        };
        if value {
            *byte |= mask(index);
        } else {
            *byte &= !mask(index);
        }
        true
    }

    /// Extend to at least `len` bits. Never shrinks.
    pub fn grow_to(&mut self, len: usize) {
        if len > self.len {
            self.bytes.resize(len.div_ceil(8), 0);
            self.len = len;
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Fraction of bits that are set, 0.0 for an empty bitstring.
    pub fn density(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.count_ones() as f64 / self.len as f64
        }
    }
}

fn mask(index: usize) -> u8 {
    0x80 >> (index % 8)
}
