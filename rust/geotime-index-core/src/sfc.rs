//! Space-filling curves mapping cell coordinates to a single sortable key.
//!
//! Both curves produce a packed, big-endian bit string of
//! `dimensions * max(bits)` bits, zero-padded to whole bytes. Axes with fewer
//! bits than the widest axis are aligned by shifting their coordinate left, so
//! every axis spans the same curve extent.

use std::fmt;
use std::str::FromStr;

use geotime_common::{Result, error::Error};

/// Maximum bits of precision per dimension.
pub const MAX_BITS_PER_DIMENSION: u8 = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SfcType {
    Hilbert,
    ZOrder,
}

impl SfcType {
    pub const ALL: [SfcType; 2] = [SfcType::Hilbert, SfcType::ZOrder];

    pub fn name(self) -> &'static str {
        match self {
            SfcType::Hilbert => "HILBERT",
            SfcType::ZOrder => "ZORDER",
        }
    }

    /// Encodes one cell. `coords[d]` must be below `2^bits[d]`.
    pub fn encode(self, coords: &[u64], bits: &[u8]) -> Vec<u8> {
        debug_assert_eq!(coords.len(), bits.len());
        let width = bits.iter().copied().max().unwrap_or(0);
        let mut aligned = coords
            .iter()
            .zip(bits)
            .map(|(&c, &b)| if b == 0 { 0 } else { c << (width - b) })
            .collect::<Vec<_>>();
        if self == SfcType::Hilbert {
            axes_to_transpose(&mut aligned, width);
        }
        interleave(&aligned, width)
    }
}

impl fmt::Display for SfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SfcType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SfcType::ALL
            .into_iter()
            .find(|sfc| sfc.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::unknown_variant("a space-filling curve", s, SfcType::ALL.map(SfcType::name))
            })
    }
}

/// Converts axis coordinates into the transposed Hilbert index in place
/// (J. Skilling, "Programming the Hilbert curve", 2004).
fn axes_to_transpose(x: &mut [u64], bits: u8) {
    let n = x.len();
    if n == 0 || bits == 0 {
        return;
    }
    let m = 1u64 << (bits - 1);

    // Inverse undo.
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..n {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode.
    for i in 1..n {
        x[i] ^= x[i - 1];
    }
    let mut t = 0;
    let mut q = m;
    while q > 1 {
        if x[n - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for v in x.iter_mut() {
        *v ^= t;
    }
}

/// Packs the bits of `x` most significant first, cycling across the axes.
fn interleave(x: &[u64], bits: u8) -> Vec<u8> {
    let total = x.len() * bits as usize;
    let mut out = vec![0u8; total.div_ceil(8)];
    let mut pos = 0;
    for bit in (0..bits).rev() {
        for &v in x {
            if (v >> bit) & 1 == 1 {
                out[pos / 8] |= 0x80 >> (pos % 8);
            }
            pos += 1;
        }
    }
    out
}
