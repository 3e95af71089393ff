// SPDX-License-Identifier: Apache-2.0

//! Portable lane vectors
//!
//! `Lanes<W>` holds `W` elements zero-extended to 32 bits. Every operation is a
//! fixed-trip-count loop over a stack array, which the compiler lowers to the
//! target's vector instructions. Predicates reduce to a `u64` bitmask with bit
//! `i` set for lane `i`, so `W` is capped at 64.

use crate::types::Stride;

/// Element `index` of a little-endian buffer, zero-extended.
#[inline(always)]
pub fn read_element(data: &[u8], stride: Stride, index: usize) -> u32 {
    match stride {
        Stride::S1 => data[index] as u32,
        Stride::S2 => {
            let p = index * 2;
            u16::from_le_bytes([data[p], data[p + 1]]) as u32
        }
        Stride::S4 => {
            let p = index * 4;
            u32::from_le_bytes([data[p], data[p + 1], data[p + 2], data[p + 3]])
        }
    }
}

/// Stores the low `stride` bytes of `value` at element `index`.
#[inline(always)]
pub fn write_element(data: &mut [u8], stride: Stride, index: usize, value: u32) {
    let p = index * stride.bytes();
    data[p..p + stride.bytes()].copy_from_slice(&value.to_le_bytes()[..stride.bytes()]);
}

/// Bitmask with the low `lanes` bits set.
#[inline(always)]
pub const fn lane_mask(lanes: usize) -> u64 {
    if lanes >= 64 {
        u64::MAX
    } else {
        (1u64 << lanes) - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lanes<const W: usize>(pub [u32; W]);

impl<const W: usize> Lanes<W> {
    #[inline(always)]
    pub fn splat(value: u32) -> Self {
        Self([value; W])
    }

    /// Loads elements `start..start + W`.
    #[inline(always)]
    pub fn load(data: &[u8], stride: Stride, start: usize) -> Self {
        let mut out = [0u32; W];
        let bytes = &data[start * stride.bytes()..(start + W) * stride.bytes()];
        match stride {
            Stride::S1 => {
                for (o, &b) in out.iter_mut().zip(bytes) {
                    *o = b as u32;
                }
            }
            Stride::S2 => {
                for (o, c) in out.iter_mut().zip(bytes.chunks_exact(2)) {
                    *o = u16::from_le_bytes([c[0], c[1]]) as u32;
                }
            }
            Stride::S4 => {
                for (o, c) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                    *o = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                }
            }
        }
        Self(out)
    }

    /// Loads elements `start - shift .. start - shift + W`, with lanes that
    /// fall before element 0 reading as zero.
    #[inline(always)]
    pub fn load_shifted(data: &[u8], stride: Stride, start: usize, shift: usize) -> Self {
        if start >= shift {
            return Self::load(data, stride, start - shift);
        }
        let mut out = [0u32; W];
        for (lane, o) in out.iter_mut().enumerate() {
            if start + lane >= shift {
                *o = read_element(data, stride, start + lane - shift);
            }
        }
        Self(out)
    }

    /// Stores every lane, truncated to `stride`, at elements `start..start + W`.
    #[inline(always)]
    pub fn store(&self, data: &mut [u8], stride: Stride, start: usize) {
        let bytes = &mut data[start * stride.bytes()..(start + W) * stride.bytes()];
        match stride {
            Stride::S1 => {
                for (b, &v) in bytes.iter_mut().zip(&self.0) {
                    *b = v as u8;
                }
            }
            Stride::S2 => {
                for (c, &v) in bytes.chunks_exact_mut(2).zip(&self.0) {
                    c.copy_from_slice(&(v as u16).to_le_bytes());
                }
            }
            Stride::S4 => {
                for (c, &v) in bytes.chunks_exact_mut(4).zip(&self.0) {
                    c.copy_from_slice(&v.to_le_bytes());
                }
            }
        }
    }

    #[inline(always)]
    pub fn map(self, f: impl Fn(u32) -> u32) -> Self {
        let mut out = self.0;
        for v in out.iter_mut() {
            *v = f(*v);
        }
        Self(out)
    }

    #[inline(always)]
    pub fn zip(self, other: Self, f: impl Fn(u32, u32) -> u32) -> Self {
        let mut out = self.0;
        for (v, &o) in out.iter_mut().zip(&other.0) {
            *v = f(*v, o);
        }
        Self(out)
    }

    #[inline(always)]
    pub fn or(self, other: Self) -> Self {
        self.zip(other, |a, b| a | b)
    }

    #[inline(always)]
    pub fn and(self, other: Self) -> Self {
        self.zip(other, |a, b| a & b)
    }

    #[inline(always)]
    pub fn min(self, other: Self) -> Self {
        self.zip(other, u32::min)
    }

    #[inline(always)]
    pub fn max(self, other: Self) -> Self {
        self.zip(other, u32::max)
    }

    /// Reduces a per-lane predicate to a bitmask.
    #[inline(always)]
    pub fn mask(&self, f: impl Fn(u32) -> bool) -> u64 {
        let mut m = 0u64;
        for (i, &v) in self.0.iter().enumerate() {
            m |= (f(v) as u64) << i;
        }
        m
    }

    #[inline(always)]
    pub fn eq_mask(&self, other: &Self) -> u64 {
        let mut m = 0u64;
        for (i, (&a, &b)) in self.0.iter().zip(&other.0).enumerate() {
            m |= ((a == b) as u64) << i;
        }
        m
    }

    /// Lanes where `value & bits != 0`.
    #[inline(always)]
    pub fn test_mask(&self, bits: u32) -> u64 {
        self.mask(|v| v & bits != 0)
    }

    #[inline(always)]
    pub fn reduce_or(&self) -> u32 {
        self.0.iter().fold(0, |acc, &v| acc | v)
    }

    #[inline(always)]
    pub fn wrapping_dot(&self, coefficients: &[u32; W]) -> u32 {
        let mut products = [0u32; W];
        for ((p, &v), &c) in products.iter_mut().zip(&self.0).zip(coefficients) {
            *p = v.wrapping_mul(c);
        }
        products.iter().fold(0u32, |acc, &p| acc.wrapping_add(p))
    }
}
