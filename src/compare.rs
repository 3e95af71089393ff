// SPDX-License-Identifier: Apache-2.0

//! Region equality and lexicographic comparison across strides.

use std::ops::ControlFlow;

use crate::cascade::{self, ChunkOp, TailMode, Widths};
use crate::types::{ArrayView, Stride};
use crate::vector::{lane_mask, read_element, Lanes};

/// Lane-wise `(a | mask) != b`, or `a != b` without a mask.
struct Mismatch<'a> {
    a: &'a [u8],
    a_stride: Stride,
    b: &'a [u8],
    b_stride: Stride,
    mask: Option<&'a [u8]>,
}

impl Mismatch<'_> {
    #[inline(always)]
    fn lanes<const W: usize>(&self, start: usize) -> u64 {
        let mut a = Lanes::<W>::load(self.a, self.a_stride, start);
        if let Some(mask) = self.mask {
            a = a.or(Lanes::load(mask, self.b_stride, start));
        }
        let b = Lanes::<W>::load(self.b, self.b_stride, start);
        !a.eq_mask(&b) & lane_mask(W)
    }

    #[inline(always)]
    fn pair(&self, index: usize) -> (u32, u32) {
        let mut a = read_element(self.a, self.a_stride, index);
        if let Some(mask) = self.mask {
            a |= read_element(mask, self.b_stride, index);
        }
        (a, read_element(self.b, self.b_stride, index))
    }
}

struct Equals<'a>(Mismatch<'a>);

impl ChunkOp for Equals<'_> {
    type Output = ();
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, _live: u64) -> ControlFlow<()> {
        if self.0.lanes::<W>(start) != 0 {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
        let (a, b) = self.0.pair(index);
        if a != b {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

struct FirstDifference<'a>(Mismatch<'a>);

impl ChunkOp for FirstDifference<'_> {
    type Output = i32;
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, _live: u64) -> ControlFlow<i32> {
        // lanes outside `live` already compared equal
        let diff = self.0.lanes::<W>(start);
        if diff != 0 {
            return self.scalar(start + diff.trailing_zeros() as usize);
        }
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<i32> {
        let (a, b) = self.0.pair(index);
        if a != b {
            return ControlFlow::Break((a as i32).wrapping_sub(b as i32));
        }
        ControlFlow::Continue(())
    }
}

/// `(a[i] | mask[i]) == b[i]` for every `i < len`. `mask` is read at `b`'s stride.
pub fn region_equals(a: &ArrayView, b: &ArrayView, mask: Option<&ArrayView>, len: usize, widths: Widths) -> bool {
    let mut op = Equals(Mismatch {
        a: a.data(),
        a_stride: a.stride(),
        b: b.data(),
        b_stride: b.stride(),
        mask: mask.map(|m| m.data()),
    });
    cascade::run(&mut op, 0, len, widths).is_continue()
}

/// Difference of the first unequal pair `a[i] - b[i]`, or `0`.
pub fn memcmp(a: &ArrayView, b: &ArrayView, len: usize, widths: Widths) -> i32 {
    let mut op = FirstDifference(Mismatch {
        a: a.data(),
        a_stride: a.stride(),
        b: b.data(),
        b_stride: b.stride(),
        mask: None,
    });
    match cascade::run(&mut op, 0, len, widths) {
        ControlFlow::Break(diff) => diff,
        ControlFlow::Continue(()) => 0,
    }
}

pub fn region_equals_scalar(a: &ArrayView, b: &ArrayView, mask: Option<&ArrayView>, len: usize) -> bool {
    (0..len).all(|i| a.get(i) | mask.map_or(0, |m| m.get(i)) == b.get(i))
}

pub fn memcmp_scalar(a: &ArrayView, b: &ArrayView, len: usize) -> i32 {
    (0..len)
        .map(|i| (a.get(i) as i32).wrapping_sub(b.get(i) as i32))
        .find(|&d| d != 0)
        .unwrap_or(0)
}
