// SPDX-License-Identifier: Apache-2.0

//! Vector cascade scaffold
//!
//! Every kernel walks its buffer the same way: full-width chunks over the bulk
//! of the range, then a tail handled either by one end-aligned chunk that
//! overlaps already processed elements, or by successively halved chunks, and
//! finally a scalar loop once the remainder is shorter than the minimum width.
//!
//! Chunks receive a `live` lane mask. Lanes outside it were already visited by
//! an earlier chunk; idempotent operations (copies, compares, range tests) may
//! ignore it, counting operations must not.

use std::ops::ControlFlow;

use crate::constants::{MAX_LANES, MIN_VECTOR_BYTES};
use crate::types::Stride;
use crate::vector::lane_mask;

/// How a [`ChunkOp`] wants the remainder after the bulk loop handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailMode {
    /// One end-aligned chunk re-reading earlier elements.
    Overlap,
    /// Non-overlapping, strictly in-order chunks of halving width.
    Sequential,
}

/// Per-chunk operation of a kernel.
pub trait ChunkOp {
    type Output;

    const TAIL: TailMode;

    /// Processes elements `start..start + W`. Bit `i` of `live` is set when
    /// element `start + i` has not been seen by a previous chunk.
    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<Self::Output>;

    fn scalar(&mut self, index: usize) -> ControlFlow<Self::Output>;
}

/// Lane counts one cascade run may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widths {
    max: usize,
    min: usize,
}

impl Widths {
    /// `max` and `min` are rounded down to powers of two and clamped to
    /// `1..=MAX_LANES`, with `min <= max`.
    pub fn new(max: usize, min: usize) -> Self {
        let max = floor_pow2(max.clamp(1, MAX_LANES));
        let min = floor_pow2(min.clamp(1, max));
        Self { max, min }
    }

    /// Widths for a register of `vector_bytes` bytes holding `stride`-byte elements.
    pub fn for_stride(vector_bytes: usize, stride: Stride) -> Self {
        let max = (vector_bytes >> stride.log2()).max(1);
        let min = (MIN_VECTOR_BYTES >> stride.log2()).max(1);
        Self::new(max, min)
    }

    #[inline(always)]
    pub fn max(&self) -> usize {
        self.max
    }

    #[inline(always)]
    pub fn min(&self) -> usize {
        self.min
    }
}

#[inline(always)]
fn floor_pow2(n: usize) -> usize {
    debug_assert!(n > 0);
    1 << (usize::BITS - 1 - n.leading_zeros())
}

/// Calls `op.vector::<W>` for a runtime width, one monomorphised body per
/// supported width.
macro_rules! dispatch_width {
    ($op:expr, $width:expr, $start:expr, $live:expr) => {
        match $width {
            64 => $op.vector::<64>($start, $live),
            32 => $op.vector::<32>($start, $live),
            16 => $op.vector::<16>($start, $live),
            8 => $op.vector::<8>($start, $live),
            4 => $op.vector::<4>($start, $live),
            2 => $op.vector::<2>($start, $live),
            1 => $op.vector::<1>($start, $live),
            w => unreachable!("unsupported vector width {}", w),
        }
    };
}

/// Visits every element of `begin..end` exactly once logically, front to back.
pub fn run<O: ChunkOp>(
    op: &mut O,
    begin: usize,
    end: usize,
    widths: Widths,
) -> ControlFlow<O::Output> {
    if end <= begin {
        return ControlFlow::Continue(());
    }
    match O::TAIL {
        TailMode::Overlap => run_overlap(op, begin, end, widths),
        TailMode::Sequential => run_sequential(op, begin, end, widths),
    }
}

fn run_overlap<O: ChunkOp>(
    op: &mut O,
    begin: usize,
    end: usize,
    widths: Widths,
) -> ControlFlow<O::Output> {
    let n = end - begin;
    let w = widths.max.min(floor_pow2(n));
    if w < widths.min {
        for i in begin..end {
            op.scalar(i)?;
        }
        return ControlFlow::Continue(());
    }

    // bulk
    let bulk = n & !(w - 1);
    let full = lane_mask(w);
    let mut pos = begin;
    while pos < begin + bulk {
        dispatch_width!(op, w, pos, full)?;
        pos += w;
    }

    // end-aligned tail, its first `w - rem` lanes were already covered
    let rem = n - bulk;
    if rem > 0 {
        dispatch_width!(op, w, end - w, full & !lane_mask(w - rem))?;
    }
    ControlFlow::Continue(())
}

fn run_sequential<O: ChunkOp>(
    op: &mut O,
    begin: usize,
    end: usize,
    widths: Widths,
) -> ControlFlow<O::Output> {
    let mut pos = begin;
    let mut w = widths.max;
    while w >= widths.min {
        let full = lane_mask(w);
        while end - pos >= w {
            dispatch_width!(op, w, pos, full)?;
            pos += w;
        }
        w >>= 1;
    }
    while pos < end {
        op.scalar(pos)?;
        pos += 1;
    }
    ControlFlow::Continue(())
}

/// Back-to-front walk of `begin..end` for the reverse searches. The head
/// chunk is anchored at `begin`; its live lanes are the low ones.
pub fn run_reverse<O: ChunkOp>(
    op: &mut O,
    begin: usize,
    end: usize,
    widths: Widths,
) -> ControlFlow<O::Output> {
    if end <= begin {
        return ControlFlow::Continue(());
    }
    let n = end - begin;
    let w = widths.max.min(floor_pow2(n));
    if w < widths.min {
        for i in (begin..end).rev() {
            op.scalar(i)?;
        }
        return ControlFlow::Continue(());
    }

    let full = lane_mask(w);
    let mut pos = end;
    while pos - begin >= w {
        pos -= w;
        dispatch_width!(op, w, pos, full)?;
    }
    let rem = pos - begin;
    if rem > 0 {
        dispatch_width!(op, w, begin, lane_mask(rem))?;
    }
    ControlFlow::Continue(())
}
