// SPDX-License-Identifier: Apache-2.0

//! Polynomial rolling hash, `h = h * 31 + e` over every element.
//!
//! A chunk of `k` elements advances the hash in one step:
//! `h * 31^k + sum(e[i] * 31^(k - 1 - i))`, with all arithmetic wrapping at 32
//! bits. Chunks must be applied in order and each element exactly once, so the
//! cascade runs in sequential mode.

use std::ops::ControlFlow;

use crate::cascade::{self, ChunkOp, TailMode, Widths};
use crate::constants::{HASH_MULTIPLIER, HASH_POWERS, MAX_LANES};
use crate::types::{ArrayView, Stride};
use crate::vector::{read_element, Lanes};

/// `31^(W-1) .. 31^0`, the per-lane weights of a `W`-wide chunk.
#[inline(always)]
pub(crate) fn lane_weights<const W: usize>() -> [u32; W] {
    debug_assert!(W <= MAX_LANES);
    let mut weights = [0u32; W];
    for (i, w) in weights.iter_mut().enumerate() {
        *w = HASH_POWERS[W - 1 - i];
    }
    weights
}

struct Polynomial<'a> {
    data: &'a [u8],
    stride: Stride,
    hash: u32,
}

impl ChunkOp for Polynomial<'_> {
    type Output = ();
    const TAIL: TailMode = TailMode::Sequential;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, _live: u64) -> ControlFlow<()> {
        let sum = Lanes::<W>::load(self.data, self.stride, start).wrapping_dot(&lane_weights::<W>());
        self.hash = self.hash.wrapping_mul(HASH_POWERS[W]).wrapping_add(sum);
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
        let e = read_element(self.data, self.stride, index);
        self.hash = self.hash.wrapping_mul(HASH_MULTIPLIER).wrapping_add(e);
        ControlFlow::Continue(())
    }
}

pub fn rolling_hash(view: &ArrayView, seed: i32, widths: Widths) -> i32 {
    let mut op = Polynomial {
        data: view.data(),
        stride: view.stride(),
        hash: seed as u32,
    };
    let _ = cascade::run(&mut op, 0, view.len(), widths);
    op.hash as i32
}

pub fn rolling_hash_scalar(view: &ArrayView, seed: i32) -> i32 {
    (0..view.len()).fold(seed, |h, i| h.wrapping_mul(31).wrapping_add(view.get(i) as i32))
}
