// SPDX-License-Identifier: Apache-2.0

//! Codepoint index to byte index translation for valid UTF-8 and UTF-16.
//!
//! Each chunk marks the elements that start a codepoint (non-continuation
//! bytes, non-low-surrogate chars) and subtracts their popcount from the
//! remaining index. The chunk that would drive it negative holds the target,
//! which is located by halving the start mask.

use std::ops::ControlFlow;

use crate::cascade::{self, ChunkOp, TailMode, Widths};
use crate::types::{ArrayView, Encoding, Stride, NOT_FOUND};
use crate::vector::{lane_mask, read_element, Lanes};

#[inline(always)]
fn starts_codepoint(stride: Stride, e: u32) -> bool {
    match stride {
        Stride::S1 => e & 0xc0 != 0x80,
        _ => e & 0xfc00 != 0xdc00,
    }
}

/// Position of the `k`-th (0-based) set bit of `mask`; `k < mask.count_ones()`.
#[inline]
pub fn select_bit(mut mask: u64, mut k: u32) -> usize {
    debug_assert!(k < mask.count_ones());
    let mut base = 0;
    let mut width = 64;
    while width > 1 {
        width >>= 1;
        let low = mask & lane_mask(width);
        let count = low.count_ones();
        if k >= count {
            k -= count;
            mask >>= width;
            base += width;
        } else {
            mask = low;
        }
    }
    base
}

struct Locate<'a> {
    data: &'a [u8],
    stride: Stride,
    remaining: u64,
}

impl ChunkOp for Locate<'_> {
    type Output = usize;
    const TAIL: TailMode = TailMode::Sequential;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, _live: u64) -> ControlFlow<usize> {
        let stride = self.stride;
        let starts = Lanes::<W>::load(self.data, stride, start).mask(|e| starts_codepoint(stride, e));
        let count = starts.count_ones() as u64;
        if self.remaining < count {
            return ControlFlow::Break(start + select_bit(starts, self.remaining as u32));
        }
        self.remaining -= count;
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<usize> {
        if starts_codepoint(self.stride, read_element(self.data, self.stride, index)) {
            if self.remaining == 0 {
                return ControlFlow::Break(index);
            }
            self.remaining -= 1;
        }
        ControlFlow::Continue(())
    }
}

/// Byte index of the start of codepoint `codepoint_index`, or `-1` when the
/// buffer holds fewer codepoints. Only UTF-8 and UTF-16 views are accepted.
pub fn codepoint_index_to_byte_index(view: &ArrayView, codepoint_index: u64, widths: Widths) -> i64 {
    let stride = view.stride();
    let mut op = Locate {
        data: view.data(),
        stride,
        remaining: codepoint_index,
    };
    match cascade::run(&mut op, 0, view.len(), widths) {
        ControlFlow::Break(element) => (element * stride.bytes()) as i64,
        ControlFlow::Continue(()) => NOT_FOUND,
    }
}

pub fn codepoint_index_to_byte_index_scalar(view: &ArrayView, codepoint_index: u64) -> i64 {
    let stride = view.stride();
    (0..view.len())
        .filter(|&i| starts_codepoint(stride, view.get(i)))
        .nth(codepoint_index as usize)
        .map_or(NOT_FOUND, |i| (i * stride.bytes()) as i64)
}

/// Stride of the encodings this module handles.
pub(crate) fn supported_stride(encoding: Encoding) -> Option<Stride> {
    match encoding {
        Encoding::Utf8 | Encoding::Utf16 => Some(encoding.stride()),
        _ => None,
    }
}
