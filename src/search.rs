// SPDX-License-Identifier: Apache-2.0

//! Predicate search
//!
//! `indexOf`-style scans over stride-1/2/4 arrays. Each variant is a
//! [`LanePredicate`] that turns one vector chunk into a lane bitmask; the
//! cascade stops at the first chunk with a live bit set, so the lowest
//! matching index is always the one reported. Reverse scans walk the cascade
//! back to front and take the highest live bit instead.
//!
//! Substring search builds on the pair predicate: candidates for the first
//! two needle elements are confirmed with a masked region compare.
//!
//! The byte-stride `Any` variant additionally has hand-written AVX2 and NEON
//! loops used by the dispatch layer.
#![allow(unsafe_op_in_unsafe_fn)]

use std::ops::ControlFlow;

use crate::cascade::{self, ChunkOp, TailMode, Widths};
use crate::compare;
use crate::types::{ArrayView, NibbleTable, SearchVariant, Stride, NOT_FOUND};
use crate::vector::{read_element, Lanes};

#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
use std::arch::x86_64::{
    __m256i, _mm256_cmpeq_epi8, _mm256_loadu_si256, _mm256_movemask_epi8, _mm256_or_si256,
    _mm256_set1_epi8,
};

#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
use std::arch::aarch64::{
    uint8x16_t, vceqq_u8, vdupq_n_u8, vget_lane_u64, vld1q_u8, vorrq_u8, vreinterpret_u64_u8,
    vreinterpretq_u16_u8, vshrn_n_u16,
};

#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
use crate::constants::LANES_AVX2_BYTES;
#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
use crate::constants::LANES_NEON_BYTES;

// =============================================================================
// LANE PREDICATES
// =============================================================================

/// A per-position test evaluated both lane-wise and element-wise.
pub trait LanePredicate {
    /// Consecutive elements one position reads (`1` or `2`).
    const SPAN: usize;

    /// Bit `i` set when the predicate holds at `start + i`.
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64;

    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool;
}

pub struct AnyOf {
    needles: [u32; 4],
    count: usize,
}

impl AnyOf {
    pub fn new(needles: &[u32]) -> Self {
        debug_assert!(!needles.is_empty() && needles.len() <= 4);
        let mut buf = [needles[0]; 4];
        buf[..needles.len()].copy_from_slice(needles);
        Self {
            needles: buf,
            count: needles.len(),
        }
    }
}

impl LanePredicate for AnyOf {
    const SPAN: usize = 1;

    #[inline(always)]
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64 {
        let v = Lanes::<W>::load(data, stride, start);
        let mut m = v.eq_mask(&Lanes::splat(self.needles[0]));
        for &needle in &self.needles[1..self.count] {
            m |= v.eq_mask(&Lanes::splat(needle));
        }
        m
    }

    #[inline(always)]
    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool {
        let e = read_element(data, stride, index);
        self.needles[..self.count].contains(&e)
    }
}

pub struct InRanges {
    bounds: [(u32, u32); 2],
    count: usize,
}

impl InRanges {
    pub fn new(bounds: &[(u32, u32)]) -> Self {
        debug_assert!(!bounds.is_empty() && bounds.len() <= 2);
        let mut buf = [bounds[0]; 2];
        buf[..bounds.len()].copy_from_slice(bounds);
        Self {
            bounds: buf,
            count: bounds.len(),
        }
    }
}

impl LanePredicate for InRanges {
    const SPAN: usize = 1;

    #[inline(always)]
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64 {
        let v = Lanes::<W>::load(data, stride, start);
        let mut m = 0;
        for &(lo, hi) in &self.bounds[..self.count] {
            // clamp(x, lo, hi) == x  <=>  lo <= x <= hi
            let clamped = v.max(Lanes::splat(lo)).min(Lanes::splat(hi));
            m |= clamped.eq_mask(&v);
        }
        m
    }

    #[inline(always)]
    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool {
        let e = read_element(data, stride, index);
        self.bounds[..self.count]
            .iter()
            .any(|&(lo, hi)| lo <= e && e <= hi)
    }
}

/// `(e | mask) == value`.
pub struct MaskedEquals {
    pub value: u32,
    pub mask: u32,
}

impl LanePredicate for MaskedEquals {
    const SPAN: usize = 1;

    #[inline(always)]
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64 {
        Lanes::<W>::load(data, stride, start)
            .or(Lanes::splat(self.mask))
            .eq_mask(&Lanes::splat(self.value))
    }

    #[inline(always)]
    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool {
        read_element(data, stride, index) | self.mask == self.value
    }
}

/// Two adjacent elements, each OR-masked before comparison. Unmasked
/// searches use zero masks.
pub struct Consecutive {
    pub first: u32,
    pub second: u32,
    pub mask_first: u32,
    pub mask_second: u32,
}

impl LanePredicate for Consecutive {
    const SPAN: usize = 2;

    #[inline(always)]
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64 {
        let cur = Lanes::<W>::load(data, stride, start).or(Lanes::splat(self.mask_first));
        let next = Lanes::<W>::load(data, stride, start + 1).or(Lanes::splat(self.mask_second));
        cur.eq_mask(&Lanes::splat(self.first)) & next.eq_mask(&Lanes::splat(self.second))
    }

    #[inline(always)]
    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool {
        read_element(data, stride, index) | self.mask_first == self.first
            && read_element(data, stride, index + 1) | self.mask_second == self.second
    }
}

/// Nibble-table membership; elements of 256 and above are rejected first.
pub struct TableLookup(pub NibbleTable);

impl LanePredicate for TableLookup {
    const SPAN: usize = 1;

    #[inline(always)]
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64 {
        let v = Lanes::<W>::load(data, stride, start);
        let table = &self.0;
        let classes = v.map(|e| {
            if e > 0xff {
                0
            } else {
                (table.low[(e & 0xf) as usize] & table.high[(e >> 4) as usize]) as u32
            }
        });
        classes.test_mask(0xff)
    }

    #[inline(always)]
    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool {
        self.0.matches(read_element(data, stride, index))
    }
}

/// `e & bits != 0`: the masked-bits test used by code range escalation.
pub struct AnyBitsSet(pub u32);

impl LanePredicate for AnyBitsSet {
    const SPAN: usize = 1;

    #[inline(always)]
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64 {
        Lanes::<W>::load(data, stride, start).test_mask(self.0)
    }

    #[inline(always)]
    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool {
        read_element(data, stride, index) & self.0 != 0
    }
}

/// Arbitrary element test, evaluated lane by lane.
pub struct ElementFn<F>(pub F);

impl<F: Fn(u32) -> bool> LanePredicate for ElementFn<F> {
    const SPAN: usize = 1;

    #[inline(always)]
    fn lanes<const W: usize>(&self, data: &[u8], stride: Stride, start: usize) -> u64 {
        Lanes::<W>::load(data, stride, start).mask(&self.0)
    }

    #[inline(always)]
    fn element(&self, data: &[u8], stride: Stride, index: usize) -> bool {
        (self.0)(read_element(data, stride, index))
    }
}

// =============================================================================
// CASCADE OPERATIONS
// =============================================================================

struct FirstMatch<'a, P> {
    data: &'a [u8],
    stride: Stride,
    predicate: &'a P,
}

impl<P: LanePredicate> ChunkOp for FirstMatch<'_, P> {
    type Output = usize;
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<usize> {
        let hits = self.predicate.lanes::<W>(self.data, self.stride, start) & live;
        if hits != 0 {
            return ControlFlow::Break(start + hits.trailing_zeros() as usize);
        }
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<usize> {
        if self.predicate.element(self.data, self.stride, index) {
            return ControlFlow::Break(index);
        }
        ControlFlow::Continue(())
    }
}

struct LastMatch<'a, P>(FirstMatch<'a, P>);

impl<P: LanePredicate> ChunkOp for LastMatch<'_, P> {
    type Output = usize;
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<usize> {
        let hits = self.0.predicate.lanes::<W>(self.0.data, self.0.stride, start) & live;
        if hits != 0 {
            return ControlFlow::Break(start + 63 - hits.leading_zeros() as usize);
        }
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<usize> {
        self.0.scalar(index)
    }
}

/// Lowest position `p` in `begin..end` where `predicate` holds. Positions
/// read up to `p + P::SPAN - 1`, which the caller keeps inside `data`.
pub fn find_first<P: LanePredicate>(
    data: &[u8],
    stride: Stride,
    begin: usize,
    end: usize,
    predicate: &P,
    widths: Widths,
) -> Option<usize> {
    let mut op = FirstMatch {
        data,
        stride,
        predicate,
    };
    match cascade::run(&mut op, begin, end, widths) {
        ControlFlow::Break(index) => Some(index),
        ControlFlow::Continue(()) => None,
    }
}

/// Highest position `p` in `begin..end` where `predicate` holds.
pub fn find_last<P: LanePredicate>(
    data: &[u8],
    stride: Stride,
    begin: usize,
    end: usize,
    predicate: &P,
    widths: Widths,
) -> Option<usize> {
    let mut op = LastMatch(FirstMatch {
        data,
        stride,
        predicate,
    });
    match cascade::run_reverse(&mut op, begin, end, widths) {
        ControlFlow::Break(index) => Some(index),
        ControlFlow::Continue(()) => None,
    }
}

struct CountMatches<'a, P> {
    data: &'a [u8],
    stride: Stride,
    predicate: &'a P,
    count: u64,
}

impl<P: LanePredicate> ChunkOp for CountMatches<'_, P> {
    type Output = ();
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<()> {
        let hits = self.predicate.lanes::<W>(self.data, self.stride, start) & live;
        self.count += hits.count_ones() as u64;
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
        self.count += self.predicate.element(self.data, self.stride, index) as u64;
        ControlFlow::Continue(())
    }
}

/// Number of positions in `begin..end` where `predicate` holds.
pub fn count_matching<P: LanePredicate>(
    data: &[u8],
    stride: Stride,
    begin: usize,
    end: usize,
    predicate: &P,
    widths: Widths,
) -> u64 {
    let mut op = CountMatches {
        data,
        stride,
        predicate,
        count: 0,
    };
    let _ = cascade::run(&mut op, begin, end, widths);
    op.count
}

/// Runs `$body` with `$pred` bound to the predicate matching `$variant`.
macro_rules! with_predicate {
    ($variant:expr, $pred:ident => $body:expr) => {
        match $variant {
            SearchVariant::Any(needles) => {
                let $pred = AnyOf::new(needles.as_slice());
                $body
            }
            SearchVariant::Range(ranges) => {
                let $pred = InRanges::new(ranges.as_slice());
                $body
            }
            SearchVariant::WithMask { value, mask } => {
                let $pred = MaskedEquals {
                    value: *value,
                    mask: *mask,
                };
                $body
            }
            SearchVariant::TwoConsecutive { first, second } => {
                let $pred = Consecutive {
                    first: *first,
                    second: *second,
                    mask_first: 0,
                    mask_second: 0,
                };
                $body
            }
            SearchVariant::TwoConsecutiveWithMask {
                first,
                second,
                mask_first,
                mask_second,
            } => {
                let $pred = Consecutive {
                    first: *first,
                    second: *second,
                    mask_first: *mask_first,
                    mask_second: *mask_second,
                };
                $body
            }
            SearchVariant::Table(table) => {
                let $pred = TableLookup(*table);
                $body
            }
        }
    };
}

#[inline(always)]
fn to_result(found: Option<usize>) -> i64 {
    found.map_or(NOT_FOUND, |i| i as i64)
}

/// Lowest index `i >= from_index` where `variant` matches, or `-1`.
///
/// Two-element variants report the first element of the pair and only
/// consider pairs that lie entirely inside the view.
pub fn index_of(view: &ArrayView, from_index: usize, variant: &SearchVariant, widths: Widths) -> i64 {
    let end = (view.len() + 1).saturating_sub(variant.span());
    if from_index >= end {
        return NOT_FOUND;
    }
    with_predicate!(variant, pred => to_result(find_first(
        view.data(),
        view.stride(),
        from_index,
        end,
        &pred,
        widths
    )))
}

/// Reference element-at-a-time scan with the same contract as [`index_of`].
pub fn index_of_scalar(view: &ArrayView, from_index: usize, variant: &SearchVariant) -> i64 {
    let end = (view.len() + 1).saturating_sub(variant.span());
    with_predicate!(variant, pred => to_result(
        (from_index..end).find(|&i| pred.element(view.data(), view.stride(), i))
    ))
}

/// Highest position in `to_index..from_index` where `variant` matches, or
/// `-1`. Pairs must lie entirely inside `to_index..from_index`.
pub fn last_index_of(
    view: &ArrayView,
    from_index: usize,
    to_index: usize,
    variant: &SearchVariant,
    widths: Widths,
) -> i64 {
    let end = (from_index + 1).saturating_sub(variant.span());
    if to_index >= end {
        return NOT_FOUND;
    }
    with_predicate!(variant, pred => to_result(find_last(
        view.data(),
        view.stride(),
        to_index,
        end,
        &pred,
        widths
    )))
}

pub fn last_index_of_scalar(
    view: &ArrayView,
    from_index: usize,
    to_index: usize,
    variant: &SearchVariant,
) -> i64 {
    let end = (from_index + 1).saturating_sub(variant.span());
    with_predicate!(variant, pred => to_result(
        (to_index..end).rev().find(|&i| pred.element(view.data(), view.stride(), i))
    ))
}

// =============================================================================
// SUBSTRING SEARCH
// =============================================================================

#[inline(always)]
fn mask_at(mask: Option<&ArrayView>, index: usize) -> u32 {
    mask.map_or(0, |m| m.get(index))
}

/// Pair filter on the first two needle elements.
fn string_anchor(needle: &ArrayView, mask: Option<&ArrayView>) -> Consecutive {
    Consecutive {
        first: needle.get(0),
        second: needle.get(1),
        mask_first: mask_at(mask, 0),
        mask_second: mask_at(mask, 1),
    }
}

/// Needle elements past the anchor pair match `haystack` at `at`.
fn rest_matches(haystack: &ArrayView, at: usize, needle: &ArrayView, mask: Option<&ArrayView>, widths: Widths) -> bool {
    let rest = needle.len() - 2;
    rest == 0
        || compare::region_equals(
            &haystack.skip(at + 2),
            &needle.skip(2),
            mask.map(|m| m.skip(2)).as_ref(),
            rest,
            widths,
        )
}

/// Lowest `i >= from_index` with `(haystack[i + k] | mask[k]) == needle[k]`
/// for every needle element `k`, or `-1`. The whole match lies inside the
/// view; an empty needle matches at `from_index`.
///
/// Candidates come from the pair search on the first two needle elements and
/// are confirmed with a region compare of the rest.
pub fn index_of_string(
    haystack: &ArrayView,
    from_index: usize,
    needle: &ArrayView,
    mask: Option<&ArrayView>,
    widths: Widths,
) -> i64 {
    let n = needle.len();
    if n == 0 {
        return from_index as i64;
    }
    let end = (haystack.len() + 1).saturating_sub(n);
    if from_index >= end {
        return NOT_FOUND;
    }
    let (data, stride) = (haystack.data(), haystack.stride());
    if n == 1 {
        let single = MaskedEquals {
            value: needle.get(0),
            mask: mask_at(mask, 0),
        };
        return to_result(find_first(data, stride, from_index, end, &single, widths));
    }

    let anchor = string_anchor(needle, mask);
    let mut start = from_index;
    while start < end {
        let Some(at) = find_first(data, stride, start, end, &anchor, widths) else {
            break;
        };
        if rest_matches(haystack, at, needle, mask, widths) {
            return at as i64;
        }
        start = at + 1;
    }
    NOT_FOUND
}

pub fn index_of_string_scalar(haystack: &ArrayView, from_index: usize, needle: &ArrayView, mask: Option<&ArrayView>) -> i64 {
    let n = needle.len();
    if n == 0 {
        return from_index as i64;
    }
    let end = (haystack.len() + 1).saturating_sub(n);
    to_result((from_index..end).find(|&i| compare::region_equals_scalar(&haystack.skip(i), needle, mask, n)))
}

/// Highest `i` whose match `i..i + needle.len()` lies inside
/// `to_index..from_index`, or `-1`. An empty needle matches at `from_index`.
pub fn last_index_of_string(
    haystack: &ArrayView,
    from_index: usize,
    to_index: usize,
    needle: &ArrayView,
    mask: Option<&ArrayView>,
    widths: Widths,
) -> i64 {
    let n = needle.len();
    if n == 0 {
        return from_index as i64;
    }
    let mut end = (from_index + 1).saturating_sub(n);
    if to_index >= end {
        return NOT_FOUND;
    }
    let (data, stride) = (haystack.data(), haystack.stride());
    if n == 1 {
        let single = MaskedEquals {
            value: needle.get(0),
            mask: mask_at(mask, 0),
        };
        return to_result(find_last(data, stride, to_index, end, &single, widths));
    }

    let anchor = string_anchor(needle, mask);
    while end > to_index {
        let Some(at) = find_last(data, stride, to_index, end, &anchor, widths) else {
            break;
        };
        if rest_matches(haystack, at, needle, mask, widths) {
            return at as i64;
        }
        end = at;
    }
    NOT_FOUND
}

pub fn last_index_of_string_scalar(
    haystack: &ArrayView,
    from_index: usize,
    to_index: usize,
    needle: &ArrayView,
    mask: Option<&ArrayView>,
) -> i64 {
    let n = needle.len();
    if n == 0 {
        return from_index as i64;
    }
    let end = (from_index + 1).saturating_sub(n);
    to_result(
        (to_index..end)
            .rev()
            .find(|&i| compare::region_equals_scalar(&haystack.skip(i), needle, mask, n)),
    )
}

// =============================================================================
// BYTE NEEDLE SEARCH - ARCHITECTURE SPECIFIC
// =============================================================================

#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn any_byte_mask_avx2(ptr: *const u8, needles: &[__m256i; 4]) -> u32 {
    let chunk = _mm256_loadu_si256(ptr as *const __m256i);
    let hit = _mm256_or_si256(
        _mm256_or_si256(
            _mm256_cmpeq_epi8(chunk, needles[0]),
            _mm256_cmpeq_epi8(chunk, needles[1]),
        ),
        _mm256_or_si256(
            _mm256_cmpeq_epi8(chunk, needles[2]),
            _mm256_cmpeq_epi8(chunk, needles[3]),
        ),
    );
    _mm256_movemask_epi8(hit) as u32
}

/// First byte at or after `from` equal to any of 1-4 `needles`, AVX2.
///
/// # Safety
/// Requires AVX2 support; `needles` holds 1 to 4 bytes.
#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn index_of_any_u8_avx2(data: &[u8], from: usize, needles: &[u8]) -> Option<usize> {
    const LANES: usize = LANES_AVX2_BYTES; // AVX2 compares 32 bytes at once

    let len = data.len();
    let last = needles.len() - 1;
    let broadcast: [__m256i; 4] =
        [0, 1, 2, 3].map(|k| _mm256_set1_epi8(needles[k.min(last)] as i8));

    // Process 32-byte chunks with AVX2
    let mut i = from;
    while i + LANES <= len {
        let bits = any_byte_mask_avx2(data.as_ptr().add(i), &broadcast);
        if bits != 0 {
            return Some(i + bits.trailing_zeros() as usize);
        }
        i += LANES;
    }
    if i == len {
        return None;
    }

    // End-aligned tail over the last 32 bytes; lanes before `i` were scanned
    if len - from >= LANES {
        let tail = len - LANES;
        let bits = any_byte_mask_avx2(data.as_ptr().add(tail), &broadcast) & (u32::MAX << (i - tail));
        return (bits != 0).then(|| tail + bits.trailing_zeros() as usize);
    }
    data[i..]
        .iter()
        .position(|b| needles.contains(b))
        .map(|p| i + p)
}

/// Four mask bits per byte lane after the shift-narrow.
#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
#[target_feature(enable = "neon")]
#[inline]
unsafe fn any_byte_mask_neon(ptr: *const u8, needles: &[uint8x16_t; 4]) -> u64 {
    let chunk = vld1q_u8(ptr);
    let hit = vorrq_u8(
        vorrq_u8(vceqq_u8(chunk, needles[0]), vceqq_u8(chunk, needles[1])),
        vorrq_u8(vceqq_u8(chunk, needles[2]), vceqq_u8(chunk, needles[3])),
    );
    let nibbles = vshrn_n_u16::<4>(vreinterpretq_u16_u8(hit));
    vget_lane_u64::<0>(vreinterpret_u64_u8(nibbles))
}

/// First byte at or after `from` equal to any of 1-4 `needles`, NEON.
///
/// # Safety
/// Requires NEON support.
#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn index_of_any_u8_neon(data: &[u8], from: usize, needles: &[u8]) -> Option<usize> {
    const LANES: usize = LANES_NEON_BYTES; // NEON compares 16 bytes at once

    let len = data.len();
    let last = needles.len() - 1;
    let broadcast: [uint8x16_t; 4] = [0, 1, 2, 3].map(|k| vdupq_n_u8(needles[k.min(last)]));

    let mut i = from;
    while i + LANES <= len {
        let bits = any_byte_mask_neon(data.as_ptr().add(i), &broadcast);
        if bits != 0 {
            return Some(i + (bits.trailing_zeros() / 4) as usize);
        }
        i += LANES;
    }
    if i == len {
        return None;
    }

    if len - from >= LANES {
        let tail = len - LANES;
        let bits = any_byte_mask_neon(data.as_ptr().add(tail), &broadcast) & (u64::MAX << (4 * (i - tail)));
        return (bits != 0).then(|| tail + (bits.trailing_zeros() / 4) as usize);
    }
    data[i..]
        .iter()
        .position(|b| needles.contains(b))
        .map(|p| i + p)
}
