// SPDX-License-Identifier: Apache-2.0

//! Code range classification
//!
//! Computes the narrowest code range a buffer fits in together with its
//! codepoint count, validating UTF-8 and UTF-16 on the way unless the caller
//! vouches for the input.
//!
//! Classification escalates through nested alphabets (ASCII, Latin-1, BMP,
//! full range). Each phase is a predicate search for the first element the
//! current alphabet rejects, and the next phase resumes from that element, so
//! no prefix is ever scanned twice.
//!
//! ## UTF-8
//! The vector path is the Keiser-Lemire lookup algorithm: three 16-entry tables
//! indexed by the nibbles of the previous and current byte flag every two-byte
//! error pattern, and the 2nd/3rd previous bytes tell whether the current byte
//! must be a continuation. The scalar path runs Hoehrmann's DFA.
#![allow(unsafe_op_in_unsafe_fn)]

use std::ops::ControlFlow;

use bitflags::bitflags;

use crate::cascade::{self, ChunkOp, TailMode, Widths};
use crate::constants::{
    ASCII_MASK_U16, ASCII_MASK_U32, BMP_MASK_U32, LATIN1_MASK_U16, LATIN1_MASK_U32,
    MAX_CODEPOINT, SURROGATE_MAX, SURROGATE_MIN,
};
use crate::search::{count_matching, find_first, AnyBitsSet, ElementFn};
use crate::types::{ArrayView, CodeRange, Encoding, Stride, StringAttributes};
use crate::vector::{read_element, Lanes};

#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
use std::arch::x86_64::{__m256i, _mm256_loadu_si256, _mm256_movemask_epi8};

#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
use std::arch::aarch64::{vld1q_u8, vmaxvq_u8};

#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
use crate::constants::LANES_AVX2_BYTES;
#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
use crate::constants::LANES_NEON_BYTES;

// =============================================================================
// UTF-8 ERROR FLAGS AND LOOKUP TABLES
// =============================================================================

bitflags! {
    /// Error classes detected by the UTF-8 lookup tables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Utf8Error: u8 {
        /// Lead byte not followed by enough continuations
        const TOO_SHORT = 1 << 0;
        /// Continuation byte with no lead byte
        const TOO_LONG = 1 << 1;
        const OVERLONG_3 = 1 << 2;
        /// Above U+10FFFF
        const TOO_LARGE = 1 << 3;
        /// Encodes U+D800..U+DFFF
        const SURROGATE = 1 << 4;
        const OVERLONG_2 = 1 << 5;
        const TOO_LARGE_1000 = 1 << 6;
        /// Shares its bit with `TOO_LARGE_1000`
        const OVERLONG_4 = 1 << 6;
        /// Two continuations in a row; an error only where no lead byte asks for it
        const TWO_CONTS = 1 << 7;
    }
}

const TOO_SHORT: u8 = Utf8Error::TOO_SHORT.bits();
const TOO_LONG: u8 = Utf8Error::TOO_LONG.bits();
const OVERLONG_2: u8 = Utf8Error::OVERLONG_2.bits();
const OVERLONG_3: u8 = Utf8Error::OVERLONG_3.bits();
const OVERLONG_4: u8 = Utf8Error::OVERLONG_4.bits();
const SURROGATE: u8 = Utf8Error::SURROGATE.bits();
const TOO_LARGE: u8 = Utf8Error::TOO_LARGE.bits();
const TOO_LARGE_1000: u8 = Utf8Error::TOO_LARGE_1000.bits();
const TWO_CONTS: u8 = Utf8Error::TWO_CONTS.bits();
const CARRY: u8 = TOO_SHORT | TOO_LONG | TWO_CONTS;

/// Indexed by the high nibble of the previous byte.
pub const BYTE_1_HIGH: [u8; 16] = [
    TOO_LONG,
    TOO_LONG,
    TOO_LONG,
    TOO_LONG,
    TOO_LONG,
    TOO_LONG,
    TOO_LONG,
    TOO_LONG,
    TWO_CONTS,
    TWO_CONTS,
    TWO_CONTS,
    TWO_CONTS,
    TOO_SHORT | OVERLONG_2,
    TOO_SHORT,
    TOO_SHORT | OVERLONG_3 | SURROGATE,
    TOO_SHORT | TOO_LARGE | TOO_LARGE_1000 | OVERLONG_4,
];

/// Indexed by the low nibble of the previous byte.
pub const BYTE_1_LOW: [u8; 16] = [
    CARRY | OVERLONG_3 | OVERLONG_2 | OVERLONG_4,
    CARRY | OVERLONG_2,
    CARRY,
    CARRY,
    CARRY | TOO_LARGE,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000 | SURROGATE,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
    CARRY | TOO_LARGE | TOO_LARGE_1000,
];

/// Indexed by the high nibble of the current byte.
pub const BYTE_2_HIGH: [u8; 16] = [
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
    TOO_LONG | OVERLONG_2 | TWO_CONTS | OVERLONG_3 | TOO_LARGE_1000 | OVERLONG_4,
    TOO_LONG | OVERLONG_2 | TWO_CONTS | OVERLONG_3 | TOO_LARGE,
    TOO_LONG | OVERLONG_2 | TWO_CONTS | SURROGATE | TOO_LARGE,
    TOO_LONG | OVERLONG_2 | TWO_CONTS | SURROGATE | TOO_LARGE,
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
    TOO_SHORT,
];

/// Error bits of the two-byte pattern `prev1, cur`.
#[inline(always)]
pub(crate) fn special_cases(prev1: u32, cur: u32) -> u32 {
    (BYTE_1_HIGH[(prev1 >> 4) as usize]
        & BYTE_1_LOW[(prev1 & 0xf) as usize]
        & BYTE_2_HIGH[(cur >> 4) as usize]) as u32
}

/// `TWO_CONTS` when a three- or four-byte lead two or three bytes back owes
/// the current byte as a continuation.
#[inline(always)]
pub(crate) fn must_continue(prev3: u32, prev2: u32) -> u32 {
    if prev2 >= 0xe0 || prev3 >= 0xf0 {
        TWO_CONTS as u32
    } else {
        0
    }
}

#[inline(always)]
fn is_continuation(byte: u32) -> bool {
    byte & 0xc0 == 0x80
}

/// True when the last bytes open a sequence the buffer does not finish.
pub(crate) fn ends_incomplete(data: &[u8]) -> bool {
    let n = data.len();
    (n >= 1 && data[n - 1] >= 0xc0) || (n >= 2 && data[n - 2] >= 0xe0) || (n >= 3 && data[n - 3] >= 0xf0)
}

// =============================================================================
// UTF-8 DFA
// =============================================================================

// State contract: ACCEPT between complete sequences, REJECT is absorbing, and
// every other state counts the continuation bytes still owed (with a narrowed
// range for the second byte after E0, ED, F0 and F4).
pub const UTF8_ACCEPT: u8 = 0;
pub const UTF8_REJECT: u8 = 1;

/// Byte to character class.
pub const UTF8_BYTE_CLASS: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut b = 0x80;
    while b < 0x100 {
        table[b] = match b {
            0x80..=0x8f => 1,
            0x90..=0x9f => 9,
            0xa0..=0xbf => 7,
            0xc0 | 0xc1 => 8,
            0xc2..=0xdf => 2,
            0xe0 => 10,
            0xed => 4,
            0xe1..=0xef => 3,
            0xf0 => 11,
            0xf1..=0xf3 => 6,
            0xf4 => 5,
            _ => 8,
        };
        b += 1;
    }
    table
};

/// `UTF8_TRANSITIONS[state][class]`.
pub const UTF8_TRANSITIONS: [[u8; 12]; 9] = [
    [0, 1, 2, 3, 5, 8, 7, 1, 1, 1, 4, 6],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1],
    [1, 2, 1, 1, 1, 1, 1, 2, 1, 2, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1],
    [1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 3, 1, 3, 1, 1],
    [1, 3, 1, 1, 1, 1, 1, 3, 1, 3, 1, 1],
    [1, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];

#[inline(always)]
pub fn utf8_step(state: u8, byte: u8) -> u8 {
    UTF8_TRANSITIONS[state as usize][UTF8_BYTE_CLASS[byte as usize] as usize]
}

// =============================================================================
// CHUNK OPERATIONS
// =============================================================================

struct Utf8Check<'a> {
    data: &'a [u8],
    error: Utf8Error,
    continuations: u64,
}

impl ChunkOp for Utf8Check<'_> {
    type Output = ();
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<()> {
        let cur = Lanes::<W>::load(self.data, Stride::S1, start);
        let prev1 = Lanes::<W>::load_shifted(self.data, Stride::S1, start, 1);
        let prev2 = Lanes::<W>::load_shifted(self.data, Stride::S1, start, 2);
        let prev3 = Lanes::<W>::load_shifted(self.data, Stride::S1, start, 3);

        let special = prev1.zip(cur, special_cases);
        let owed = prev3.zip(prev2, must_continue);
        let errors = special.zip(owed, |a, b| a ^ b);
        self.error |= Utf8Error::from_bits_retain(errors.reduce_or() as u8);

        self.continuations += (cur.mask(is_continuation) & live).count_ones() as u64;
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
        let data = self.data;
        let at = |back: usize| index.checked_sub(back).map_or(0, |i| data[i] as u32);
        let bits = special_cases(at(1), at(0)) ^ must_continue(at(3), at(2));
        self.error |= Utf8Error::from_bits_retain(bits as u8);
        self.continuations += is_continuation(at(0)) as u64;
        ControlFlow::Continue(())
    }
}

#[inline(always)]
fn is_high_surrogate(e: u32) -> bool {
    e & 0xfc00 == 0xd800
}

#[inline(always)]
fn is_low_surrogate(e: u32) -> bool {
    e & 0xfc00 == 0xdc00
}

#[inline(always)]
fn is_surrogate(e: u32) -> bool {
    (SURROGATE_MIN..=SURROGATE_MAX).contains(&e)
}

/// Pairs every low surrogate with a high surrogate one element earlier.
struct Utf16Check<'a> {
    data: &'a [u8],
    broken: bool,
    pairs: u64,
}

impl ChunkOp for Utf16Check<'_> {
    type Output = ();
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<()> {
        let cur = Lanes::<W>::load(self.data, Stride::S2, start);
        let prev = Lanes::<W>::load_shifted(self.data, Stride::S2, start, 1);
        let low = cur.mask(is_low_surrogate);
        let prev_high = prev.mask(is_high_surrogate);
        // a lone low surrogate or a high surrogate followed by anything else
        self.broken |= (low ^ prev_high) & live != 0;
        self.pairs += (low & prev_high & live).count_ones() as u64;
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
        let cur = read_element(self.data, Stride::S2, index);
        let prev_high = index > 0 && is_high_surrogate(read_element(self.data, Stride::S2, index - 1));
        self.broken |= is_low_surrogate(cur) != prev_high;
        self.pairs += (is_low_surrogate(cur) && prev_high) as u64;
        ControlFlow::Continue(())
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// First element at or after `from` with any of `bits` set.
#[inline]
fn first_with_bits(view: &ArrayView, from: usize, bits: u32, widths: Widths) -> Option<usize> {
    find_first(view.data(), view.stride(), from, view.len(), &AnyBitsSet(bits), widths)
}

/// Code range and codepoint count of `view` read as `encoding`.
///
/// With `assume_valid`, UTF-8 and UTF-16 inputs are only counted, never
/// validated; the result for invalid input is then unspecified.
pub fn calc_string_attributes(
    view: &ArrayView,
    encoding: Encoding,
    assume_valid: bool,
    widths: Widths,
) -> StringAttributes {
    debug_assert_eq!(view.stride(), encoding.stride());
    let ascii_mask = match encoding.stride() {
        Stride::S1 => 0x80,
        Stride::S2 => ASCII_MASK_U16,
        Stride::S4 => ASCII_MASK_U32,
    };
    match first_with_bits(view, 0, ascii_mask, widths) {
        None => StringAttributes::new(CodeRange::Ascii, view.len() as u64),
        Some(first) => classify_from(view, encoding, assume_valid, first, widths),
    }
}

/// Continues classification at `first_non_ascii`, the index of the first
/// non-ASCII element, found by the caller.
pub fn classify_from(
    view: &ArrayView,
    encoding: Encoding,
    assume_valid: bool,
    first_non_ascii: usize,
    widths: Widths,
) -> StringAttributes {
    let len = view.len() as u64;
    match encoding {
        Encoding::Latin1 => StringAttributes::new(CodeRange::Latin1, len),
        Encoding::Bmp => {
            let range = match first_with_bits(view, first_non_ascii, LATIN1_MASK_U16, widths) {
                None => CodeRange::Latin1,
                Some(_) => CodeRange::Bmp,
            };
            StringAttributes::new(range, len)
        }
        Encoding::Utf32 => StringAttributes::new(utf32_range(view, first_non_ascii, widths), len),
        Encoding::Utf16 => utf16_attributes(view, first_non_ascii, assume_valid, widths),
        Encoding::Utf8 => utf8_attributes(view, first_non_ascii, assume_valid, widths),
    }
}

fn utf32_range(view: &ArrayView, from: usize, widths: Widths) -> CodeRange {
    let (data, stride, len) = (view.data(), view.stride(), view.len());
    let Some(wide) = first_with_bits(view, from, LATIN1_MASK_U32, widths) else {
        return CodeRange::Latin1;
    };
    let outside_bmp = ElementFn(|e: u32| e & BMP_MASK_U32 != 0 || is_surrogate(e));
    let Some(astral) = find_first(data, stride, wide, len, &outside_bmp, widths) else {
        return CodeRange::Bmp;
    };
    let invalid = ElementFn(|e: u32| e > MAX_CODEPOINT || is_surrogate(e));
    match find_first(data, stride, astral, len, &invalid, widths) {
        Some(_) => CodeRange::Broken,
        None => CodeRange::Valid,
    }
}

fn utf16_attributes(view: &ArrayView, from: usize, assume_valid: bool, widths: Widths) -> StringAttributes {
    let (data, len) = (view.data(), view.len());
    let Some(wide) = first_with_bits(view, from, LATIN1_MASK_U16, widths) else {
        return StringAttributes::new(CodeRange::Latin1, len as u64);
    };
    let Some(first_surrogate) = find_first(data, Stride::S2, wide, len, &ElementFn(is_surrogate), widths) else {
        return StringAttributes::new(CodeRange::Bmp, len as u64);
    };

    if assume_valid {
        let high = count_matching(data, Stride::S2, first_surrogate, len, &ElementFn(is_high_surrogate), widths);
        return StringAttributes::new(CodeRange::ValidMultibyte, len as u64 - high);
    }

    let mut op = Utf16Check {
        data,
        broken: false,
        pairs: 0,
    };
    let _ = cascade::run(&mut op, first_surrogate, len, widths);
    // a trailing high surrogate has no lane of its own
    let broken = op.broken || is_high_surrogate(view.get(len - 1));
    let range = if broken {
        CodeRange::BrokenMultibyte
    } else {
        CodeRange::ValidMultibyte
    };
    StringAttributes::new(range, (len as u64) - op.pairs)
}

fn utf8_attributes(view: &ArrayView, from: usize, assume_valid: bool, widths: Widths) -> StringAttributes {
    let (data, len) = (view.data(), view.len());
    if assume_valid {
        let continuations = count_matching(data, Stride::S1, from, len, &ElementFn(is_continuation), widths);
        return StringAttributes::new(CodeRange::ValidMultibyte, (len as u64) - continuations);
    }

    let mut op = Utf8Check {
        data,
        error: Utf8Error::empty(),
        continuations: 0,
    };
    let _ = cascade::run(&mut op, from, len, widths);
    if ends_incomplete(data) {
        op.error |= Utf8Error::TOO_SHORT;
    }
    let range = if op.error.is_empty() {
        CodeRange::ValidMultibyte
    } else {
        CodeRange::BrokenMultibyte
    };
    StringAttributes::new(range, (len as u64) - op.continuations)
}

// =============================================================================
// SCALAR REFERENCE
// =============================================================================

/// Element-at-a-time classification with the same results as
/// [`calc_string_attributes`]; UTF-8 runs the DFA.
pub fn calc_string_attributes_scalar(view: &ArrayView, encoding: Encoding, assume_valid: bool) -> StringAttributes {
    let len = view.len();
    let elements = || (0..len).map(|i| view.get(i));
    let max = elements().max().unwrap_or(0);
    let narrow = |max: u32| {
        if max < 0x80 {
            CodeRange::Ascii
        } else if max < 0x100 {
            CodeRange::Latin1
        } else {
            CodeRange::Bmp
        }
    };

    match encoding {
        Encoding::Latin1 | Encoding::Bmp => StringAttributes::new(narrow(max), len as u64),
        Encoding::Utf32 => {
            let range = if elements().any(|e| e > MAX_CODEPOINT || is_surrogate(e)) {
                CodeRange::Broken
            } else if max > 0xffff {
                CodeRange::Valid
            } else {
                narrow(max)
            };
            StringAttributes::new(range, len as u64)
        }
        Encoding::Utf16 => {
            if !elements().any(is_surrogate) {
                return StringAttributes::new(narrow(max), len as u64);
            }
            let mut codepoints = len as u64;
            let mut broken = false;
            let mut i = 0;
            while i < len {
                let e = view.get(i);
                if is_high_surrogate(e) && i + 1 < len && is_low_surrogate(view.get(i + 1)) {
                    codepoints -= 1;
                    i += 2;
                    continue;
                }
                broken |= is_surrogate(e);
                i += 1;
            }
            if assume_valid {
                codepoints = len as u64 - elements().filter(|&e| is_high_surrogate(e)).count() as u64;
                broken = false;
            }
            let range = if broken {
                CodeRange::BrokenMultibyte
            } else {
                CodeRange::ValidMultibyte
            };
            StringAttributes::new(range, codepoints)
        }
        Encoding::Utf8 => {
            if max < 0x80 {
                return StringAttributes::new(CodeRange::Ascii, len as u64);
            }
            let mut state = UTF8_ACCEPT;
            let mut codepoints = len as u64;
            for &b in view.data() {
                if !assume_valid && state != UTF8_REJECT {
                    state = utf8_step(state, b);
                }
                codepoints -= is_continuation(b as u32) as u64;
            }
            let range = if assume_valid || state == UTF8_ACCEPT {
                CodeRange::ValidMultibyte
            } else {
                CodeRange::BrokenMultibyte
            };
            StringAttributes::new(range, codepoints)
        }
    }
}

// =============================================================================
// FIRST NON-ASCII BYTE - ARCHITECTURE SPECIFIC
// =============================================================================

/// Index of the first byte `>= 0x80`.
///
/// # Safety
/// Requires AVX2 support.
#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn first_non_ascii_avx2(data: &[u8]) -> Option<usize> {
    const LANES: usize = LANES_AVX2_BYTES;

    let len = data.len();
    let mut i = 0;
    while i + LANES <= len {
        let chunk = _mm256_loadu_si256(data.as_ptr().add(i) as *const __m256i);
        // movemask collects the top bit of every byte
        let bits = _mm256_movemask_epi8(chunk) as u32;
        if bits != 0 {
            return Some(i + bits.trailing_zeros() as usize);
        }
        i += LANES;
    }
    data[i..].iter().position(|&b| b >= 0x80).map(|p| i + p)
}

/// # Safety
/// Requires NEON support.
#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn first_non_ascii_neon(data: &[u8]) -> Option<usize> {
    const LANES: usize = LANES_NEON_BYTES;

    let len = data.len();
    let mut i = 0;
    while i + LANES <= len {
        let chunk = vld1q_u8(data.as_ptr().add(i));
        if vmaxvq_u8(chunk) >= 0x80 {
            break;
        }
        i += LANES;
    }
    data[i..].iter().position(|&b| b >= 0x80).map(|p| i + p)
}
