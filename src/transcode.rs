// SPDX-License-Identifier: Apache-2.0

//! Stride conversion
//!
//! Widening zero- or sign-extends each element, narrowing keeps the low bytes.
//! Equal strides are a plain byte copy. The chunk operation is idempotent, so
//! the overlapping end-aligned tail simply rewrites a few elements with the
//! same values.
#![allow(unsafe_op_in_unsafe_fn)]

use std::ops::ControlFlow;

use crate::cascade::{self, ChunkOp, TailMode, Widths};
use crate::types::{ArrayView, ArrayViewMut, ExtendMode, Stride};
use crate::vector::{read_element, write_element, Lanes};

#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
use std::arch::x86_64::{__m128i, __m256i, _mm256_cvtepu8_epi16, _mm256_storeu_si256, _mm_loadu_si128};

#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
use std::arch::aarch64::{vget_low_u8, vld1q_u8, vmovl_high_u8, vmovl_u8, vreinterpretq_u8_u16, vst1q_u8};

#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
use crate::constants::LANES_AVX2_U16;
#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
use crate::constants::LANES_NEON_BYTES;

/// Widens `value` read at `stride` to 32 bits.
#[inline(always)]
pub(crate) fn extend(value: u32, stride: Stride, mode: ExtendMode) -> u32 {
    match (mode, stride) {
        (ExtendMode::Zero, _) | (_, Stride::S4) => value,
        (ExtendMode::Sign, Stride::S1) => value as u8 as i8 as i32 as u32,
        (ExtendMode::Sign, Stride::S2) => value as u16 as i16 as i32 as u32,
    }
}

struct Convert<'a> {
    src: &'a [u8],
    src_stride: Stride,
    dst: &'a mut [u8],
    dst_stride: Stride,
    mode: ExtendMode,
}

impl ChunkOp for Convert<'_> {
    type Output = ();
    const TAIL: TailMode = TailMode::Overlap;

    #[inline(always)]
    fn vector<const W: usize>(&mut self, start: usize, _live: u64) -> ControlFlow<()> {
        let (stride, mode) = (self.src_stride, self.mode);
        Lanes::<W>::load(self.src, stride, start)
            .map(|e| extend(e, stride, mode))
            .store(self.dst, self.dst_stride, start);
        ControlFlow::Continue(())
    }

    #[inline(always)]
    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
        let e = read_element(self.src, self.src_stride, index);
        write_element(
            self.dst,
            self.dst_stride,
            index,
            extend(e, self.src_stride, self.mode),
        );
        ControlFlow::Continue(())
    }
}

/// Converts the first `len` elements of `src` into `dst`.
///
/// The caller guarantees `len <= src.len()` and `len <= dst.len()`.
pub fn transcode(
    src: &ArrayView,
    dst: &mut ArrayViewMut,
    len: usize,
    mode: ExtendMode,
    widths: Widths,
) {
    debug_assert!(len <= src.len() && len <= dst.len());
    let (src_stride, dst_stride) = (src.stride(), dst.stride());
    if src_stride == dst_stride {
        let n = len * src_stride.bytes();
        dst.data_mut()[..n].copy_from_slice(&src.data()[..n]);
        return;
    }
    let mut op = Convert {
        src: src.data(),
        src_stride,
        dst: dst.data_mut(),
        dst_stride,
        mode,
    };
    let _ = cascade::run(&mut op, 0, len, widths);
}

/// Element-at-a-time reference for [`transcode`].
pub fn transcode_scalar(src: &ArrayView, dst: &mut ArrayViewMut, len: usize, mode: ExtendMode) {
    let src_stride = src.stride();
    let dst_stride = dst.stride();
    let data = src.data();
    let out = dst.data_mut();
    for i in 0..len {
        let e = read_element(data, src_stride, i);
        write_element(out, dst_stride, i, extend(e, src_stride, mode));
    }
}

/// Rewrites an equal-stride `(s, s)` pair with `len` elements as a byte copy.
#[inline]
pub fn canonicalize(src_stride: Stride, dst_stride: Stride, len: usize) -> (Stride, Stride, usize) {
    if src_stride == dst_stride {
        (Stride::S1, Stride::S1, len * src_stride.bytes())
    } else {
        (src_stride, dst_stride, len)
    }
}

/// `memmove` of `byte_len` bytes inside `buf`; regions may overlap.
#[inline]
pub fn move_bytes(buf: &mut [u8], src_offset: usize, dst_offset: usize, byte_len: usize) {
    // copy_within picks the direction itself
    buf.copy_within(src_offset..src_offset + byte_len, dst_offset);
}

// =============================================================================
// BYTE TO U16 INFLATION - ARCHITECTURE SPECIFIC
// =============================================================================

/// Zero-extends every byte of `src` into the little-endian `u16` slots of
/// `dst` (`dst.len() == 2 * src.len()`).
///
/// # Safety
/// Requires AVX2 support.
#[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn inflate_u8_u16_avx2(src: &[u8], dst: &mut [u8]) {
    const LANES: usize = LANES_AVX2_U16; // 16 bytes widen into one 256-bit register
    debug_assert_eq!(dst.len(), src.len() * 2);

    let len = src.len();
    let mut i = 0;
    while i + LANES <= len {
        let bytes = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
        let wide = _mm256_cvtepu8_epi16(bytes);
        _mm256_storeu_si256(dst.as_mut_ptr().add(i * 2) as *mut __m256i, wide);
        i += LANES;
    }

    // Scalar remainder
    for j in i..len {
        dst[j * 2] = src[j];
        dst[j * 2 + 1] = 0;
    }
}

/// NEON twin of [`inflate_u8_u16_avx2`].
///
/// # Safety
/// Requires NEON support.
#[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn inflate_u8_u16_neon(src: &[u8], dst: &mut [u8]) {
    const LANES: usize = LANES_NEON_BYTES;
    debug_assert_eq!(dst.len(), src.len() * 2);

    let len = src.len();
    let mut i = 0;
    while i + LANES <= len {
        let bytes = vld1q_u8(src.as_ptr().add(i));
        let lo = vmovl_u8(vget_low_u8(bytes));
        let hi = vmovl_high_u8(bytes);
        let out = dst.as_mut_ptr().add(i * 2);
        vst1q_u8(out, vreinterpretq_u8_u16(lo));
        vst1q_u8(out.add(16), vreinterpretq_u8_u16(hi));
        i += LANES;
    }

    for j in i..len {
        dst[j * 2] = src[j];
        dst[j * 2 + 1] = 0;
    }
}
