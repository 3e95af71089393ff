// SPDX-License-Identifier: Apache-2.0

//! # Dispatch
//!
//! Public entry points. Each one validates its arguments, then picks a tier:
//! the scalar loop below the operation's SIMD threshold, a hand-written
//! AVX2/NEON kernel where one exists and the CPU supports it, and the
//! portable vector cascade otherwise.

use log::{debug, trace};

use super::constants::*;

#[cfg(target_arch = "aarch64")]
use std::arch::is_aarch64_feature_detected;

use crate::cascade::Widths;
use crate::types::{
    ArrayView, ArrayViewMut, Encoding, ExtendMode, KernelError, Result, SearchVariant, Stride,
    StringAttributes,
};
use crate::transcode as transcode_kernel;
use crate::{classify, codepoint, compare, hash, search};

// =============================================================================
//  HARDWARE DETECTION & SIMD CAPABILITIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareCapabilities {
    pub has_avx2: bool,
    pub has_neon: bool,
}

const CAPS_UNKNOWN: u8 = 0xff;
const CAPS_AVX2: u8 = 1 << 0;
const CAPS_NEON: u8 = 1 << 1;

impl HardwareCapabilities {
    /// Detects CPU features once and caches the answer.
    #[inline]
    pub fn detect() -> Self {
        use std::sync::atomic::{AtomicU8, Ordering};
        static DETECTED: AtomicU8 = AtomicU8::new(CAPS_UNKNOWN);

        let mut bits = DETECTED.load(Ordering::Relaxed);
        if bits == CAPS_UNKNOWN {
            bits = (Self::detect_avx2() as u8 * CAPS_AVX2) | (Self::detect_neon() as u8 * CAPS_NEON);
            DETECTED.store(bits, Ordering::Relaxed);
            debug!(
                "HW CAPABILITIES: avx2={}, neon={}",
                bits & CAPS_AVX2 != 0,
                bits & CAPS_NEON != 0
            );
        }
        HardwareCapabilities {
            has_avx2: bits & CAPS_AVX2 != 0,
            has_neon: bits & CAPS_NEON != 0,
        }
    }

    fn detect_avx2() -> bool {
        #[allow(unused_mut)]
        let mut detected_avx2 = false;

        #[cfg(target_arch = "x86_64")]
        if is_x86_feature_detected!("avx2") {
            detected_avx2 = true;
        }

        detected_avx2
    }

    fn detect_neon() -> bool {
        #[allow(unused_mut)]
        let mut detected_neon = false;

        #[cfg(target_arch = "aarch64")]
        if is_aarch64_feature_detected!("neon") {
            detected_neon = true;
        }

        detected_neon
    }
}

/// Get information about available SIMD capabilities
#[inline]
pub fn get_hw_capabilities() -> HardwareCapabilities {
    HardwareCapabilities::detect()
}

/// Register width the portable cascade sizes its chunks for.
#[inline]
pub fn vector_bytes() -> usize {
    let caps = get_hw_capabilities();

    #[cfg(target_arch = "x86_64")]
    if caps.has_avx2 {
        return VECTOR_BYTES_AVX2;
    }

    #[cfg(target_arch = "aarch64")]
    if caps.has_neon {
        return VECTOR_BYTES_NEON;
    }

    let _ = caps;
    VECTOR_BYTES_PORTABLE
}

#[inline]
fn widths_for(stride: Stride) -> Widths {
    Widths::for_stride(vector_bytes(), stride)
}

fn check_len(len: usize, available: usize) -> Result<()> {
    if len > available {
        return Err(KernelError::InvalidIndex {
            index: len,
            len: available,
        });
    }
    Ok(())
}

// =============================================================================
//  TRANSCODE
// =============================================================================

/// Converts the first `len` elements of `src` into `dst` at `dst`'s stride.
///
/// Widening fills the new high bytes per `mode`; narrowing keeps the low
/// bytes, so elements that do not fit produce unspecified (but in-bounds)
/// output.
///
/// # Examples
/// ```rust
/// use stridekit::{transcode, ArrayView, ArrayViewMut, ExtendMode, Stride};
/// let src = ArrayView::from_bytes(b"hi");
/// let mut out = [0u8; 4];
/// let mut dst = ArrayViewMut::with_stride(&mut out, Stride::S2);
/// transcode(&src, &mut dst, 2, ExtendMode::Zero)?;
/// assert_eq!(out, [b'h', 0, b'i', 0]);
/// # Ok::<(), stridekit::KernelError>(())
/// ```
pub fn transcode(src: &ArrayView, dst: &mut ArrayViewMut, len: usize, mode: ExtendMode) -> Result<()> {
    trace!(
        "TRANSCODE DISPATCH: len={}, src_stride={}, dst_stride={}, mode={:?}",
        len,
        src.stride().bytes(),
        dst.stride().bytes(),
        mode
    );
    check_len(len, src.len())?;
    check_len(len, dst.len())?;

    if len == 0 {
        return Ok(());
    }

    if len < SIMD_THRESHOLD_TRANSCODE {
        transcode_kernel::transcode_scalar(src, dst, len, mode);
        return Ok(());
    }

    let inflate = src.stride() == Stride::S1 && dst.stride() == Stride::S2 && mode == ExtendMode::Zero;

    #[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
    if inflate && get_hw_capabilities().has_avx2 {
        unsafe { transcode_kernel::inflate_u8_u16_avx2(&src.data()[..len], &mut dst.data_mut()[..len * 2]) };
        return Ok(());
    }

    #[cfg(all(target_arch = "aarch64", not(feature = "portable-only")))]
    if inflate && get_hw_capabilities().has_neon {
        unsafe { transcode_kernel::inflate_u8_u16_neon(&src.data()[..len], &mut dst.data_mut()[..len * 2]) };
        return Ok(());
    }

    let _ = inflate;
    let widths = widths_for(src.stride().max(dst.stride()));
    transcode_kernel::transcode(src, dst, len, mode, widths);
    Ok(())
}

/// [`transcode`] with strides supplied at runtime as byte widths.
///
/// Equal-stride pairs are rewritten into a byte copy before dispatch.
#[allow(clippy::too_many_arguments)]
pub fn transcode_dynamic(
    src_bytes: &[u8],
    src_offset: usize,
    src_stride_bytes: usize,
    dst_bytes: &mut [u8],
    dst_offset: usize,
    dst_stride_bytes: usize,
    len: usize,
    mode: ExtendMode,
) -> Result<()> {
    trace!(
        "TRANSCODE_DYNAMIC DISPATCH: len={}, src_stride={}, dst_stride={}",
        len,
        src_stride_bytes,
        dst_stride_bytes
    );
    let (src_stride, dst_stride, len) = transcode_kernel::canonicalize(
        Stride::from_bytes(src_stride_bytes)?,
        Stride::from_bytes(dst_stride_bytes)?,
        len,
    );
    let src = ArrayView::new(src_bytes, src_offset, src_stride, len)?;
    let mut dst = ArrayViewMut::new(dst_bytes, dst_offset, dst_stride, len)?;
    transcode(&src, &mut dst, len, mode)
}

/// `memmove` of `byte_len` bytes within `buf`.
pub fn copy_within(buf: &mut [u8], src_offset: usize, dst_offset: usize, byte_len: usize) -> Result<()> {
    trace!(
        "COPY_WITHIN DISPATCH: src_offset={}, dst_offset={}, byte_len={}",
        src_offset,
        dst_offset,
        byte_len
    );
    for offset in [src_offset, dst_offset] {
        match offset.checked_add(byte_len) {
            Some(end) if end <= buf.len() => {}
            _ => {
                return Err(KernelError::OutOfBounds {
                    byte_offset: offset,
                    len: byte_len,
                    stride: 1,
                    buffer_len: buf.len(),
                })
            }
        }
    }
    transcode_kernel::move_bytes(buf, src_offset, dst_offset, byte_len);
    Ok(())
}

// =============================================================================
//  SEARCH
// =============================================================================

/// Needle bytes of a byte-stride `Any` search; wider needles can never match.
#[cfg(not(feature = "portable-only"))]
fn byte_needles(variant: &SearchVariant) -> Option<([u8; 4], usize)> {
    let SearchVariant::Any(needles) = variant else {
        return None;
    };
    let mut bytes = [0u8; 4];
    let mut count = 0;
    for &n in needles.as_slice() {
        if let Ok(b) = u8::try_from(n) {
            bytes[count] = b;
            count += 1;
        }
    }
    Some((bytes, count))
}

/// Lowest index `i >= from_index` where `variant` holds, or `-1`.
///
/// # Examples
/// ```rust
/// use stridekit::{index_of, ArrayView, SearchVariant};
/// let view = ArrayView::from_bytes(b"key=value;");
/// let variant = SearchVariant::any(&[b'=' as u32, b';' as u32])?;
/// assert_eq!(index_of(&view, 0, &variant)?, 3);
/// assert_eq!(index_of(&view, 4, &variant)?, 9);
/// # Ok::<(), stridekit::KernelError>(())
/// ```
pub fn index_of(view: &ArrayView, from_index: usize, variant: &SearchVariant) -> Result<i64> {
    trace!(
        "INDEX_OF DISPATCH: len={}, stride={}, from_index={}, variant={:?}",
        view.len(),
        view.stride().bytes(),
        from_index,
        variant
    );
    if from_index > view.len() {
        return Err(KernelError::InvalidIndex {
            index: from_index,
            len: view.len(),
        });
    }

    if view.len() - from_index < SIMD_THRESHOLD_SEARCH {
        return Ok(search::index_of_scalar(view, from_index, variant));
    }

    #[cfg(not(feature = "portable-only"))]
    if view.stride() == Stride::S1 {
        if let Some((bytes, count)) = byte_needles(variant) {
            if count == 0 {
                return Ok(crate::types::NOT_FOUND);
            }
            let needles = &bytes[..count];

            #[cfg(target_arch = "x86_64")]
            if get_hw_capabilities().has_avx2 {
                let found = unsafe { search::index_of_any_u8_avx2(view.data(), from_index, needles) };
                return Ok(found.map_or(crate::types::NOT_FOUND, |i| i as i64));
            }

            #[cfg(target_arch = "aarch64")]
            if get_hw_capabilities().has_neon {
                let found = unsafe { search::index_of_any_u8_neon(view.data(), from_index, needles) };
                return Ok(found.map_or(crate::types::NOT_FOUND, |i| i as i64));
            }

            let _ = needles;
        }
    }

    Ok(search::index_of(view, from_index, variant, widths_for(view.stride())))
}

/// Highest index in `to_index..from_index` where `variant` holds, or `-1`.
/// Two-element variants only report pairs lying entirely inside that range.
pub fn last_index_of(
    view: &ArrayView,
    from_index: usize,
    to_index: usize,
    variant: &SearchVariant,
) -> Result<i64> {
    trace!(
        "LAST_INDEX_OF DISPATCH: len={}, stride={}, from_index={}, to_index={}",
        view.len(),
        view.stride().bytes(),
        from_index,
        to_index
    );
    if from_index > view.len() {
        return Err(KernelError::InvalidIndex {
            index: from_index,
            len: view.len(),
        });
    }
    if to_index > from_index {
        return Err(KernelError::InvalidArgument(format!(
            "to_index {} is past from_index {}",
            to_index, from_index
        )));
    }

    if from_index - to_index < SIMD_THRESHOLD_SEARCH {
        return Ok(search::last_index_of_scalar(view, from_index, to_index, variant));
    }
    Ok(search::last_index_of(
        view,
        from_index,
        to_index,
        variant,
        widths_for(view.stride()),
    ))
}

fn check_needle_mask(needle: &ArrayView, mask: Option<&ArrayView>) -> Result<()> {
    if let Some(m) = mask {
        if m.stride() != needle.stride() {
            return Err(KernelError::InvalidArgument(format!(
                "mask stride {} differs from needle stride {}",
                m.stride().bytes(),
                needle.stride().bytes()
            )));
        }
        check_len(needle.len(), m.len())?;
    }
    Ok(())
}

/// Lowest index `i >= from_index` where `needle` occurs in `haystack`, with
/// `mask` OR-ed into the haystack elements before comparison, or `-1`.
///
/// # Examples
/// ```rust
/// use stridekit::{index_of_string, ArrayView};
/// let haystack = ArrayView::from_bytes(b"Content-Type: text/html");
/// let needle = ArrayView::from_bytes(b"type");
/// let fold = [0x20u8; 4];
/// let mask = ArrayView::from_bytes(&fold);
/// assert_eq!(index_of_string(&haystack, 0, &needle, None)?, -1);
/// assert_eq!(index_of_string(&haystack, 0, &needle, Some(&mask))?, 8);
/// # Ok::<(), stridekit::KernelError>(())
/// ```
pub fn index_of_string(
    haystack: &ArrayView,
    from_index: usize,
    needle: &ArrayView,
    mask: Option<&ArrayView>,
) -> Result<i64> {
    trace!(
        "INDEX_OF_STRING DISPATCH: len={}, stride={}, from_index={}, needle_len={}, needle_stride={}, masked={}",
        haystack.len(),
        haystack.stride().bytes(),
        from_index,
        needle.len(),
        needle.stride().bytes(),
        mask.is_some()
    );
    if from_index > haystack.len() {
        return Err(KernelError::InvalidIndex {
            index: from_index,
            len: haystack.len(),
        });
    }
    check_needle_mask(needle, mask)?;

    if haystack.len() - from_index < SIMD_THRESHOLD_SEARCH {
        return Ok(search::index_of_string_scalar(haystack, from_index, needle, mask));
    }
    Ok(search::index_of_string(
        haystack,
        from_index,
        needle,
        mask,
        widths_for(haystack.stride()),
    ))
}

/// Highest index whose whole `needle` match lies in `to_index..from_index`,
/// or `-1`.
pub fn last_index_of_string(
    haystack: &ArrayView,
    from_index: usize,
    to_index: usize,
    needle: &ArrayView,
    mask: Option<&ArrayView>,
) -> Result<i64> {
    trace!(
        "LAST_INDEX_OF_STRING DISPATCH: len={}, stride={}, from_index={}, to_index={}, needle_len={}, masked={}",
        haystack.len(),
        haystack.stride().bytes(),
        from_index,
        to_index,
        needle.len(),
        mask.is_some()
    );
    if from_index > haystack.len() {
        return Err(KernelError::InvalidIndex {
            index: from_index,
            len: haystack.len(),
        });
    }
    if to_index > from_index {
        return Err(KernelError::InvalidArgument(format!(
            "to_index {} is past from_index {}",
            to_index, from_index
        )));
    }
    check_needle_mask(needle, mask)?;

    if from_index - to_index < SIMD_THRESHOLD_SEARCH {
        return Ok(search::last_index_of_string_scalar(
            haystack, from_index, to_index, needle, mask,
        ));
    }
    Ok(search::last_index_of_string(
        haystack,
        from_index,
        to_index,
        needle,
        mask,
        widths_for(haystack.stride()),
    ))
}

// =============================================================================
//  CLASSIFICATION
// =============================================================================

/// Code range and codepoint count of `len` elements of `bytes` starting at
/// `byte_offset`, read as `encoding`.
///
/// # Examples
/// ```rust
/// use stridekit::{calc_string_attributes, CodeRange, Encoding};
/// let text = "na\u{ef}ve \u{1f600}".as_bytes();
/// let attrs = calc_string_attributes(text, 0, text.len(), Encoding::Utf8, false)?;
/// assert_eq!(attrs.code_range, CodeRange::ValidMultibyte);
/// assert_eq!(attrs.codepoints, 7);
/// # Ok::<(), stridekit::KernelError>(())
/// ```
pub fn calc_string_attributes(
    bytes: &[u8],
    byte_offset: usize,
    len: usize,
    encoding: Encoding,
    assume_valid: bool,
) -> Result<StringAttributes> {
    trace!(
        "CALC_STRING_ATTRIBUTES DISPATCH: len={}, encoding={:?}, assume_valid={}",
        len,
        encoding,
        assume_valid
    );
    let view = ArrayView::new(bytes, byte_offset, encoding.stride(), len)?;

    if len < SIMD_THRESHOLD_CLASSIFY {
        return Ok(classify::calc_string_attributes_scalar(&view, encoding, assume_valid));
    }

    let widths = widths_for(view.stride());

    #[cfg(not(feature = "portable-only"))]
    if view.stride() == Stride::S1 {
        #[cfg(target_arch = "x86_64")]
        if get_hw_capabilities().has_avx2 {
            return Ok(match unsafe { classify::first_non_ascii_avx2(view.data()) } {
                None => StringAttributes::new(crate::types::CodeRange::Ascii, len as u64),
                Some(first) => classify::classify_from(&view, encoding, assume_valid, first, widths),
            });
        }

        #[cfg(target_arch = "aarch64")]
        if get_hw_capabilities().has_neon {
            return Ok(match unsafe { classify::first_non_ascii_neon(view.data()) } {
                None => StringAttributes::new(crate::types::CodeRange::Ascii, len as u64),
                Some(first) => classify::classify_from(&view, encoding, assume_valid, first, widths),
            });
        }
    }

    Ok(classify::calc_string_attributes(&view, encoding, assume_valid, widths))
}

// =============================================================================
//  HASHING
// =============================================================================

/// `seed` folded with every element as `h * 31 + e`, wrapping at 32 bits.
///
/// # Examples
/// ```rust
/// use stridekit::{rolling_hash, ArrayView};
/// let h = rolling_hash(&ArrayView::from_bytes(b"abc"), 0)?;
/// assert_eq!(h, 96354);
/// # Ok::<(), stridekit::KernelError>(())
/// ```
pub fn rolling_hash(view: &ArrayView, seed: i32) -> Result<i32> {
    trace!(
        "ROLLING_HASH DISPATCH: len={}, stride={}",
        view.len(),
        view.stride().bytes()
    );
    if view.len() < SIMD_THRESHOLD_HASH {
        return Ok(hash::rolling_hash_scalar(view, seed));
    }
    Ok(hash::rolling_hash(view, seed, widths_for(view.stride())))
}

// =============================================================================
//  CODEPOINT INDEX
// =============================================================================

/// Byte index where codepoint `codepoint_index` starts in valid UTF-8 or
/// UTF-16 input, or `-1` if there are not that many codepoints.
pub fn codepoint_index_to_byte_index(
    bytes: &[u8],
    byte_offset: usize,
    len: usize,
    codepoint_index: u64,
    encoding: Encoding,
) -> Result<i64> {
    trace!(
        "CODEPOINT_INDEX DISPATCH: len={}, codepoint_index={}, encoding={:?}",
        len,
        codepoint_index,
        encoding
    );
    let stride = codepoint::supported_stride(encoding).ok_or_else(|| {
        KernelError::Unsupported(format!("codepoint index lookup for {:?}", encoding))
    })?;
    let view = ArrayView::new(bytes, byte_offset, stride, len)?;

    if len < SIMD_THRESHOLD_CODEPOINT {
        return Ok(codepoint::codepoint_index_to_byte_index_scalar(&view, codepoint_index));
    }
    Ok(codepoint::codepoint_index_to_byte_index(
        &view,
        codepoint_index,
        widths_for(stride),
    ))
}

// =============================================================================
//  COMPARISON
// =============================================================================

/// `(a[i] | mask[i]) == b[i]` for every `i < len`; `mask` must share `b`'s stride.
pub fn region_equals(a: &ArrayView, b: &ArrayView, mask: Option<&ArrayView>, len: usize) -> Result<bool> {
    trace!(
        "REGION_EQUALS DISPATCH: len={}, a_stride={}, b_stride={}, masked={}",
        len,
        a.stride().bytes(),
        b.stride().bytes(),
        mask.is_some()
    );
    check_len(len, a.len())?;
    check_len(len, b.len())?;
    if let Some(m) = mask {
        if m.stride() != b.stride() {
            return Err(KernelError::InvalidArgument(format!(
                "mask stride {} differs from region stride {}",
                m.stride().bytes(),
                b.stride().bytes()
            )));
        }
        check_len(len, m.len())?;
    }

    if len < SIMD_THRESHOLD_COMPARE {
        return Ok(compare::region_equals_scalar(a, b, mask, len));
    }
    let widths = widths_for(a.stride().max(b.stride()));
    Ok(compare::region_equals(a, b, mask, len, widths))
}

/// Difference `a[i] - b[i]` at the first unequal element, or `0`.
pub fn memcmp(a: &ArrayView, b: &ArrayView, len: usize) -> Result<i32> {
    trace!(
        "MEMCMP DISPATCH: len={}, a_stride={}, b_stride={}",
        len,
        a.stride().bytes(),
        b.stride().bytes()
    );
    check_len(len, a.len())?;
    check_len(len, b.len())?;

    if len < SIMD_THRESHOLD_COMPARE {
        return Ok(compare::memcmp_scalar(a, b, len));
    }
    let widths = widths_for(a.stride().max(b.stride()));
    Ok(compare::memcmp(a, b, len, widths))
}
