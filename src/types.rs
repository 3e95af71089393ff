// SPDX-License-Identifier: Apache-2.0

// types.rs for stridekit
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("Invalid stride: {0} bytes (expected 1, 2 or 4)")]
    InvalidStride(usize),
    #[error(
        "Region out of bounds: byte_offset={byte_offset}, len={len}, stride={stride}, buffer_len={buffer_len}"
    )]
    OutOfBounds {
        byte_offset: usize,
        len: usize,
        stride: usize,
        buffer_len: usize,
    },
    #[error("Index out of range: index={index}, len={len}")]
    InvalidIndex { index: usize, len: usize },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Sentinel returned by the search kernels when nothing matches.
pub const NOT_FOUND: i64 = -1;

// =============================================================================
// STRIDES AND VIEWS
// =============================================================================

/// Byte width of one array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stride {
    S1 = 1,
    S2 = 2,
    S4 = 4,
}

impl Stride {
    pub const ALL: [Stride; 3] = [Stride::S1, Stride::S2, Stride::S4];

    #[inline]
    pub fn from_bytes(bytes: usize) -> Result<Self> {
        match bytes {
            1 => Ok(Stride::S1),
            2 => Ok(Stride::S2),
            4 => Ok(Stride::S4),
            other => Err(KernelError::InvalidStride(other)),
        }
    }

    #[inline(always)]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub const fn log2(self) -> u32 {
        match self {
            Stride::S1 => 0,
            Stride::S2 => 1,
            Stride::S4 => 2,
        }
    }

    /// Largest element value representable at this stride.
    #[inline(always)]
    pub const fn max_value(self) -> u32 {
        match self {
            Stride::S1 => 0xff,
            Stride::S2 => 0xffff,
            Stride::S4 => u32::MAX,
        }
    }
}

/// Read-only window of `len` elements of width `stride`.
///
/// The byte offset is consumed at construction: `data` is exactly the
/// `len * stride` bytes the kernels are allowed to touch.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a> {
    data: &'a [u8],
    stride: Stride,
    len: usize,
}

impl<'a> ArrayView<'a> {
    pub fn new(bytes: &'a [u8], byte_offset: usize, stride: Stride, len: usize) -> Result<Self> {
        let data = region(bytes.len(), byte_offset, stride, len).map(|r| &bytes[r])?;
        Ok(Self { data, stride, len })
    }

    /// Whole buffer as a stride-1 view.
    #[inline]
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self {
            data: bytes,
            stride: Stride::S1,
            len: bytes.len(),
        }
    }

    /// Whole buffer as `bytes.len() / stride` elements. Trailing bytes are ignored.
    #[inline]
    pub fn with_stride(bytes: &'a [u8], stride: Stride) -> Self {
        let len = bytes.len() >> stride.log2();
        Self {
            data: &bytes[..len << stride.log2()],
            stride,
            len,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn stride(&self) -> Stride {
        self.stride
    }

    #[inline(always)]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Element `index`, zero-extended.
    #[inline(always)]
    pub fn get(&self, index: usize) -> u32 {
        crate::vector::read_element(self.data, self.stride, index)
    }

    /// Elements `start..` as their own view; `start` past the end gives an
    /// empty view.
    #[inline]
    pub fn skip(&self, start: usize) -> Self {
        let start = start.min(self.len);
        Self {
            data: &self.data[start << self.stride.log2()..],
            stride: self.stride,
            len: self.len - start,
        }
    }
}

/// Writable window, the destination side of a transcode.
#[derive(Debug)]
pub struct ArrayViewMut<'a> {
    data: &'a mut [u8],
    stride: Stride,
    len: usize,
}

impl<'a> ArrayViewMut<'a> {
    pub fn new(
        bytes: &'a mut [u8],
        byte_offset: usize,
        stride: Stride,
        len: usize,
    ) -> Result<Self> {
        let r = region(bytes.len(), byte_offset, stride, len)?;
        Ok(Self {
            data: &mut bytes[r],
            stride,
            len,
        })
    }

    #[inline]
    pub fn with_stride(bytes: &'a mut [u8], stride: Stride) -> Self {
        let len = bytes.len() >> stride.log2();
        Self {
            data: &mut bytes[..len << stride.log2()],
            stride,
            len,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn stride(&self) -> Stride {
        self.stride
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> u32 {
        crate::vector::read_element(self.data, self.stride, index)
    }
}

fn region(
    buffer_len: usize,
    byte_offset: usize,
    stride: Stride,
    len: usize,
) -> Result<std::ops::Range<usize>> {
    let end = len
        .checked_mul(stride.bytes())
        .and_then(|n| n.checked_add(byte_offset));
    match end {
        Some(end) if end <= buffer_len => Ok(byte_offset..end),
        _ => Err(KernelError::OutOfBounds {
            byte_offset,
            len,
            stride: stride.bytes(),
            buffer_len,
        }),
    }
}

/// Little-endian encoding of `values` at `stride`. Values wider than the
/// stride are truncated.
pub fn encode_elements(values: &[u32], stride: Stride) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * stride.bytes());
    for &v in values {
        out.extend_from_slice(&v.to_le_bytes()[..stride.bytes()]);
    }
    out
}

// =============================================================================
// OPERATION DESCRIPTORS
// =============================================================================

/// How widening transcodes fill the new high bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtendMode {
    #[default]
    Zero,
    Sign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// 8-bit, one codepoint per byte.
    Latin1,
    /// 16-bit, one codepoint per char, surrogates carry no meaning.
    Bmp,
    Utf8,
    Utf16,
    Utf32,
}

impl Encoding {
    #[inline]
    pub const fn stride(self) -> Stride {
        match self {
            Encoding::Latin1 | Encoding::Utf8 => Stride::S1,
            Encoding::Bmp | Encoding::Utf16 => Stride::S2,
            Encoding::Utf32 => Stride::S4,
        }
    }
}

/// Up to four needles for [`SearchVariant::Any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Needles {
    values: [u32; 4],
    count: u8,
}

impl Needles {
    pub fn new(values: &[u32]) -> Result<Self> {
        if values.is_empty() || values.len() > 4 {
            return Err(KernelError::InvalidArgument(format!(
                "expected 1 to 4 needles, got {}",
                values.len()
            )));
        }
        let mut buf = [values[0]; 4];
        buf[..values.len()].copy_from_slice(values);
        Ok(Self {
            values: buf,
            count: values.len() as u8,
        })
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u32] {
        &self.values[..self.count as usize]
    }
}

/// One or two inclusive ranges for [`SearchVariant::Range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranges {
    bounds: [(u32, u32); 2],
    count: u8,
}

impl Ranges {
    pub fn new(bounds: &[(u32, u32)]) -> Result<Self> {
        if bounds.is_empty() || bounds.len() > 2 {
            return Err(KernelError::InvalidArgument(format!(
                "expected 1 or 2 ranges, got {}",
                bounds.len()
            )));
        }
        if let Some(&(lo, hi)) = bounds.iter().find(|(lo, hi)| lo > hi) {
            return Err(KernelError::InvalidArgument(format!(
                "empty range [{lo:#x}, {hi:#x}]"
            )));
        }
        let mut buf = [bounds[0]; 2];
        buf[..bounds.len()].copy_from_slice(bounds);
        Ok(Self {
            bounds: buf,
            count: bounds.len() as u8,
        })
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[(u32, u32)] {
        &self.bounds[..self.count as usize]
    }
}

/// Two 16-entry tables indexed by an element's low and high nibble.
/// An element matches when `low[e & 0xf] & high[e >> 4] != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NibbleTable {
    pub low: [u8; 16],
    pub high: [u8; 16],
}

impl NibbleTable {
    pub const fn new(low: [u8; 16], high: [u8; 16]) -> Self {
        Self { low, high }
    }

    /// Caller-supplied 32-byte layout: low table first, then high table.
    pub fn from_bytes(table: &[u8; 32]) -> Self {
        let mut low = [0u8; 16];
        let mut high = [0u8; 16];
        low.copy_from_slice(&table[..16]);
        high.copy_from_slice(&table[16..]);
        Self { low, high }
    }

    /// Builds a table that matches exactly the bytes in `set`.
    ///
    /// Every high nibble maps to the set of low nibbles that occur with it;
    /// each distinct set needs one bit, so at most eight distinct sets fit.
    /// Returns `None` when the set needs more.
    pub fn from_byte_set(set: &[u8]) -> Option<Self> {
        let mut lows_by_high = [0u16; 16];
        for &b in set {
            lows_by_high[(b >> 4) as usize] |= 1 << (b & 0xf);
        }

        let mut classes: Vec<u16> = Vec::with_capacity(8);
        let mut table = Self::new([0; 16], [0; 16]);
        for (hi, &lows) in lows_by_high.iter().enumerate() {
            if lows == 0 {
                continue;
            }
            let bit = match classes.iter().position(|&c| c == lows) {
                Some(pos) => pos,
                None => {
                    if classes.len() == 8 {
                        return None;
                    }
                    classes.push(lows);
                    classes.len() - 1
                }
            };
            table.high[hi] |= 1 << bit;
        }
        for (bit, &lows) in classes.iter().enumerate() {
            for lo in 0..16 {
                if lows & (1 << lo) != 0 {
                    table.low[lo] |= 1 << bit;
                }
            }
        }
        Some(table)
    }

    /// Scalar membership test. Values of 256 and above never match.
    #[inline(always)]
    pub fn matches(&self, value: u32) -> bool {
        value < 0x100 && self.low[(value & 0xf) as usize] & self.high[(value >> 4) as usize] != 0
    }
}

/// Predicate evaluated by the search kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVariant {
    /// Element equals any of the needles.
    Any(Needles),
    /// Element lies in any of the inclusive ranges.
    Range(Ranges),
    /// `(element | mask) == value`.
    WithMask { value: u32, mask: u32 },
    /// `e[i] == first && e[i + 1] == second`; reports `i`.
    TwoConsecutive { first: u32, second: u32 },
    /// `(e[i] | mask_first) == first && (e[i + 1] | mask_second) == second`.
    TwoConsecutiveWithMask {
        first: u32,
        second: u32,
        mask_first: u32,
        mask_second: u32,
    },
    /// Nibble-table membership, see [`NibbleTable`].
    Table(NibbleTable),
}

impl SearchVariant {
    pub fn any(needles: &[u32]) -> Result<Self> {
        Needles::new(needles).map(SearchVariant::Any)
    }

    pub fn range(bounds: &[(u32, u32)]) -> Result<Self> {
        Ranges::new(bounds).map(SearchVariant::Range)
    }

    /// Number of consecutive elements one match position inspects.
    #[inline]
    pub const fn span(&self) -> usize {
        match self {
            SearchVariant::TwoConsecutive { .. } | SearchVariant::TwoConsecutiveWithMask { .. } => 2,
            _ => 1,
        }
    }
}

// =============================================================================
// CLASSIFICATION RESULTS
// =============================================================================

/// Coarse description of the narrowest representation a buffer fits in.
///
/// `Valid` and `Broken` are the fixed-width (UTF-32) outcomes; the
/// `*Multibyte` variants are produced for UTF-8 and UTF-16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CodeRange {
    Ascii = 0,
    Latin1 = 1,
    Bmp = 2,
    Valid = 3,
    Broken = 4,
    ValidMultibyte = 5,
    BrokenMultibyte = 6,
}

impl CodeRange {
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => CodeRange::Ascii,
            1 => CodeRange::Latin1,
            2 => CodeRange::Bmp,
            3 => CodeRange::Valid,
            4 => CodeRange::Broken,
            5 => CodeRange::ValidMultibyte,
            6 => CodeRange::BrokenMultibyte,
            _ => return None,
        })
    }

    #[inline]
    pub const fn is_broken(self) -> bool {
        matches!(self, CodeRange::Broken | CodeRange::BrokenMultibyte)
    }

    /// Position in the nesting `Ascii < Latin1 < Bmp < full range < broken`.
    #[inline]
    pub const fn rank(self) -> u8 {
        match self {
            CodeRange::Ascii => 0,
            CodeRange::Latin1 => 1,
            CodeRange::Bmp => 2,
            CodeRange::Valid | CodeRange::ValidMultibyte => 3,
            CodeRange::Broken | CodeRange::BrokenMultibyte => 4,
        }
    }
}

/// Code range plus codepoint count of one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringAttributes {
    pub code_range: CodeRange,
    pub codepoints: u64,
}

impl StringAttributes {
    #[inline]
    pub const fn new(code_range: CodeRange, codepoints: u64) -> Self {
        Self {
            code_range,
            codepoints,
        }
    }

    /// `codepoints << 32 | tag`, the single-word form runtimes store.
    ///
    /// Only the low 32 bits of `codepoints` fit; larger counts are a caller
    /// error and trip a debug assertion.
    #[inline]
    pub const fn pack(self) -> u64 {
        debug_assert!(self.codepoints <= u32::MAX as u64);
        (self.codepoints << 32) | self.code_range.tag() as u64
    }

    pub fn unpack(packed: u64) -> Option<Self> {
        CodeRange::from_tag((packed & 0xff) as u8).map(|cr| Self::new(cr, packed >> 32))
    }
}
