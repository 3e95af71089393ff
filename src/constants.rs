// SPDX-License-Identifier: Apache-2.0

//! Common constants used across implementations
//!
//! This module centralizes register widths, lane limits, thresholds, and the
//! numeric constants the kernels share.

// =============================================================================
// SIMD Register Widths by Architecture
// =============================================================================

// x86_64 (AVX2, 256-bit registers)
#[cfg(target_arch = "x86_64")]
pub use x86_constants::*;
#[cfg(target_arch = "x86_64")]
mod x86_constants {
    pub const VECTOR_BYTES_AVX2: usize = 32;
    pub const LANES_AVX2_BYTES: usize = 32; // 256/8 = 32 byte elements
    pub const LANES_AVX2_U16: usize = 16; // 256/16 = 16 u16 elements
}

// NEON (ARM64 only, 128-bit registers)
#[cfg(target_arch = "aarch64")]
pub use neon_constants::*;
#[cfg(target_arch = "aarch64")]
mod neon_constants {
    pub const VECTOR_BYTES_NEON: usize = 16;
    pub const LANES_NEON_BYTES: usize = 16; // 128/8 = 16 byte elements
}

/// Register width assumed by the portable cascade when no native tier is detected.
pub const VECTOR_BYTES_PORTABLE: usize = 16;

/// Smallest vector chunk in bytes; shorter remainders run the scalar loop.
pub const MIN_VECTOR_BYTES: usize = 8;

/// Widest lane count the cascade can express (one bit per lane in a `u64` mask).
pub const MAX_LANES: usize = 64;

// =============================================================================
// SIMD Performance Thresholds
// =============================================================================

// When disable-simd feature is enabled, set all thresholds to usize::MAX to force scalar implementations
#[cfg(feature = "disable-simd")]
mod thresholds {
    pub const SIMD_THRESHOLD_TRANSCODE: usize = usize::MAX;
    pub const SIMD_THRESHOLD_SEARCH: usize = usize::MAX;
    pub const SIMD_THRESHOLD_CLASSIFY: usize = usize::MAX;
    pub const SIMD_THRESHOLD_HASH: usize = usize::MAX;
    pub const SIMD_THRESHOLD_CODEPOINT: usize = usize::MAX;
    pub const SIMD_THRESHOLD_COMPARE: usize = usize::MAX;
}

#[cfg(not(feature = "disable-simd"))]
mod thresholds {
    pub const SIMD_THRESHOLD_TRANSCODE: usize = 16; // Stride conversion
    pub const SIMD_THRESHOLD_SEARCH: usize = 16; // indexOf family
    pub const SIMD_THRESHOLD_CLASSIFY: usize = 16; // Code range / validation
    pub const SIMD_THRESHOLD_HASH: usize = 16; // Polynomial hash
    pub const SIMD_THRESHOLD_CODEPOINT: usize = 32; // Codepoint index lookup
    pub const SIMD_THRESHOLD_COMPARE: usize = 16; // Region equals / memcmp
}

pub use thresholds::*;

// =============================================================================
// HASH CONSTANTS
// =============================================================================

pub const HASH_MULTIPLIER: u32 = 31;

/// `HASH_POWERS[k] == 31^k` (wrapping), for every chunk width up to `MAX_LANES`.
pub const HASH_POWERS: [u32; MAX_LANES + 1] = {
    let mut table = [1u32; MAX_LANES + 1];
    let mut k = 1;
    while k <= MAX_LANES {
        table[k] = table[k - 1].wrapping_mul(HASH_MULTIPLIER);
        k += 1;
    }
    table
};

// =============================================================================
// UNICODE CONSTANTS
// =============================================================================

pub const MAX_CODEPOINT: u32 = 0x10ffff;
pub const SURROGATE_MIN: u32 = 0xd800;
pub const SURROGATE_MAX: u32 = 0xdfff;

// Masked-bits-zero tests for the nested alphabets.
pub const ASCII_MASK_U16: u32 = 0xff80;
pub const LATIN1_MASK_U16: u32 = 0xff00;
pub const ASCII_MASK_U32: u32 = 0xffff_ff80;
pub const LATIN1_MASK_U32: u32 = 0xffff_ff00;
pub const BMP_MASK_U32: u32 = 0xffff_0000;
