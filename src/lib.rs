// SPDX-License-Identifier: Apache-2.0

//! stridekit
//!
//! Kernels over arrays of 1-, 2- or 4-byte elements, the representation
//! language runtimes use for compact strings: stride conversion, predicate
//! search, code range classification with UTF-8/UTF-16 validation, rolling
//! hashes, codepoint index lookup and region comparison.
//!
//! Every kernel walks its input with the same vector cascade: full-width
//! chunks, an overlapping or halving tail, and a scalar loop for inputs too
//! short to vectorize. Reads and writes never leave the caller's region.
//!
//! ## Hardware support
//! - **Portable** lane vectors that the compiler lowers to the target's SIMD
//!   instructions are always available
//! - **AVX2 / NEON** hand-written loops back the hottest byte kernels when the
//!   CPU supports them (disable with the `portable-only` feature)
//! - The `disable-simd` feature forces every operation onto its scalar loop
//!
//! ## Usage
//!
//! ```rust
//! use stridekit::{calc_string_attributes, index_of, ArrayView, CodeRange, Encoding, SearchVariant};
//!
//! // Find the first digit
//! let view = ArrayView::from_bytes(b"order #4711 shipped");
//! let digits = SearchVariant::range(&[(b'0' as u32, b'9' as u32)])?;
//! assert_eq!(index_of(&view, 0, &digits)?, 7);
//!
//! // Classify a UTF-16 buffer
//! let utf16: Vec<u8> = "z\u{1f600}".encode_utf16().flat_map(u16::to_le_bytes).collect();
//! let attrs = calc_string_attributes(&utf16, 0, utf16.len() / 2, Encoding::Utf16, false)?;
//! assert_eq!(attrs.code_range, CodeRange::ValidMultibyte);
//! assert_eq!(attrs.codepoints, 2);
//!
//! // Check available SIMD capabilities
//! let caps = stridekit::get_hw_capabilities();
//! println!("Has AVX2: {}", caps.has_avx2);
//! # Ok::<(), stridekit::KernelError>(())
//! ```

#![allow(clippy::missing_safety_doc)]

pub mod cascade;
pub mod classify;
pub mod codepoint;
pub mod compare;
pub mod constants;
pub mod dispatch;
pub mod hash;
pub mod search;
pub mod transcode;
pub mod types;
pub mod vector;

pub use cascade::Widths;
pub use classify::Utf8Error;
pub use dispatch::*;
pub use types::*;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
#[path = "tests/cascade_tests.rs"]
mod cascade_tests;
#[cfg(test)]
#[path = "tests/classify_tests.rs"]
mod classify_tests;
#[cfg(test)]
#[path = "tests/codepoint_tests.rs"]
mod codepoint_tests;
#[cfg(test)]
#[path = "tests/compare_tests.rs"]
mod compare_tests;
#[cfg(test)]
#[path = "tests/hash_tests.rs"]
mod hash_tests;
#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod search_tests;
#[cfg(test)]
#[path = "tests/transcode_tests.rs"]
mod transcode_tests;
#[cfg(test)]
#[path = "tests/vector_tests.rs"]
mod vector_tests;
