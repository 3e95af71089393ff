// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// TRANSCODE / MEMMOVE TESTS
// =============================================================================

#[cfg(test)]
mod tests {
  use crate::cascade::Widths;
  use crate::test_utils::config_test_logger;
  use crate::transcode::{self, canonicalize, extend};
  use crate::types::{encode_elements, ArrayView, ArrayViewMut, ExtendMode, KernelError, Stride};

  const SENTINEL: u8 = 0xaa;

  /// Expected destination: converted elements, then untouched sentinel bytes.
  fn expected_output(values: &[u32], src: Stride, dst: Stride, len: usize, mode: ExtendMode, capacity: usize) -> Vec<u8> {
    let converted: Vec<u32> = values[..len]
      .iter()
      .map(|&v| match (mode, src) {
        (ExtendMode::Sign, Stride::S1) => v as u8 as i8 as i32 as u32,
        (ExtendMode::Sign, Stride::S2) => v as u16 as i16 as i32 as u32,
        _ => v,
      })
      .collect();
    let mut out = encode_elements(&converted, dst);
    out.resize(capacity * dst.bytes(), SENTINEL);
    out
  }

  // =============================================================================
  //   TRIPLE-PATH TEST HELPERS
  // =============================================================================

  fn test_transcode_triple_paths(values: &[u32], src_stride: Stride, dst_stride: Stride, len: usize, mode: ExtendMode) {
    let src_bytes = encode_elements(values, src_stride);
    let src = ArrayView::with_stride(&src_bytes, src_stride);
    // the buffer keeps only what fits the source stride
    let stored: Vec<u32> = values.iter().map(|&v| v & src_stride.max_value()).collect();
    let capacity = values.len() + 3;
    let expected = expected_output(&stored, src_stride, dst_stride, len, mode, capacity);

    //  SCALAR PATH TEST
    let mut out = vec![SENTINEL; capacity * dst_stride.bytes()];
    transcode::transcode_scalar(&src, &mut ArrayViewMut::with_stride(&mut out, dst_stride), len, mode);
    assert_eq!(out, expected, "scalar {:?}->{:?} len={}", src_stride, dst_stride, len);

    //  SIMD PATH TEST
    for max in [1usize, 2, 4, 8, 16, 32, 64] {
      let mut out = vec![SENTINEL; capacity * dst_stride.bytes()];
      transcode::transcode(
        &src,
        &mut ArrayViewMut::with_stride(&mut out, dst_stride),
        len,
        mode,
        Widths::new(max, 1),
      );
      assert_eq!(out, expected, "cascade max={} {:?}->{:?} len={}", max, src_stride, dst_stride, len);
    }

    //  DISPATCH PATH TEST
    let mut out = vec![SENTINEL; capacity * dst_stride.bytes()];
    crate::transcode(&src, &mut ArrayViewMut::with_stride(&mut out, dst_stride), len, mode).unwrap();
    assert_eq!(out, expected, "dispatch {:?}->{:?} len={}", src_stride, dst_stride, len);
  }

  fn sample(len: usize) -> Vec<u32> {
    (0..len as u32).map(|i| i.wrapping_mul(0x9e37_79b9) >> 7).collect()
  }

  // =============================================================================
  // STRIDE PAIRS
  // =============================================================================

  #[test]
  fn test_every_stride_pair_zero_extend() {
    config_test_logger();
    for src in Stride::ALL {
      for dst in Stride::ALL {
        for len in [0usize, 1, 7, 16, 33, 64, 100, 257] {
          test_transcode_triple_paths(&sample(len), src, dst, len, ExtendMode::Zero);
        }
      }
    }
  }

  #[test]
  fn test_sign_extension() {
    let values: Vec<u32> = (0..90).map(|i| if i % 3 == 0 { 0x80 + i } else { i }).collect();
    test_transcode_triple_paths(&values, Stride::S1, Stride::S2, 90, ExtendMode::Sign);
    test_transcode_triple_paths(&values, Stride::S1, Stride::S4, 90, ExtendMode::Sign);
    let wide: Vec<u32> = (0..70).map(|i| 0x7ff0 + i * 3).collect();
    test_transcode_triple_paths(&wide, Stride::S2, Stride::S4, 70, ExtendMode::Sign);
  }

  #[test]
  fn test_partial_length_leaves_rest_untouched() {
    let values = sample(120);
    test_transcode_triple_paths(&values, Stride::S1, Stride::S2, 50, ExtendMode::Zero);
    test_transcode_triple_paths(&values, Stride::S4, Stride::S1, 99, ExtendMode::Zero);
  }

  #[test]
  fn test_byte_inflation_large() {
    // the S1 -> S2 zero-extend pair has dedicated AVX2/NEON kernels
    let text: Vec<u32> = (0..4099u32).map(|i| (i * 31 + 7) & 0xff).collect();
    test_transcode_triple_paths(&text, Stride::S1, Stride::S2, 4099, ExtendMode::Zero);
  }

  // =============================================================================
  // DYNAMIC STRIDES
  // =============================================================================

  #[test]
  fn test_dynamic_offsets() {
    let src = [0xffu8, 0xff, b'a', b'b', b'c'];
    let mut dst = [0u8; 10];
    crate::transcode_dynamic(&src, 2, 1, &mut dst, 4, 2, 3, ExtendMode::Zero).unwrap();
    assert_eq!(dst, [0, 0, 0, 0, b'a', 0, b'b', 0, b'c', 0]);
  }

  #[test]
  fn test_dynamic_equal_strides_copy_bytes() {
    let src = encode_elements(&[0x1234_5678, 0x9abc_def0, 7], Stride::S4);
    let mut dst = vec![0u8; 12];
    crate::transcode_dynamic(&src, 4, 4, &mut dst, 0, 4, 2, ExtendMode::Sign).unwrap();
    assert_eq!(&dst[..8], &src[4..]);
    assert_eq!(&dst[8..], &[0; 4]);
  }

  #[test]
  fn test_dynamic_rejects_bad_arguments() {
    let src = [0u8; 8];
    let mut dst = [0u8; 8];
    assert_eq!(
      crate::transcode_dynamic(&src, 0, 3, &mut dst, 0, 1, 1, ExtendMode::Zero),
      Err(KernelError::InvalidStride(3))
    );
    assert!(matches!(
      crate::transcode_dynamic(&src, 0, 1, &mut dst, 2, 2, 4, ExtendMode::Zero),
      Err(KernelError::OutOfBounds { .. })
    ));
    assert!(crate::transcode_dynamic(&src, 6, 1, &mut dst, 0, 1, 3, ExtendMode::Zero).is_err());
  }

  #[test]
  fn test_transcode_len_past_view() {
    let src = ArrayView::from_bytes(b"abc");
    let mut out = [0u8; 8];
    let mut dst = ArrayViewMut::with_stride(&mut out, Stride::S2);
    assert_eq!(
      crate::transcode(&src, &mut dst, 4, ExtendMode::Zero),
      Err(KernelError::InvalidIndex { index: 4, len: 3 })
    );
  }

  // =============================================================================
  // MEMMOVE
  // =============================================================================

  #[test]
  fn test_copy_within_overlapping() {
    let mut forward: Vec<u8> = (0..100).collect();
    crate::copy_within(&mut forward, 10, 20, 50).unwrap();
    let expected: Vec<u8> = (0..20).chain(10..60).chain(70..100).collect();
    assert_eq!(forward, expected);

    let mut backward: Vec<u8> = (0..100).collect();
    crate::copy_within(&mut backward, 20, 10, 50).unwrap();
    let expected: Vec<u8> = (0..10).chain(20..70).chain(60..100).collect();
    assert_eq!(backward, expected);
  }

  #[test]
  fn test_copy_within_bounds() {
    let mut buf = [0u8; 16];
    crate::copy_within(&mut buf, 0, 0, 16).unwrap();
    crate::copy_within(&mut buf, 16, 0, 0).unwrap();
    assert!(crate::copy_within(&mut buf, 1, 0, 16).is_err());
    assert!(crate::copy_within(&mut buf, 0, usize::MAX, 2).is_err());
  }

  // =============================================================================
  // ELEMENT CONVERSION
  // =============================================================================

  #[test]
  fn test_extend_per_stride() {
    assert_eq!(extend(0x80, Stride::S1, ExtendMode::Sign), 0xffff_ff80);
    assert_eq!(extend(0x7f, Stride::S1, ExtendMode::Sign), 0x7f);
    assert_eq!(extend(0x8000, Stride::S2, ExtendMode::Sign), 0xffff_8000);
    assert_eq!(extend(0x8000, Stride::S2, ExtendMode::Zero), 0x8000);
  }

  #[test]
  fn test_canonicalize_equal_strides() {
    assert_eq!(canonicalize(Stride::S4, Stride::S4, 5), (Stride::S1, Stride::S1, 20));
    assert_eq!(canonicalize(Stride::S1, Stride::S2, 5), (Stride::S1, Stride::S2, 5));
  }

  #[test]
  fn test_narrowing_keeps_low_bytes() {
    let values = [0x41, 0x1e9, 0x7f, 0x1_2345];
    let src = encode_elements(&values, Stride::S4);
    let view = ArrayView::with_stride(&src, Stride::S4);
    for dst_stride in [Stride::S1, Stride::S2] {
      let mut out = vec![0u8; values.len() * dst_stride.bytes()];
      let mut dst = ArrayViewMut::with_stride(&mut out, dst_stride);
      transcode::transcode(&view, &mut dst, values.len(), ExtendMode::Zero, Widths::new(2, 1));
      let low: Vec<u32> = values.iter().map(|&v| v & dst_stride.max_value()).collect();
      assert_eq!(out, encode_elements(&low, dst_stride), "{:?}", dst_stride);
    }
  }

  #[cfg(all(target_arch = "x86_64", not(feature = "portable-only")))]
  #[test]
  fn test_avx2_inflate_matches_scalar() {
    if !is_x86_feature_detected!("avx2") {
      return;
    }
    let src: Vec<u8> = (0..=255u8).chain(0..37).collect();
    let mut dst = vec![SENTINEL; src.len() * 2];
    unsafe { transcode::inflate_u8_u16_avx2(&src, &mut dst) };
    assert_eq!(dst, encode_elements(&src.iter().map(|&b| b as u32).collect::<Vec<_>>(), Stride::S2));
  }
}
