// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// ROLLING HASH TESTS
// =============================================================================

#[cfg(test)]
mod tests {
  use crate::cascade::Widths;
  use crate::hash::{self, lane_weights};
  use crate::test_utils::{config_test_logger, utf16_bytes};
  use crate::types::{encode_elements, ArrayView, Stride};

  /// Horner's rule over the raw element values.
  fn horner(values: &[u32], seed: i32) -> i32 {
    values
      .iter()
      .fold(seed, |h, &v| h.wrapping_mul(31).wrapping_add(v as i32))
  }

  fn test_hash_triple_paths(values: &[u32], stride: Stride, seed: i32) {
    let bytes = encode_elements(values, stride);
    let view = ArrayView::with_stride(&bytes, stride);
    let stored: Vec<u32> = (0..view.len()).map(|i| view.get(i)).collect();
    let expected = horner(&stored, seed);

    //  SCALAR PATH TEST
    assert_eq!(hash::rolling_hash_scalar(&view, seed), expected, "scalar len={}", values.len());

    //  SIMD PATH TEST
    for max in [1usize, 2, 4, 8, 16, 32, 64] {
      for min in [1usize, max] {
        assert_eq!(
          hash::rolling_hash(&view, seed, Widths::new(max, min)),
          expected,
          "cascade max={} min={} len={}",
          max,
          min,
          values.len()
        );
      }
    }

    //  DISPATCH PATH TEST
    assert_eq!(crate::rolling_hash(&view, seed).unwrap(), expected, "dispatch len={}", values.len());
  }

  #[test]
  fn test_known_values() {
    config_test_logger();
    assert_eq!(crate::rolling_hash(&ArrayView::from_bytes(b""), 0).unwrap(), 0);
    assert_eq!(crate::rolling_hash(&ArrayView::from_bytes(b""), 42).unwrap(), 42);
    assert_eq!(crate::rolling_hash(&ArrayView::from_bytes(b"a"), 0).unwrap(), 97);
    assert_eq!(crate::rolling_hash(&ArrayView::from_bytes(b"abc"), 0).unwrap(), 96354);
    assert_eq!(crate::rolling_hash(&ArrayView::from_bytes(b"hello"), 0).unwrap(), 99162322);
  }

  #[test]
  fn test_same_text_same_hash_across_strides() {
    let text = "the quick brown fox jumps over the lazy dog, again and again and again";
    let narrow = crate::rolling_hash(&ArrayView::from_bytes(text.as_bytes()), 0).unwrap();
    let wide_bytes = utf16_bytes(text);
    let wide = crate::rolling_hash(&ArrayView::with_stride(&wide_bytes, Stride::S2), 0).unwrap();
    let values: Vec<u32> = text.bytes().map(|b| b as u32).collect();
    let widest_bytes = encode_elements(&values, Stride::S4);
    let widest = crate::rolling_hash(&ArrayView::with_stride(&widest_bytes, Stride::S4), 0).unwrap();
    assert_eq!(narrow, wide);
    assert_eq!(narrow, widest);
  }

  #[test]
  fn test_lengths_around_chunk_sizes() {
    for stride in Stride::ALL {
      for len in [0usize, 1, 3, 15, 16, 17, 31, 32, 33, 63, 64, 65, 127, 129, 1000] {
        let values: Vec<u32> = (0..len as u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
        test_hash_triple_paths(&values, stride, 0);
        test_hash_triple_paths(&values, stride, -7);
      }
    }
  }

  #[test]
  fn test_overflowing_elements() {
    let values = vec![u32::MAX; 200];
    test_hash_triple_paths(&values, Stride::S4, i32::MIN);
    test_hash_triple_paths(&values, Stride::S2, i32::MAX);
  }

  #[test]
  fn test_lane_weights_descend() {
    assert_eq!(lane_weights::<4>(), [29791, 961, 31, 1]);
    assert_eq!(lane_weights::<1>(), [1]);
  }

  #[test]
  fn test_chunked_matches_horner_with_seed() {
    let bytes: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let view = ArrayView::from_bytes(&bytes);
    let expected = hash::rolling_hash_scalar(&view, 17);
    for max in [1, 2, 8, 64] {
      assert_eq!(hash::rolling_hash(&view, 17, Widths::new(max, 1)), expected, "max={}", max);
    }
  }
}
