// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// REGION EQUALS / MEMCMP TESTS
// =============================================================================

#[cfg(test)]
mod tests {
  use crate::cascade::Widths;
  use crate::compare;
  use crate::test_utils::config_test_logger;
  use crate::types::{encode_elements, ArrayView, KernelError, Stride};

  const MAX_WIDTHS: [usize; 7] = [1, 2, 4, 8, 16, 32, 64];

  fn test_memcmp_triple_paths(a: &[u32], a_stride: Stride, b: &[u32], b_stride: Stride, len: usize, expected: i32) {
    let a_bytes = encode_elements(a, a_stride);
    let b_bytes = encode_elements(b, b_stride);
    let av = ArrayView::with_stride(&a_bytes, a_stride);
    let bv = ArrayView::with_stride(&b_bytes, b_stride);

    //  SCALAR PATH TEST
    assert_eq!(compare::memcmp_scalar(&av, &bv, len), expected, "scalar len={}", len);
    assert_eq!(compare::region_equals_scalar(&av, &bv, None, len), expected == 0);

    //  SIMD PATH TEST
    for max in MAX_WIDTHS {
      let widths = Widths::new(max, 1);
      assert_eq!(compare::memcmp(&av, &bv, len, widths), expected, "cascade max={} len={}", max, len);
      assert_eq!(compare::region_equals(&av, &bv, None, len, widths), expected == 0, "cascade max={}", max);
    }

    //  DISPATCH PATH TEST
    assert_eq!(crate::memcmp(&av, &bv, len).unwrap(), expected, "dispatch len={}", len);
    assert_eq!(crate::region_equals(&av, &bv, None, len).unwrap(), expected == 0);
  }

  fn test_masked_equals_triple_paths(a: &[u32], a_stride: Stride, b: &[u32], mask: &[u32], b_stride: Stride, expected: bool) {
    let a_bytes = encode_elements(a, a_stride);
    let b_bytes = encode_elements(b, b_stride);
    let m_bytes = encode_elements(mask, b_stride);
    let av = ArrayView::with_stride(&a_bytes, a_stride);
    let bv = ArrayView::with_stride(&b_bytes, b_stride);
    let mv = ArrayView::with_stride(&m_bytes, b_stride);
    let len = a.len();

    assert_eq!(compare::region_equals_scalar(&av, &bv, Some(&mv), len), expected, "scalar");
    for max in MAX_WIDTHS {
      assert_eq!(
        compare::region_equals(&av, &bv, Some(&mv), len, Widths::new(max, 1)),
        expected,
        "cascade max={}",
        max
      );
    }
    assert_eq!(crate::region_equals(&av, &bv, Some(&mv), len).unwrap(), expected, "dispatch");
  }

  fn ascii(s: &str) -> Vec<u32> {
    s.bytes().map(|b| b as u32).collect()
  }

  // =============================================================================
  // MEMCMP
  // =============================================================================

  #[test]
  fn test_equal_regions_all_stride_pairs() {
    config_test_logger();
    let values = ascii(&"stride conversion and comparison ".repeat(5));
    for a in Stride::ALL {
      for b in Stride::ALL {
        for len in [0usize, 1, 15, 16, 17, 100, values.len()] {
          test_memcmp_triple_paths(&values, a, &values, b, len, 0);
        }
      }
    }
  }

  #[test]
  fn test_first_difference_at_every_position() {
    let a: Vec<u32> = (0..130).map(|i| 0x100 + i).collect();
    for at in [0usize, 1, 7, 8, 15, 31, 32, 63, 64, 100, 129] {
      let mut b = a.clone();
      b[at] = a[at] + 5;
      // a later difference must not win
      if at + 3 < b.len() {
        b[at + 3] = 0;
      }
      test_memcmp_triple_paths(&a, Stride::S2, &b, Stride::S4, a.len(), -5);
      test_memcmp_triple_paths(&b, Stride::S4, &a, Stride::S2, a.len(), 5);
      // a prefix that stops before the difference compares equal
      test_memcmp_triple_paths(&a, Stride::S2, &b, Stride::S2, at, 0);
    }
  }

  #[test]
  fn test_difference_sign_follows_element_values() {
    let a = ascii(&"a".repeat(69));
    let mut b = a.clone();
    b[60] = 0xff;
    test_memcmp_triple_paths(&a, Stride::S1, &b, Stride::S1, a.len(), b'a' as i32 - 0xff);
    // full 32-bit elements wrap the difference
    test_memcmp_triple_paths(&[0], Stride::S4, &[0x8000_0000], Stride::S4, 1, i32::MIN);
  }

  // =============================================================================
  // MASKED EQUALITY
  // =============================================================================

  #[test]
  fn test_masked_case_insensitive() {
    let upper = ascii(&"HELLO WORLD ".repeat(8));
    let lower = ascii(&"hello world ".repeat(8));
    let fold: Vec<u32> = upper.iter().map(|&c| if (c as u8).is_ascii_alphabetic() { 0x20 } else { 0 }).collect();
    for a_stride in Stride::ALL {
      for b_stride in Stride::ALL {
        test_masked_equals_triple_paths(&upper, a_stride, &lower, &fold, b_stride, true);
      }
    }
    let zeros = vec![0; upper.len()];
    test_masked_equals_triple_paths(&upper, Stride::S1, &lower, &zeros, Stride::S2, false);
  }

  #[test]
  fn test_mask_applies_to_left_side_only() {
    let a = ascii("abcdefghijklmnopqrstuvwxyz0123");
    let b = ascii("ABCDEFGHIJKLMNOPQRSTUVWXYZ0123");
    let mask = vec![0x20; a.len()];
    // 'a' | 0x20 == 'a' != 'A'
    test_masked_equals_triple_paths(&a, Stride::S1, &b, &mask, Stride::S1, false);
  }

  // =============================================================================
  // ARGUMENTS
  // =============================================================================

  #[test]
  fn test_invalid_arguments() {
    let a = ArrayView::from_bytes(b"abcd");
    let b = ArrayView::from_bytes(b"abc");
    assert_eq!(crate::memcmp(&a, &b, 4), Err(KernelError::InvalidIndex { index: 4, len: 3 }));
    assert!(crate::region_equals(&a, &b, None, 4).is_err());

    let wide_mask = encode_elements(&[0; 4], Stride::S2);
    let mask = ArrayView::with_stride(&wide_mask, Stride::S2);
    assert!(matches!(
      crate::region_equals(&a, &b, Some(&mask), 3),
      Err(KernelError::InvalidArgument(_))
    ));
    let short_mask = ArrayView::from_bytes(b"\0\0");
    assert!(crate::region_equals(&a, &b, Some(&short_mask), 3).is_err());
  }

  #[test]
  fn test_short_regions_small_widths() {
    let a = b"hello world, hello world";
    let b = encode_elements(&a.iter().map(|&c| c as u32).collect::<Vec<_>>(), Stride::S2);
    let av = ArrayView::from_bytes(a);
    let bv = ArrayView::with_stride(&b, Stride::S2);
    assert!(compare::region_equals(&av, &bv, None, a.len(), Widths::new(8, 2)));
    assert_eq!(compare::memcmp(&av, &bv, a.len(), Widths::new(8, 2)), 0);

    let x = ArrayView::from_bytes(b"abcdefghijklmnopqrstuvwxyz");
    let y = ArrayView::from_bytes(b"abcdefghijklmnopqrstuvwxzz");
    assert_eq!(compare::memcmp(&x, &y, 26, Widths::new(8, 2)), b'y' as i32 - b'z' as i32);
    assert_eq!(compare::memcmp(&x, &y, 24, Widths::new(8, 2)), 0);
  }
}
