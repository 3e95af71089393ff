// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// VECTOR CASCADE TESTS
// =============================================================================

#[cfg(test)]
mod tests {
  use std::ops::ControlFlow;

  use crate::cascade::{run, run_reverse, ChunkOp, TailMode, Widths};
  use crate::types::Stride;
  use crate::vector::lane_mask;

  /// Records how often each element is live in some chunk or scalar step.
  struct Coverage {
    seen: Vec<u32>,
    chunks: Vec<(usize, usize)>,
  }

  impl Coverage {
    fn new(len: usize) -> Self {
      Self {
        seen: vec![0; len],
        chunks: Vec::new(),
      }
    }

    fn visited_once(&self) -> bool {
      self.seen.iter().all(|&c| c == 1)
    }
  }

  impl ChunkOp for Coverage {
    type Output = ();
    const TAIL: TailMode = TailMode::Overlap;

    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<()> {
      assert!(start + W <= self.seen.len(), "chunk past end");
      self.chunks.push((start, W));
      for lane in 0..W {
        if live & (1 << lane) != 0 {
          self.seen[start + lane] += 1;
        }
      }
      ControlFlow::Continue(())
    }

    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
      self.seen[index] += 1;
      ControlFlow::Continue(())
    }
  }

  struct SequentialCoverage(Coverage);

  impl ChunkOp for SequentialCoverage {
    type Output = ();
    const TAIL: TailMode = TailMode::Sequential;

    fn vector<const W: usize>(&mut self, start: usize, live: u64) -> ControlFlow<()> {
      assert_eq!(live, lane_mask(W));
      if let Some(&(prev, prev_width)) = self.0.chunks.last() {
        assert_eq!(prev + prev_width, start, "sequential chunks must be contiguous");
      }
      self.0.vector::<W>(start, live)
    }

    fn scalar(&mut self, index: usize) -> ControlFlow<()> {
      self.0.scalar(index)
    }
  }

  // =============================================================================
  // COVERAGE
  // =============================================================================

  #[test]
  fn test_overlap_mode_visits_every_element_once() {
    for max in [1usize, 2, 4, 8, 16, 32, 64] {
      for len in 0..200 {
        let mut cov = Coverage::new(len);
        let _ = run(&mut cov, 0, len, Widths::new(max, 4));
        assert!(cov.visited_once(), "len={} max={}: {:?}", len, max, cov.seen);
      }
    }
  }

  #[test]
  fn test_sequential_mode_is_contiguous_and_exact() {
    for max in [1usize, 4, 16, 64] {
      for len in 0..150 {
        let mut cov = SequentialCoverage(Coverage::new(len));
        let _ = run(&mut cov, 0, len, Widths::new(max, 2));
        assert!(cov.0.visited_once(), "len={} max={}", len, max);
      }
    }
  }

  #[test]
  fn test_reverse_mode_visits_every_element_once() {
    for len in 0..130 {
      let mut cov = Coverage::new(len);
      let _ = run_reverse(&mut cov, 0, len, Widths::new(16, 4));
      assert!(cov.visited_once(), "len={}", len);
    }
  }

  #[test]
  fn test_sub_range_stays_in_bounds() {
    let mut cov = Coverage::new(100);
    let _ = run(&mut cov, 37, 61, Widths::new(32, 8));
    for (i, &c) in cov.seen.iter().enumerate() {
      assert_eq!(c, (37..61).contains(&i) as u32, "index {}", i);
    }
  }

  #[test]
  fn test_width_exactly_and_one_past_vector() {
    let mut cov = Coverage::new(16);
    let _ = run(&mut cov, 0, 16, Widths::new(16, 4));
    assert_eq!(cov.chunks, vec![(0, 16)]);

    let mut cov = Coverage::new(17);
    let _ = run(&mut cov, 0, 17, Widths::new(16, 4));
    assert_eq!(cov.chunks, vec![(0, 16), (1, 16)]);
  }

  // =============================================================================
  // EARLY EXIT / WIDTHS
  // =============================================================================

  #[test]
  fn test_early_exit_stops_scan() {
    struct FindSeven(usize);

    impl ChunkOp for FindSeven {
      type Output = usize;
      const TAIL: TailMode = TailMode::Overlap;

      fn vector<const W: usize>(&mut self, start: usize, _live: u64) -> ControlFlow<usize> {
        self.0 += 1;
        if (start..start + W).contains(&7) {
          ControlFlow::Break(7)
        } else {
          ControlFlow::Continue(())
        }
      }

      fn scalar(&mut self, index: usize) -> ControlFlow<usize> {
        if index == 7 {
          ControlFlow::Break(7)
        } else {
          ControlFlow::Continue(())
        }
      }
    }

    let mut op = FindSeven(0);
    assert_eq!(run(&mut op, 0, 64, Widths::new(4, 4)), ControlFlow::Break(7));
    assert_eq!(op.0, 2);
  }

  #[test]
  fn test_widths_for_stride() {
    let w = Widths::for_stride(32, Stride::S2);
    assert_eq!((w.max(), w.min()), (16, 4));
    let w = Widths::for_stride(16, Stride::S4);
    assert_eq!((w.max(), w.min()), (4, 2));
    let w = Widths::new(48, 100);
    assert_eq!((w.max(), w.min()), (32, 32));
  }
}
