//! Work Partitioning
//!
//! Splits the flattened `n * n` index domain into one contiguous chunk per
//! worker. Both solvers use this same function so the decomposition never
//! depends on which realization is running.

use crate::error::{RelaxError, Result};

/// Contiguous range of flattened cell indices owned by one worker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkAssignment {
    pub start: usize,
    pub count: usize,
}

impl WorkAssignment {
    /// Exclusive end index.
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }

    /// Rows a worker must read to update every cell it owns,
    /// `None` for an empty assignment.
    pub fn halo(&self, n: usize) -> Option<HaloRegion> {
        if self.count == 0 {
            return None;
        }
        let first_row = self.start / n;
        let last_row = (self.end() - 1) / n;
        Some(HaloRegion {
            first_row: first_row.saturating_sub(1),
            last_row: (last_row + 1).min(n - 1),
        })
    }
}

/// Closed row range `[first_row, last_row]` of a halo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HaloRegion {
    pub first_row: usize,
    pub last_row: usize,
}

impl HaloRegion {
    pub fn rows(&self) -> usize {
        self.last_row - self.first_row + 1
    }

    /// Global flat index of the first cell in the halo.
    pub fn offset(&self, n: usize) -> usize {
        self.first_row * n
    }

    pub fn len(&self, n: usize) -> usize {
        self.rows() * n
    }

    pub fn flat_range(&self, n: usize) -> std::ops::Range<usize> {
        let offset = self.offset(n);
        offset..offset + self.len(n)
    }
}

/// Split `n * n` cells across `workers`.
/// The first `(n * n) % workers` assignments get one extra cell.
pub fn partition(n: usize, workers: usize) -> Result<Vec<WorkAssignment>> {
    if n == 0 {
        return Err(RelaxError::invalid("grid dimension must be positive"));
    }
    if workers == 0 {
        return Err(RelaxError::invalid("worker count must be positive"));
    }
    let cells = n
        .checked_mul(n)
        .ok_or_else(|| RelaxError::invalid("grid dimension is too large"))?;
    if workers > cells {
        return Err(RelaxError::invalid(format!(
            "{workers} workers for only {cells} cells"
        )));
    }

    let base = cells / workers;
    let mut remainder = cells % workers;
    let mut start = 0;
    let mut result = Vec::with_capacity(workers);
    for _ in 0..workers {
        let mut count = base;
        if remainder > 0 {
            remainder -= 1;
            count += 1;
        }
        result.push(WorkAssignment { start, count });
        start += count;
    }
    debug_assert_eq!(start, cells);
    Ok(result)
}

/// Per-worker counts, in worker order.
pub fn counts(assignments: &[WorkAssignment]) -> Vec<usize> {
    assignments.iter().map(|a| a.count).collect()
}

/// Per-worker start offsets, in worker order.
pub fn displacements(assignments: &[WorkAssignment]) -> Vec<usize> {
    assignments.iter().map(|a| a.start).collect()
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn partition_even_split() {
        let p = partition(4, 4).unwrap();
        assert_eq!(
            p,
            vec![
                WorkAssignment { start: 0, count: 4 },
                WorkAssignment { start: 4, count: 4 },
                WorkAssignment { start: 8, count: 4 },
                WorkAssignment { start: 12, count: 4 },
            ]
        );
    }

    #[test]
    fn partition_remainder_goes_first() {
        // 9 cells, 4 workers: 3, 2, 2, 2
        let p = partition(3, 4).unwrap();
        assert_eq!(counts(&p), vec![3, 2, 2, 2]);
        assert_eq!(displacements(&p), vec![0, 3, 5, 7]);
    }

    #[test]
    fn partition_rejects_bad_input() {
        assert!(partition(0, 1).is_err());
        assert!(partition(3, 0).is_err());
        assert!(partition(2, 5).is_err());
        assert!(partition(2, 4).is_ok());
    }

    #[test]
    fn halo_clamps_to_grid() {
        let n = 5;
        {
            // rows 0..=1 owned, pad to row 2, nothing above row 0
            let a = WorkAssignment { start: 0, count: 7 };
            let h = a.halo(n).unwrap();
            assert_eq!(h, HaloRegion { first_row: 0, last_row: 2 });
            assert_eq!(h.flat_range(n), 0..15);
        }

        {
            // single cell in the middle row
            let a = WorkAssignment { start: 12, count: 1 };
            let h = a.halo(n).unwrap();
            assert_eq!(h, HaloRegion { first_row: 1, last_row: 3 });
            assert_eq!(h.offset(n), 5);
            assert_eq!(h.len(n), 15);
        }

        {
            let a = WorkAssignment { start: 20, count: 5 };
            let h = a.halo(n).unwrap();
            assert_eq!(h, HaloRegion { first_row: 3, last_row: 4 });
        }

        {
            let a = WorkAssignment { start: 3, count: 0 };
            assert!(a.halo(n).is_none());
        }
    }

    proptest! {
        #[test]
        fn partition_is_complete(n in 1usize..40, w_seed in 1usize..2000) {
            let cells = n * n;
            let w = 1 + (w_seed - 1) % cells;
            let p = partition(n, w).unwrap();
            prop_assert_eq!(p.len(), w);
            prop_assert_eq!(p[0].start, 0);

            let mut expected_start = 0;
            for a in &p {
                prop_assert_eq!(a.start, expected_start);
                expected_start = a.end();
            }
            prop_assert_eq!(expected_start, cells);

            let max = p.iter().map(|a| a.count).max().unwrap();
            let min = p.iter().map(|a| a.count).min().unwrap();
            prop_assert!(max - min <= 1);
        }

        #[test]
        fn halo_covers_neighbors(n in 1usize..30, w_seed in 1usize..500) {
            let w = 1 + (w_seed - 1) % (n * n);
            for a in partition(n, w).unwrap() {
                let h = a.halo(n).unwrap();
                for i in a.range() {
                    let row = i / n;
                    prop_assert!(h.first_row <= row.saturating_sub(1));
                    prop_assert!(h.last_row >= (row + 1).min(n - 1));
                }
            }
        }
    }
}
