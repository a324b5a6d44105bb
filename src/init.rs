//! Grid Initialization
//!
//! Value generators for `Grid::from_fn`. Any `Fn(row, col) -> f64` works,
//! these are the ones the command line exposes.

use rand::prelude::*;

/// 1 in the first row and first column, 0 elsewhere.
pub fn corner_ones(row: usize, col: usize) -> f64 {
    if row * col == 0 {
        1.0
    } else {
        0.0
    }
}

/// `value` on every boundary cell of an `n * n` grid, 0 inside.
pub fn uniform_boundary(
    n: usize,
    value: f64,
) -> impl Fn(usize, usize) -> f64 + Sync {
    move |row, col| {
        if row == 0 || col == 0 || row + 1 == n || col + 1 == n {
            value
        } else {
            0.0
        }
    }
}

/// Whole numbers in `[0, max)`, reproducible for a given seed.
/// Values are drawn in row-major order up front so the result does not
/// depend on which thread asks for which cell.
pub fn seeded_random(
    n: usize,
    seed: u64,
    max: u32,
) -> impl Fn(usize, usize) -> f64 + Sync {
    let mut rng = StdRng::seed_from_u64(seed);
    let max = max.max(1);
    let table: Vec<f64> =
        (0..n * n).map(|_| rng.gen_range(0..max) as f64).collect();
    move |row, col| table[row * n + col]
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn corner_ones_test() {
        assert_eq!(corner_ones(0, 5), 1.0);
        assert_eq!(corner_ones(3, 0), 1.0);
        assert_eq!(corner_ones(1, 1), 0.0);
        assert_eq!(corner_ones(4, 4), 0.0);
    }

    #[test]
    fn uniform_boundary_test() {
        let f = uniform_boundary(4, 2.5);
        assert_eq!(f(0, 2), 2.5);
        assert_eq!(f(3, 1), 2.5);
        assert_eq!(f(2, 3), 2.5);
        assert_eq!(f(1, 2), 0.0);
        assert_eq!(f(2, 2), 0.0);
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let n = 9;
        let a = seeded_random(n, 101121, 20);
        let b = seeded_random(n, 101121, 20);
        for row in 0..n {
            for col in 0..n {
                let v = a(row, col);
                assert_eq!(v, b(row, col));
                assert!((0.0..20.0).contains(&v));
                assert_eq!(v, v.trunc());
            }
        }
    }
}
