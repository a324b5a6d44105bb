use crate::error::{try_alloc, RelaxError, Result};
use crate::par_slice;

/// Rows per task when building a grid in parallel.
const FILL_CHUNK_ROWS: usize = 64;

/// Number of cells in an `n * n` grid.
fn cells(n: usize) -> Result<usize> {
    if n == 0 {
        return Err(RelaxError::invalid("grid dimension must be positive"));
    }
    n.checked_mul(n)
        .ok_or_else(|| RelaxError::invalid(format!("size {n} is too large")))
}

/// Square grid stored flat in row-major order, index = row * n + col.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    n: usize,
    data: Vec<f64>,
}

impl Grid {
    /// Build an `n * n` grid calling `value(row, col)` once per cell.
    pub fn from_fn<F>(n: usize, value: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let mut data = try_alloc(cells(n)?)?;
        par_slice::set_values(&mut data, n, value, FILL_CHUNK_ROWS);
        Ok(Grid { n, data })
    }

    pub fn from_vec(n: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != cells(n)? {
            return Err(RelaxError::invalid(format!(
                "{} values do not make a {n} x {n} grid",
                data.len()
            )));
        }
        Ok(Grid { n, data })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn view(&self) -> GridRef<'_> {
        GridRef::new(self.n, &self.data)
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.n..(row + 1) * self.n]
    }

    pub fn is_edge(&self, row: usize, col: usize) -> bool {
        row == 0 || row == self.n - 1 || col == 0 || col == self.n - 1
    }

    /// Flat indices of every boundary cell.
    pub fn edge_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|i| self.is_edge(i / self.n, i % self.n))
    }

    /// Largest absolute difference to another grid of the same size.
    pub fn max_abs_diff(&self, other: &Grid) -> f64 {
        debug_assert_eq!(self.n, other.n);
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// Borrowed view of a grid generation, used for dumps and observers.
#[derive(Copy, Clone, Debug)]
pub struct GridRef<'a> {
    n: usize,
    data: &'a [f64],
}

impl<'a> GridRef<'a> {
    pub fn new(n: usize, data: &'a [f64]) -> Self {
        debug_assert_eq!(data.len(), n * n);
        GridRef { n, data }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn data(&self) -> &'a [f64] {
        self.data
    }
}

/// Fixed width dump, one grid row per line, followed by a blank line.
impl std::fmt::Display for GridRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.data.chunks(self.n) {
            for v in row {
                write!(f, "{:10.6} ", v)?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.view().fmt(f)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn from_fn_row_major() {
        let g = Grid::from_fn(3, |r, c| (r * 10 + c) as f64).unwrap();
        assert_eq!(
            g.data(),
            &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0]
        );
        assert_eq!(g.get(2, 1), 21.0);
        assert_eq!(g.row(1), &[10.0, 11.0, 12.0]);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(Grid::from_fn(0, |_, _| 0.0).is_err());
        assert!(Grid::from_vec(2, vec![0.0; 3]).is_err());
        assert!(Grid::from_vec(2, vec![0.0; 4]).is_ok());
        assert!(Grid::from_vec(0, vec![]).is_err());
    }

    #[test]
    fn rejects_overflowing_size() {
        let n = usize::MAX / 2;
        assert!(matches!(
            Grid::from_fn(n, |_, _| 0.0),
            Err(RelaxError::InvalidArgument(_))
        ));
        assert!(matches!(
            Grid::from_vec(n, vec![]),
            Err(RelaxError::InvalidArgument(_))
        ));
    }

    #[test]
    fn edge_indices_of_4x4() {
        let g = Grid::from_fn(4, |_, _| 0.0).unwrap();
        let edges: Vec<usize> = g.edge_indices().collect();
        assert_eq!(edges, vec![0, 1, 2, 3, 4, 7, 8, 11, 12, 13, 14, 15]);

        let single = Grid::from_fn(1, |_, _| 0.0).unwrap();
        assert_eq!(single.edge_indices().count(), 1);
    }

    #[test]
    fn display_fixed_width() {
        let g = Grid::from_vec(2, vec![1.0, 0.5, 0.25, 0.0]).unwrap();
        let s = g.to_string();
        assert_eq!(
            s,
            "  1.000000   0.500000 \n  0.250000   0.000000 \n\n"
        );
    }
}
