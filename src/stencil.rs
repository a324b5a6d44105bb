use num_traits::Float;

/// All stencils operations must provide an operation that adheres to this type
pub trait StencilOperation<FloatType: Float, const NEIGHBORHOOD_SIZE: usize>:
    Fn(&[FloatType; NEIGHBORHOOD_SIZE]) -> FloatType
{
}

impl<FloatType, Operation, const NEIGHBORHOOD_SIZE: usize>
    StencilOperation<FloatType, NEIGHBORHOOD_SIZE> for Operation
where
    FloatType: Float,
    Operation: Fn(&[FloatType; NEIGHBORHOOD_SIZE]) -> FloatType,
{
}

/// Stencils are the combination of an operation and neighbors.
/// Offsets are `[row, col]` pairs.
pub struct Stencil<FloatType: Float, Operation, const NEIGHBORHOOD_SIZE: usize>
where
    Operation: StencilOperation<FloatType, NEIGHBORHOOD_SIZE>,
{
    operation: Operation,
    offsets: [[i32; 2]; NEIGHBORHOOD_SIZE],
    float_type: std::marker::PhantomData<FloatType>,
}

impl<FloatType, Operation, const NEIGHBORHOOD_SIZE: usize>
    Stencil<FloatType, Operation, NEIGHBORHOOD_SIZE>
where
    Operation: StencilOperation<FloatType, NEIGHBORHOOD_SIZE>,
    FloatType: Float,
{
    pub const fn new(
        offsets: [[i32; 2]; NEIGHBORHOOD_SIZE],
        operation: Operation,
    ) -> Self {
        Stencil {
            offsets,
            operation,
            float_type: std::marker::PhantomData,
        }
    }

    pub fn offsets(&self) -> &[[i32; 2]; NEIGHBORHOOD_SIZE] {
        &self.offsets
    }

    pub fn apply(&self, args: &[FloatType; NEIGHBORHOOD_SIZE]) -> FloatType {
        (self.operation)(args)
    }
}

pub type AveragingOperation = fn(&[f64; 4]) -> f64;

fn average_4(args: &[f64; 4]) -> f64 {
    (args[0] + args[1] + args[2] + args[3]) / 4.0
}

/// Up, down, left, right.
/// Summation order is fixed so every solver produces bit identical cells.
pub const JACOBI_2D: Stencil<f64, AveragingOperation, 4> = Stencil::new(
    [[-1, 0], [1, 0], [0, -1], [0, 1]],
    average_4 as AveragingOperation,
);

/// How a cell's delta is compared against the precision.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum,
)]
pub enum ChangeCriterion {
    /// `|delta| > precision`
    #[default]
    Exceeds,
    /// `|delta| >= precision`
    AtLeast,
}

impl ChangeCriterion {
    pub fn is_material(self, delta: f64, precision: f64) -> bool {
        let delta = delta.abs();
        match self {
            ChangeCriterion::Exceeds => delta > precision,
            ChangeCriterion::AtLeast => delta >= precision,
        }
    }
}

/// Read only view of a generation, possibly just a band of rows.
/// `offset` is the global flat index of `data[0]`.
#[derive(Copy, Clone, Debug)]
pub struct GridWindow<'a> {
    data: &'a [f64],
    offset: usize,
}

impl<'a> GridWindow<'a> {
    pub fn new(data: &'a [f64], offset: usize) -> Self {
        GridWindow { data, offset }
    }

    pub fn full(data: &'a [f64]) -> Self {
        GridWindow { data, offset: 0 }
    }

    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        debug_assert!(i >= self.offset, "{} below window {}", i, self.offset);
        self.data[i - self.offset]
    }
}

/// The per-cell update rule for an `n * n` grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StencilKernel {
    pub n: usize,
    pub precision: f64,
    pub criterion: ChangeCriterion,
}

impl StencilKernel {
    pub fn new(n: usize, precision: f64, criterion: ChangeCriterion) -> Self {
        StencilKernel {
            n,
            precision,
            criterion,
        }
    }

    #[inline]
    pub fn is_edge(&self, i: usize) -> bool {
        let row = i / self.n;
        let col = i % self.n;
        row == 0 || row == self.n - 1 || col == 0 || col == self.n - 1
    }

    /// Write cell `i` of the next generation.
    /// Returns true if the cell changed materially.
    #[inline]
    pub fn apply_cell(
        &self,
        i: usize,
        current: &GridWindow<'_>,
        next: &mut f64,
    ) -> bool {
        let old = current.get(i);
        if self.is_edge(i) {
            *next = old;
            return false;
        }
        let n = self.n as i64;
        let args = JACOBI_2D.offsets().map(|[d_row, d_col]| {
            let neighbor = i as i64 + d_row as i64 * n + d_col as i64;
            current.get(neighbor as usize)
        });
        let value = JACOBI_2D.apply(&args);
        *next = value;
        self.criterion.is_material(value - old, self.precision)
    }

    /// Apply the kernel to cells `start..start + next.len()`.
    /// `next[k]` receives cell `start + k`.
    pub fn apply_range(
        &self,
        start: usize,
        current: &GridWindow<'_>,
        next: &mut [f64],
    ) -> bool {
        profiling::scope!("stencil_kernel::apply_range");
        let mut changed = false;
        for (k, cell) in next.iter_mut().enumerate() {
            changed |= self.apply_cell(start + k, current, cell);
        }
        changed
    }
}
