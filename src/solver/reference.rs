use super::{Observer, Solution, SolveOptions};
use crate::error::{try_alloc, Result};
use crate::grid::{Grid, GridRef};
use crate::stencil::{GridWindow, StencilKernel};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{info, trace};

/// Rows per rayon task.
const CHUNK_ROWS: usize = 8;

/// Compute one generation of the whole grid.
/// Returns true if any interior cell changed materially.
pub fn step(
    kernel: &StencilKernel,
    current: &[f64],
    next: &mut [f64],
) -> bool {
    debug_assert_eq!(current.len(), next.len());
    let chunk_size = kernel.n * CHUNK_ROWS;
    let window = GridWindow::full(current);
    next.par_chunks_mut(chunk_size)
        .enumerate()
        .map(|(chunk_index, next_chunk): (usize, &mut [f64])| {
            profiling::scope!("reference: Thread Callback");
            kernel.apply_range(chunk_index * chunk_size, &window, next_chunk)
        })
        .reduce(|| false, |a, b| a || b)
}

/// Single address space solver, rayon splits each generation by rows.
/// `options.workers` is ignored, the global rayon pool is used.
pub fn solve<O: Observer>(
    grid: Grid,
    options: &SolveOptions,
    observer: &mut O,
) -> Result<Solution> {
    options.validate()?;
    let n = grid.n();
    let kernel = options.kernel(n);
    info!(n, precision = options.precision, "reference solve");

    let mut input = grid.into_vec();
    let mut output = try_alloc(input.len())?;

    let start = Instant::now();
    let mut generations = 0;
    loop {
        observer.observe(generations, GridRef::new(n, &input));
        let changed = step(&kernel, &input, &mut output);
        std::mem::swap(&mut input, &mut output);
        generations += 1;
        trace!(generation = generations, changed);
        if !changed {
            break;
        }
    }
    let elapsed = start.elapsed();

    info!(generations, ?elapsed, "converged");
    Ok(Solution {
        grid: Grid::from_vec(n, input)?,
        generations,
        elapsed,
    })
}
