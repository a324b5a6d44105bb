//! Iteration controllers.
//!
//! All three solvers run the same loop: dump CURRENT, compute NEXT with
//! the stencil kernel, OR the changed flags together, promote NEXT, repeat
//! until a generation changes nothing. There is no iteration cap.

pub mod message_passing;
pub mod reference;
pub mod shared_memory;

use crate::error::{RelaxError, Result};
use crate::grid::{Grid, GridRef};
use crate::stencil::{ChangeCriterion, StencilKernel};
use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolveOptions {
    /// Threads or ranks. Ignored by `message_passing::solve_rank`,
    /// which uses the communicator's size.
    pub workers: usize,
    pub precision: f64,
    pub criterion: ChangeCriterion,
}

impl SolveOptions {
    pub fn new(workers: usize, precision: f64) -> Self {
        SolveOptions {
            workers,
            precision,
            criterion: ChangeCriterion::default(),
        }
    }

    pub fn with_criterion(mut self, criterion: ChangeCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn kernel(&self, n: usize) -> StencilKernel {
        StencilKernel::new(n, self.precision, self.criterion)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(RelaxError::invalid(format!(
                "precision must be a positive number, got {}",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Result held by the coordinator once the run converges.
#[derive(Clone, Debug)]
pub struct Solution {
    pub grid: Grid,
    /// Generations computed, including the final unchanged one.
    pub generations: usize,
    /// Wall clock time after the initial grid was built.
    pub elapsed: Duration,
}

/// Sees the authoritative CURRENT grid before each generation.
pub trait Observer {
    fn observe(&mut self, generation: usize, current: GridRef<'_>);
}

impl<F> Observer for F
where
    F: FnMut(usize, GridRef<'_>),
{
    fn observe(&mut self, generation: usize, current: GridRef<'_>) {
        self(generation, current)
    }
}

/// Observer that ignores every generation.
#[derive(Copy, Clone, Debug, Default)]
pub struct Quiet;

impl Observer for Quiet {
    fn observe(&mut self, _generation: usize, _current: GridRef<'_>) {}
}

/// Which engine computes the fixed point.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum,
)]
pub enum Realization {
    /// Barrier synchronized thread pool over shared buffers.
    #[default]
    Threads,
    /// Isolated ranks exchanging halos over channels.
    Ranks,
    /// Rayon over the whole grid, one address space.
    Reference,
}

pub fn solve<O: Observer>(
    realization: Realization,
    grid: Grid,
    options: &SolveOptions,
    observer: &mut O,
) -> Result<Solution> {
    match realization {
        Realization::Threads => shared_memory::solve(grid, options, observer),
        Realization::Ranks => message_passing::solve(grid, options, observer),
        Realization::Reference => reference::solve(grid, options, observer),
    }
}
