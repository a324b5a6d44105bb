//! Message passing solver.
//!
//! Ranks share no memory. Per generation the coordinator ships each rank
//! its halo rows, every rank updates its own assignment, the results are
//! gathered back into the coordinator's grid, and an OR all-reduce gives
//! every rank the same continue/stop decision.

use super::{Observer, Quiet, Solution, SolveOptions};
use crate::comm::{Communicator, LocalComm};
use crate::error::{try_alloc, RelaxError, Result};
use crate::exchange::{distribute_halos, gather_results, HaloBuffer};
use crate::grid::{Grid, GridRef};
use crate::partition::partition;
use crate::stencil::GridWindow;
use std::time::Instant;
use tracing::{debug, info, trace};

/// What a rank holds between generations.
enum Role {
    /// The complete, authoritative CURRENT grid.
    Coordinator { grid: Vec<f64> },
    /// Only the rows around this rank's assignment.
    Worker { halo: HaloBuffer },
}

/// Run one rank to convergence.
///
/// The coordinator must pass the initial grid and gets `Some(solution)`
/// back; every other rank passes `None` and gets `None`. The number of
/// workers is the communicator's size.
pub fn solve_rank<C: Communicator, O: Observer>(
    comm: &C,
    initial: Option<Grid>,
    n: usize,
    options: &SolveOptions,
    observer: &mut O,
) -> Result<Option<Solution>> {
    options.validate()?;
    let rank = comm.rank();
    let assignments = partition(n, comm.size())?;
    let mine = assignments[rank];
    let kernel = options.kernel(n);
    debug!(rank, start = mine.start, end = mine.end() - 1, "rank assignment");

    let mut role = if comm.is_coordinator() {
        let grid = initial.ok_or_else(|| {
            RelaxError::invalid("the coordinator needs the initial grid")
        })?;
        if grid.n() != n {
            return Err(RelaxError::invalid(format!(
                "initial grid is {0} x {0}, expected {n} x {n}",
                grid.n()
            )));
        }
        Role::Coordinator {
            grid: grid.into_vec(),
        }
    } else {
        Role::Worker {
            halo: HaloBuffer::new(&mine, n)?,
        }
    };
    let mut computed = try_alloc(mine.count)?;

    // Nobody computes before everyone has its assignment and buffers.
    comm.barrier()?;
    let start = Instant::now();

    let mut generations = 0;
    loop {
        profiling::scope!("message_passing::generation");
        let local_changed = match &mut role {
            Role::Coordinator { grid } => {
                observer.observe(generations, GridRef::new(n, grid));
                distribute_halos(comm, grid, n, &assignments)?;
                kernel.apply_range(
                    mine.start,
                    &GridWindow::full(grid),
                    &mut computed,
                )
            }
            Role::Worker { halo } => {
                halo.receive(comm)?;
                kernel.apply_range(mine.start, &halo.window(), &mut computed)
            }
        };

        let authoritative = match &mut role {
            Role::Coordinator { grid } => Some(grid.as_mut_slice()),
            Role::Worker { .. } => None,
        };
        gather_results(comm, &computed, authoritative, &assignments)?;

        let changed = comm.all_reduce_or(local_changed)?;
        generations += 1;
        trace!(rank, generation = generations, local_changed, changed);
        if !changed {
            break;
        }
    }
    let elapsed = start.elapsed();

    match role {
        Role::Coordinator { grid } => {
            info!(generations, ?elapsed, "converged");
            Ok(Some(Solution {
                grid: Grid::from_vec(n, grid)?,
                generations,
                elapsed,
            }))
        }
        Role::Worker { .. } => Ok(None),
    }
}

/// Run `options.workers` in-process ranks, one thread each, connected by
/// [`LocalComm`]. The calling thread is the coordinator.
pub fn solve<O: Observer>(
    grid: Grid,
    options: &SolveOptions,
    observer: &mut O,
) -> Result<Solution> {
    options.validate()?;
    let n = grid.n();
    partition(n, options.workers)?;
    info!(
        n,
        ranks = options.workers,
        precision = options.precision,
        "message passing solve"
    );

    let mut comms = LocalComm::world(options.workers).into_iter();
    let coordinator = comms
        .next()
        .ok_or_else(|| RelaxError::invalid("no ranks to run"))?;

    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .map(|comm| {
                s.spawn(move || solve_rank(&comm, None, n, options, &mut Quiet))
            })
            .collect();

        // Dropping the coordinator's channels on failure unblocks the
        // other ranks, which then fail too.
        let result = {
            let comm = coordinator;
            solve_rank(&comm, Some(grid), n, options, observer)
        };

        let mut worker_failure = None;
        for (index, handle) in handles.into_iter().enumerate() {
            let worker = index + 1;
            match handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    worker_failure.get_or_insert(e);
                }
                Err(_) => {
                    worker_failure
                        .get_or_insert(RelaxError::WorkerPanicked { worker });
                }
            }
        }

        let solution = result?.ok_or_else(|| {
            RelaxError::comm(0, "coordinator finished without a grid")
        })?;
        match worker_failure {
            Some(e) => Err(e),
            None => Ok(solution),
        }
    })
}
