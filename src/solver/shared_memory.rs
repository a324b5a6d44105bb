//! Shared memory solver: a fixed pool of scoped threads over one
//! [`BufferArena`], two barrier waits per generation.
//!
//! ```text
//! coordinator:  observe, reset flag | release | done | promote, test flag
//! worker:                           | release | compute slice | done
//! ```
//!
//! The coordinator touches the arena index and the flags only between
//! `done` and the next `release`, while every worker is parked.

use super::{Observer, Solution, SolveOptions};
use crate::error::{RelaxError, Result};
use crate::exchange::BufferArena;
use crate::grid::{Grid, GridRef};
use crate::partition::{partition, WorkAssignment};
use crate::reduce::ChangedFlag;
use crate::stencil::{GridWindow, StencilKernel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Everything one worker needs, fixed before the pool starts.
struct WorkerTask<'a> {
    id: usize,
    assignment: WorkAssignment,
    kernel: StencilKernel,
    arena: &'a BufferArena,
    changed: &'a ChangedFlag,
    finished: &'a AtomicBool,
    barrier: &'a Barrier,
}

impl WorkerTask<'_> {
    fn run(self) {
        debug!(
            worker = self.id,
            start = self.assignment.start,
            end = self.assignment.end() - 1,
            "thread assignment"
        );
        loop {
            // release
            self.barrier.wait();
            if self.finished.load(Ordering::Relaxed) {
                break;
            }

            let local_changed = {
                profiling::scope!("shared_memory: Thread Callback");
                // SAFETY: between `release` and `done` nobody toggles the
                // arena, and assignments are disjoint.
                let (current, next) = unsafe {
                    (
                        self.arena.current(),
                        self.arena.next_slice(self.assignment.range()),
                    )
                };
                self.kernel.apply_range(
                    self.assignment.start,
                    &GridWindow::full(current),
                    next,
                )
            };
            self.changed.accumulate(local_changed);

            // done
            self.barrier.wait();
        }
    }
}

/// Parks the pool for good when dropped: sets `finished` and opens the
/// release barrier. Dropping it during unwind lets the scope join the
/// workers instead of waiting on them forever.
struct PoolShutdown<'a> {
    finished: &'a AtomicBool,
    barrier: &'a Barrier,
}

impl Drop for PoolShutdown<'_> {
    fn drop(&mut self) {
        self.finished.store(true, Ordering::Relaxed);
        self.barrier.wait();
    }
}

pub fn solve<O: Observer>(
    grid: Grid,
    options: &SolveOptions,
    observer: &mut O,
) -> Result<Solution> {
    options.validate()?;
    let n = grid.n();
    let assignments = partition(n, options.workers)?;
    let kernel = options.kernel(n);
    info!(
        n,
        threads = options.workers,
        precision = options.precision,
        "shared memory solve"
    );

    let arena = BufferArena::new(grid.into_vec())?;
    let changed = ChangedFlag::new();
    let finished = AtomicBool::new(false);
    let barrier = Barrier::new(options.workers + 1);

    let start = Instant::now();
    let generations = std::thread::scope(|s| -> Result<usize> {
        let handles: Vec<_> = assignments
            .iter()
            .enumerate()
            .map(|(id, assignment)| {
                let task = WorkerTask {
                    id,
                    assignment: *assignment,
                    kernel,
                    arena: &arena,
                    changed: &changed,
                    finished: &finished,
                    barrier: &barrier,
                };
                s.spawn(move || task.run())
            })
            .collect();

        // Workers are parked at `release` whenever this drops.
        let shutdown = PoolShutdown {
            finished: &finished,
            barrier: &barrier,
        };
        let mut generations = 0;
        loop {
            // SAFETY: workers are parked at `release`.
            let current = unsafe { arena.current() };
            observer.observe(generations, GridRef::new(n, current));
            changed.reset();

            barrier.wait(); // release
            barrier.wait(); // done

            arena.promote_next();
            generations += 1;
            let any_changed = changed.is_set();
            trace!(generation = generations, changed = any_changed);
            if !any_changed {
                break;
            }
        }

        drop(shutdown);

        for (worker, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| RelaxError::WorkerPanicked { worker })?;
        }
        Ok(generations)
    })?;
    let elapsed = start.elapsed();

    info!(generations, ?elapsed, "converged");
    Ok(Solution {
        grid: Grid::from_vec(n, arena.into_current())?,
        generations,
        elapsed,
    })
}
