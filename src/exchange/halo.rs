use crate::comm::{Communicator, COORDINATOR};
use crate::error::{try_alloc, RelaxError, Result};
use crate::partition::{self, HaloRegion, WorkAssignment};
use crate::stencil::GridWindow;

/// Coordinator side: send every other rank exactly its halo rows.
pub fn distribute_halos<C: Communicator>(
    comm: &C,
    current: &[f64],
    n: usize,
    assignments: &[WorkAssignment],
) -> Result<()> {
    profiling::scope!("exchange::distribute_halos");
    debug_assert!(comm.is_coordinator());
    for (rank, assignment) in assignments.iter().enumerate() {
        if rank == COORDINATOR {
            continue;
        }
        if let Some(region) = assignment.halo(n) {
            comm.send(rank, &current[region.flat_range(n)])?;
        }
    }
    Ok(())
}

/// Every rank: hand the cells it computed to the coordinator, which writes
/// them into `authoritative` at each rank's start offset.
pub fn gather_results<C: Communicator>(
    comm: &C,
    computed: &[f64],
    authoritative: Option<&mut [f64]>,
    assignments: &[WorkAssignment],
) -> Result<()> {
    profiling::scope!("exchange::gather_results");
    comm.gather_varcount(
        computed,
        authoritative,
        &partition::counts(assignments),
        &partition::displacements(assignments),
    )
}

/// A non-coordinator rank's private copy of the rows around its assignment.
#[derive(Debug)]
pub struct HaloBuffer {
    region: HaloRegion,
    n: usize,
    data: Vec<f64>,
}

impl HaloBuffer {
    pub fn new(assignment: &WorkAssignment, n: usize) -> Result<Self> {
        let region = assignment.halo(n).ok_or_else(|| {
            RelaxError::invalid("an empty assignment has no halo")
        })?;
        let data = try_alloc(region.len(n))?;
        Ok(HaloBuffer { region, n, data })
    }

    /// Blocking receive of this generation's rows from the coordinator.
    pub fn receive<C: Communicator>(&mut self, comm: &C) -> Result<()> {
        profiling::scope!("exchange::receive_halo");
        comm.receive_into(COORDINATOR, &mut self.data)
    }

    pub fn window(&self) -> GridWindow<'_> {
        GridWindow::new(&self.data, self.region.offset(self.n))
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::comm::LocalComm;
    use crate::partition::partition;

    #[test]
    fn halos_and_gather_round_trip() {
        let n = 5;
        let size = 3;
        let assignments = partition(n, size).unwrap();
        let grid: Vec<f64> = (0..n * n).map(|i| i as f64).collect();

        let results: Vec<Result<Vec<f64>>> = std::thread::scope(|s| {
            let handles: Vec<_> = LocalComm::world(size)
                .into_iter()
                .map(|comm| {
                    let assignments = &assignments;
                    let grid = &grid;
                    s.spawn(move || -> Result<Vec<f64>> {
                        let mine = assignments[comm.rank()];
                        let mut computed = vec![0.0; mine.count];
                        if comm.is_coordinator() {
                            distribute_halos(&comm, grid, n, assignments)?;
                            let mut out = vec![0.0; n * n];
                            for (k, v) in computed.iter_mut().enumerate() {
                                *v = -grid[mine.start + k];
                            }
                            gather_results(
                                &comm,
                                &computed,
                                Some(&mut out),
                                assignments,
                            )?;
                            Ok(out)
                        } else {
                            let mut halo = HaloBuffer::new(&mine, n)?;
                            halo.receive(&comm)?;
                            let window = halo.window();
                            // every owned cell is readable through the halo
                            for (k, v) in computed.iter_mut().enumerate() {
                                *v = -window.get(mine.start + k);
                            }
                            gather_results(&comm, &computed, None, assignments)?;
                            Ok(vec![])
                        }
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let out = results[0].as_ref().unwrap();
        for i in 0..n * n {
            assert_eq!(out[i], -(i as f64));
        }
        for r in &results[1..] {
            assert!(r.is_ok());
        }
    }
}
