//! MPI backend, one rank per process.
//!
//! The caller initializes MPI and keeps the `Universe` alive for as long as
//! the communicator is used:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let comm = MpiComm::new(universe.world());
//! ```
//!
//! MPI aborts the job on communication failure, so the fallible methods
//! only report layout mistakes made by the caller. A rank that fails on
//! its own must call [`MpiComm::abort`], or its peers wait forever in the
//! next collective.

use super::{Communicator, COORDINATOR};
use crate::error::{RelaxError, Result};
use mpi::collective::SystemOperation;
use mpi::datatype::PartitionMut;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
// Our `Communicator` shadows the glob; keep MPI's methods in scope.
use mpi::topology::Communicator as _;
use mpi::Count;

pub struct MpiComm {
    world: SimpleCommunicator,
}

impl MpiComm {
    pub fn new(world: SimpleCommunicator) -> Self {
        MpiComm { world }
    }

    /// Terminate every rank in the job with `code`.
    pub fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }

    fn to_counts(&self, values: &[usize]) -> Result<Vec<Count>> {
        values
            .iter()
            .map(|v| {
                Count::try_from(*v).map_err(|_| {
                    RelaxError::comm(
                        self.rank(),
                        format!("{v} does not fit an MPI count"),
                    )
                })
            })
            .collect()
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send(&self, dest: usize, data: &[f64]) -> Result<()> {
        self.world.process_at_rank(dest as i32).send(data);
        Ok(())
    }

    fn receive_into(&self, source: usize, buf: &mut [f64]) -> Result<()> {
        let status = self.world.process_at_rank(source as i32).receive_into(buf);
        if status.count(f64::equivalent_datatype()) as usize != buf.len() {
            return Err(RelaxError::comm(
                self.rank(),
                format!("short message from rank {source}"),
            ));
        }
        Ok(())
    }

    fn gather_varcount(
        &self,
        local: &[f64],
        root_buf: Option<&mut [f64]>,
        counts: &[usize],
        displs: &[usize],
    ) -> Result<()> {
        let root = self.world.process_at_rank(COORDINATOR as i32);
        if !self.is_coordinator() {
            root.gather_varcount_into(local);
            return Ok(());
        }
        let root_buf = root_buf.ok_or_else(|| {
            RelaxError::comm(self.rank(), "coordinator has no gather buffer")
        })?;
        let counts = self.to_counts(counts)?;
        let displs = self.to_counts(displs)?;
        let mut partition = PartitionMut::new(root_buf, counts, displs);
        root.gather_varcount_into_root(local, &mut partition);
        Ok(())
    }

    fn all_reduce_or(&self, local: bool) -> Result<bool> {
        let mut global = false;
        self.world
            .all_reduce_into(&local, &mut global, SystemOperation::logical_or());
        Ok(global)
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }
}
