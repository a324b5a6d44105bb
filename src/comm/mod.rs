//! Blocking message passing between ranks that share no memory.
//!
//! Every collective must be called by all ranks in the same order.
//! Rank [`COORDINATOR`] is the root of gathers and owns the authoritative
//! grid.

pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;

pub use local::LocalComm;
#[cfg(feature = "mpi")]
pub use self::mpi::MpiComm;

use crate::error::Result;

/// Rank that owns the complete grid between generations.
pub const COORDINATOR: usize = 0;

pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Blocking point-to-point send.
    fn send(&self, dest: usize, data: &[f64]) -> Result<()>;

    /// Blocking receive of exactly `buf.len()` values from `source`.
    fn receive_into(&self, source: usize, buf: &mut [f64]) -> Result<()>;

    /// Variable sized gather to [`COORDINATOR`].
    /// Rank `r` contributes `local` (`counts[r]` values), which lands at
    /// `root_buf[displs[r]..]`. `root_buf` is only read on the coordinator.
    fn gather_varcount(
        &self,
        local: &[f64],
        root_buf: Option<&mut [f64]>,
        counts: &[usize],
        displs: &[usize],
    ) -> Result<()>;

    /// Logical OR of `local` over all ranks, delivered to every rank.
    fn all_reduce_or(&self, local: bool) -> Result<bool>;

    fn barrier(&self) -> Result<()>;
}
