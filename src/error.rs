//! Error type shared by the partitioner, the communicators and the solvers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelaxError {
    /// A caller supplied a size, worker count or precision we can't use.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A grid or halo buffer could not be reserved.
    #[error("couldn't allocate a buffer of {elements} elements")]
    Allocation { elements: usize },

    /// A peer went away or sent something we didn't expect.
    #[error("communication failure on rank {rank}: {reason}")]
    Communication { rank: usize, reason: String },

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("couldn't write image: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, RelaxError>;

impl RelaxError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        RelaxError::InvalidArgument(msg.into())
    }

    pub fn comm(rank: usize, reason: impl Into<String>) -> Self {
        RelaxError::Communication {
            rank,
            reason: reason.into(),
        }
    }
}

/// Allocate a zeroed `f64` buffer, reporting failure instead of aborting.
pub fn try_alloc(elements: usize) -> Result<Vec<f64>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(elements)
        .map_err(|_| RelaxError::Allocation { elements })?;
    buffer.resize(elements, 0.0);
    Ok(buffer)
}
