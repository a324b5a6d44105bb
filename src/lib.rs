pub mod build_info;
pub mod comm;
pub mod config;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod init;
pub mod par_slice;
pub mod partition;
pub mod reduce;
pub mod snapshot;
pub mod solver;
pub mod stencil;

pub use error::{RelaxError, Result};
pub use grid::{Grid, GridRef};
pub use solver::{Observer, Quiet, Realization, Solution, SolveOptions};
pub use stencil::ChangeCriterion;
