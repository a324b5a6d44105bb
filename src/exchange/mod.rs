//! Moving neighbor data and results between workers.
//!
//! `halo` is the message passing side: the coordinator ships each rank the
//! rows it needs and gathers the computed cells back. `arena` is the shared
//! memory side: two generation buffers every worker can see, toggled by the
//! coordinator between barriers.

pub mod arena;
pub mod halo;

pub use arena::BufferArena;
pub use halo::{distribute_halos, gather_results, HaloBuffer};
