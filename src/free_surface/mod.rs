// free_surface/mod.rs
// Volume-of-fluid free-surface layer on top of the lattice: cell state
// machine, mass bookkeeping and the per-iteration pass pipeline.

mod flag;
mod mass;
mod pipeline;
mod stats;
mod topology;

pub use flag::*;
pub use pipeline::*;
pub use stats::*;

#[cfg(test)]
#[path = "tests/state_machine.rs"]
mod state_machine;
