// grid/mod.rs
// Block-partitioned 2D domain: geometry, scalar fields and the collective
// reductions that run one closure per block and merge the partial results.

mod field;
mod layout;
pub mod reduce;

pub use field::*;
pub use layout::*;
