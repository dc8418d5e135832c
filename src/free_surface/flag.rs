// free_surface/flag.rs
// Per-cell state of the free-surface model.

use serde::{Deserialize, Serialize};

/// State of a lattice cell. `Interface` cells form a closed layer between
/// `Fluid` and `Empty`; a fluid cell and an empty cell are never adjacent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Flag {
    /// Gas cell. Carries no populations and no mass.
    Empty,
    /// Partially filled cell on the surface. Carries populations and mass.
    Interface,
    /// Bulk liquid cell. Its mass equals its density.
    Fluid,
    /// Immobile boundary cell.
    Wall,
}

impl Flag {
    /// Wet cells carry populations: fluid and interface.
    #[inline]
    pub fn is_wet(self) -> bool {
        matches!(self, Flag::Fluid | Flag::Interface)
    }
}
