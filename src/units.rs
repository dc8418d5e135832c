//! Lattice unit definitions and conversions.
//!
//! Base units:
//! - Length: one lattice cell
//! - Time: one lattice iteration
//! - Density: reference density rho0 = 1

/// Square of the lattice speed of sound for the D2Q9 model.
pub const CS2: f64 = 1.0 / 3.0;

/// Pressure of a cell at the given density, lattice units.
/// Ideal-gas closure: p = cs² ρ.
pub fn pressure(rho: f64) -> f64 {
    CS2 * rho
}

/// Kinematic viscosity implied by a BGK relaxation frequency.
/// nu = cs² (1/omega - 1/2)
pub fn kinematic_viscosity(omega: f64) -> f64 {
    CS2 * (1.0 / omega - 0.5)
}

/// Relaxation frequency that yields the given kinematic viscosity.
pub fn omega_for_viscosity(nu: f64) -> f64 {
    1.0 / (nu / CS2 + 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viscosity_round_trips_through_omega() {
        let nu = kinematic_viscosity(1.1);
        assert!(nu > 0.0, "omega below 2 gives positive viscosity");
        let omega = omega_for_viscosity(nu);
        assert!((omega - 1.1).abs() < 1e-12, "omega -> nu -> omega is the identity");
    }
}
