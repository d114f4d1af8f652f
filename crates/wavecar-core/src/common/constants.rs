//! Physical constants used by the WAVECAR producer.
//!
//! The cutoff-to-grid relation and the kinetic-energy filter must use the
//! producer's own values, not CODATA, or plane-wave counts drift at the
//! basis-set boundary.

use std::f64::consts::PI;

pub const TPI: f64 = 2.0 * PI;
/// Bohr radius in Angstrom.
pub const AUTOA: f64 = 0.529_177_249_f64;
/// Rydberg in eV.
pub const RYTOEV: f64 = 13.605_826_f64;
/// hbar^2 / (2 m_e) in eV * Angstrom^2.
pub const HSQDTM: f64 = RYTOEV * AUTOA * AUTOA;
/// Atomic unit of dipole moment in Debye.
pub const AUTDEBYE: f64 = 2.541_746_f64;
