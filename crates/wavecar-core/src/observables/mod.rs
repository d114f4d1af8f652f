//! Physical quantities derived from reconstructed states.

pub mod dipole;
pub mod elf;
pub mod ipr;

pub use dipole::{dipole_from_coefficients, transition_dipole_moment, TransitionDipole};
pub use elf::{electron_localization_function, localization_index, spectral_derivatives};
pub use ipr::{inverse_participation_ratio, inverse_participation_ratios, ParticipationRatio};
