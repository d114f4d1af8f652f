//! Reader for VASP WAVECAR plane-wave wavefunction files.
//!
//! [`Wavecar`] parses the header and band tables, enumerates the G-vector
//! basis of each k-point and reconstructs states on a real-space grid. The
//! [`observables`] module builds transition dipoles, participation ratios and
//! the electron localization function on top of it, and [`export`] writes
//! VESTA volumetric files.

pub mod common;
pub mod domain;
pub mod export;
pub mod gvectors;
pub mod numerics;
pub mod observables;
pub mod reconstruct;
pub mod wavecar;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use domain::{
    ErrorCategory, GammaReduction, IndexKind, StateIndex, WavecarError, WavecarLayout,
    WavecarResult,
};
pub use gvectors::{GVector, GVectorGenerator};
pub use reconstruct::{RealSpaceWavefunction, ReconstructionRequest};
pub use wavecar::{BandTable, Precision, RecordSource, Wavecar, WavecarHeader, WavecarSummary};
