pub mod errors;

pub use errors::{ErrorCategory, IndexKind, WavecarError, WavecarResult};

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Reduction applied when enumerating G-vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GammaReduction {
    #[default]
    Full,
    HalfX,
    HalfZ,
}

impl GammaReduction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::HalfX => "gamma-half-x",
            Self::HalfZ => "gamma-half-z",
        }
    }

    pub const fn is_gamma(self) -> bool {
        !matches!(self, Self::Full)
    }
}

impl Display for GammaReduction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// How the producer laid out plane-wave coefficients in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WavecarLayout {
    #[default]
    Standard,
    GammaHalfZ,
    GammaHalfX,
    SpinOrbit,
}

impl WavecarLayout {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::GammaHalfZ => "gamma-half-z",
            Self::GammaHalfX => "gamma-half-x",
            Self::SpinOrbit => "spin-orbit",
        }
    }

    pub const fn reduction(self) -> GammaReduction {
        match self {
            Self::Standard | Self::SpinOrbit => GammaReduction::Full,
            Self::GammaHalfZ => GammaReduction::HalfZ,
            Self::GammaHalfX => GammaReduction::HalfX,
        }
    }

    pub const fn is_gamma(self) -> bool {
        self.reduction().is_gamma()
    }

    pub const fn is_spin_orbit(self) -> bool {
        matches!(self, Self::SpinOrbit)
    }

    /// Number of coefficients stored per G-vector.
    pub const fn spinor_components(self) -> usize {
        if self.is_spin_orbit() { 2 } else { 1 }
    }
}

impl Display for WavecarLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A Kohn-Sham state addressed by 1-based spin, k-point and band indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StateIndex {
    pub spin: usize,
    pub kpoint: usize,
    pub band: usize,
}

impl StateIndex {
    pub const fn new(spin: usize, kpoint: usize, band: usize) -> Self {
        Self { spin, kpoint, band }
    }
}

impl Display for StateIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "spin {} / k-point {} / band {}",
            self.spin, self.kpoint, self.band
        )
    }
}
