//! Reciprocal-to-real-space reconstruction of plane-wave states.
//!
//! Coefficients are placed on the FFT grid at their wrapped G-vector and
//! inverse transformed. With the default scale the output satisfies
//! `sum |phi|^2 = 1` for a unit-norm coefficient vector.
//!
//! Gamma-reduced containers only store one half of a Hermitian-symmetric
//! spectrum. The grid keeps the non-negative half of the last axis, the
//! missing entries are filled by conjugate reflection, every amplitude except
//! `G = 0` is divided by `sqrt(2)`, and a complex-to-real inverse transform
//! yields the field.

use crate::domain::{GammaReduction, StateIndex, WavecarError, WavecarLayout, WavecarResult};
use crate::gvectors::{is_canonical_half, wrap_frequency, GVector};
use crate::numerics::{hermitian_length, stable_sum, Fft3d};
use ndarray::Array3;
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;
use tracing::debug;

/// Options for reconstructing one state. Unset fields fall back to the
/// handle: minimum grid, generated G-vectors, coefficients read from the
/// container, `sqrt(N)` scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionRequest {
    state: StateIndex,
    grid: Option<[usize; 3]>,
    gvectors: Option<Vec<GVector>>,
    coefficients: Option<Vec<Complex64>>,
    scale: Option<f64>,
    normalize: bool,
}

impl ReconstructionRequest {
    pub fn new(state: StateIndex) -> Self {
        Self {
            state,
            grid: None,
            gvectors: None,
            coefficients: None,
            scale: None,
            normalize: true,
        }
    }

    pub fn with_grid(mut self, grid: [usize; 3]) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_gvectors(mut self, gvectors: Vec<GVector>) -> Self {
        self.gvectors = Some(gvectors);
        self
    }

    pub fn with_coefficients(mut self, coefficients: Vec<Complex64>) -> Self {
        self.coefficients = Some(coefficients);
        self
    }

    /// Replace the default `sqrt(N)` factor.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Whether coefficients read from the container are normalized first.
    /// Ignored when coefficients are supplied.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn state(&self) -> StateIndex {
        self.state
    }

    pub fn grid(&self) -> Option<[usize; 3]> {
        self.grid
    }

    pub fn gvectors(&self) -> Option<&[GVector]> {
        self.gvectors.as_deref()
    }

    pub fn coefficients(&self) -> Option<&[Complex64]> {
        self.coefficients.as_deref()
    }

    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }
}

/// A reconstructed state on the real-space grid, indexed `[x, y, z]`.
#[derive(Debug, Clone, PartialEq)]
pub enum RealSpaceWavefunction {
    Complex(Array3<Complex64>),
    /// Gamma-reduced layouts yield real fields.
    Real(Array3<f64>),
    /// Spin-up and spin-down channels of a spinor state.
    Spinor([Array3<Complex64>; 2]),
}

impl RealSpaceWavefunction {
    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = match self {
            Self::Complex(field) => field.dim(),
            Self::Real(field) => field.dim(),
            Self::Spinor([up, _]) => up.dim(),
        };
        [nx, ny, nz]
    }

    /// `|phi|^2` at every grid point, summed over spinor channels.
    pub fn density(&self) -> Array3<f64> {
        match self {
            Self::Complex(field) => field.mapv(|value| value.norm_sqr()),
            Self::Real(field) => field.mapv(|value| value * value),
            Self::Spinor([up, down]) => {
                let mut density = up.mapv(|value| value.norm_sqr());
                density.zip_mut_with(down, |total, value| *total += value.norm_sqr());
                density
            }
        }
    }

    /// `sum |phi|^2` over the grid.
    pub fn total_weight(&self) -> f64 {
        stable_sum(self.density().iter().copied())
    }
}

/// Place `coefficients` at the wrapped positions of `gvectors` on a zeroed
/// grid. Repeated placements keep the last value.
pub fn place_coefficients(
    grid: [usize; 3],
    gvectors: &[GVector],
    coefficients: &[Complex64],
) -> Array3<Complex64> {
    let mut spectrum = Array3::<Complex64>::zeros((grid[0], grid[1], grid[2]));
    for (gvector, coefficient) in gvectors.iter().zip(coefficients) {
        let position = [
            wrap_frequency(gvector[0], grid[0]),
            wrap_frequency(gvector[1], grid[1]),
            wrap_frequency(gvector[2], grid[2]),
        ];
        spectrum[position] = *coefficient;
    }
    spectrum
}

/// Half-complex spectrum of a gamma-reduced state, shaped
/// `[nx, ny, nz / 2 + 1]`. Each stored `G` also fills its mirror `-G` with
/// the conjugate amplitude, and everything except `G = 0` is scaled by
/// `1/sqrt(2)`. Entries outside the stored half of the last axis are dropped.
pub fn place_hermitian_half(
    grid: [usize; 3],
    gvectors: &[GVector],
    coefficients: &[Complex64],
    reduction: GammaReduction,
) -> Array3<Complex64> {
    let half_length = hermitian_length(grid[2]);
    let mut spectrum = Array3::<Complex64>::zeros((grid[0], grid[1], half_length));
    let mut put = |gvector: GVector, value: Complex64| {
        let position = [
            wrap_frequency(gvector[0], grid[0]),
            wrap_frequency(gvector[1], grid[1]),
            wrap_frequency(gvector[2], grid[2]),
        ];
        if position[2] < half_length {
            spectrum[position] = value;
        }
    };

    for (gvector, coefficient) in gvectors.iter().zip(coefficients) {
        if *gvector == [0, 0, 0] {
            put(*gvector, *coefficient);
            continue;
        }
        put(*gvector, *coefficient * FRAC_1_SQRT_2);
        let mirror = [-gvector[0], -gvector[1], -gvector[2]];
        // Canonical positions are already populated from the container.
        if !is_canonical_half(mirror, reduction) {
            put(mirror, coefficient.conj() * FRAC_1_SQRT_2);
        }
    }
    spectrum
}

/// Append `-G` with conjugated coefficients to a gamma-half basis and apply
/// the same `1/sqrt(2)` rescaling as [`place_hermitian_half`], giving
/// an explicit full-sphere basis.
pub fn expand_gamma_half(
    gvectors: &[GVector],
    coefficients: &[Complex64],
) -> (Vec<GVector>, Vec<Complex64>) {
    let mut full_gvectors = Vec::with_capacity(2 * gvectors.len());
    let mut full_coefficients = Vec::with_capacity(2 * coefficients.len());
    for (gvector, coefficient) in gvectors.iter().zip(coefficients) {
        full_gvectors.push(*gvector);
        if *gvector == [0, 0, 0] {
            full_coefficients.push(*coefficient);
        } else {
            full_coefficients.push(*coefficient * FRAC_1_SQRT_2);
        }
    }
    for (gvector, coefficient) in gvectors.iter().zip(coefficients) {
        if *gvector != [0, 0, 0] {
            full_gvectors.push([-gvector[0], -gvector[1], -gvector[2]]);
            full_coefficients.push(coefficient.conj() * FRAC_1_SQRT_2);
        }
    }
    (full_gvectors, full_coefficients)
}

/// Inverse transform one coefficient vector onto `grid`.
///
/// The output is the unnormalized inverse DFT multiplied by `scale / N`,
/// with `scale` defaulting to `sqrt(N)`.
pub fn reconstruct_on_grid(
    grid: [usize; 3],
    gvectors: &[GVector],
    coefficients: &[Complex64],
    layout: WavecarLayout,
    scale: Option<f64>,
) -> WavecarResult<RealSpaceWavefunction> {
    let expected = gvectors.len() * layout.spinor_components();
    if coefficients.len() != expected {
        return Err(WavecarError::CoefficientCountMismatch {
            expected,
            actual: coefficients.len(),
        });
    }
    if grid.contains(&0) {
        return Err(WavecarError::InvalidGridSize {
            requested: grid,
            minimum: [1, 1, 1],
        });
    }

    let points = grid.iter().product::<usize>() as f64;
    let factor = scale.unwrap_or_else(|| points.sqrt()) / points;
    let plans = Fft3d::new(grid);
    debug!(?grid, %layout, plane_waves = gvectors.len(), factor, "reconstructing state");

    let transform = |values: &[Complex64]| {
        let mut field = place_coefficients(grid, gvectors, values);
        plans.inverse(&mut field);
        field.mapv_inplace(|value| value * factor);
        field
    };

    if layout.is_spin_orbit() {
        let (up, down) = coefficients.split_at(gvectors.len());
        return Ok(RealSpaceWavefunction::Spinor([transform(up), transform(down)]));
    }

    if layout.is_gamma() {
        let spectrum = place_hermitian_half(grid, gvectors, coefficients, layout.reduction());
        let mut field = plans.inverse_hermitian(spectrum);
        field.mapv_inplace(|value| value * factor);
        return Ok(RealSpaceWavefunction::Real(field));
    }

    Ok(RealSpaceWavefunction::Complex(transform(coefficients)))
}
