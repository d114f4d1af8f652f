//! Electron localization function from the pseudo wavefunctions.
//!
//! ```text
//! tau  = sum_n  w_n * (-phi_n conj(lap phi_n))
//! D    = tau + 1/2 lap rho - 1/4 |grad rho|^2 / rho
//! D_h  = 3/5 (3 pi^2)^(2/3) rho^(5/3)
//! ELF  = 1 / (1 + (D / D_h)^2)
//! ```
//!
//! Refs: Becke and Edgecombe, J. Chem. Phys. 92, 5397 (1990);
//! Silvi and Savin, Nature 371, 683 (1994).

use crate::domain::{IndexKind, StateIndex, WavecarError, WavecarResult};
use crate::gvectors::{cartesian_vector, centered_frequency, GVector};
use crate::numerics::Fft3d;
use crate::reconstruct::{expand_gamma_half, place_coefficients};
use crate::wavecar::{RecordSource, Wavecar};
use ndarray::{Array3, Zip};
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::debug;

const DH_FLOOR: f64 = 1.0e-8;

/// One ELF grid per spin channel. `kpoint_weights` holds one weight per
/// k-point and is renormalized to sum to one; `grid` defaults to twice the
/// minimum grid.
pub fn electron_localization_function<S: RecordSource>(
    wavecar: &Wavecar<S>,
    kpoint_weights: &[f64],
    grid: Option<[usize; 3]>,
) -> WavecarResult<Vec<Array3<f64>>> {
    let header = wavecar.header();
    let layout = wavecar.layout();
    if kpoint_weights.len() != header.kpoint_count() {
        return Err(WavecarError::IndexOutOfRange {
            index: IndexKind::KPoint,
            value: kpoint_weights.len(),
            max: header.kpoint_count(),
        });
    }
    let grid = grid.unwrap_or_else(|| header.minimum_grid().map(|n| 2 * n));
    header.validate_grid(grid)?;

    let total_weight: f64 = kpoint_weights.iter().sum();
    let weights: Vec<f64> = kpoint_weights.iter().map(|w| w / total_weight).collect();
    let degeneracy = if header.spin_count() == 1 && !layout.is_spin_orbit() {
        2.0
    } else {
        1.0
    };
    let field_scale = 1.0 / header.volume().abs().sqrt();
    let reciprocal = header.reciprocal_lattice();
    let plans = Fft3d::new(grid);

    let basis = (1..=header.kpoint_count())
        .map(|kpoint| wavecar.gvectors(kpoint))
        .collect::<WavecarResult<Vec<_>>>()?;

    let mut localization = Vec::with_capacity(header.spin_count());
    for spin in 1..=header.spin_count() {
        let mut density = Array3::<f64>::zeros((grid[0], grid[1], grid[2]));
        let mut kinetic = Array3::<f64>::zeros((grid[0], grid[1], grid[2]));

        for (kindex, gvectors) in basis.iter().enumerate() {
            let kpoint = kindex + 1;
            let kvector = wavecar.bands().kvector(kpoint);

            for band in 1..=header.band_count() {
                let state = StateIndex::new(spin, kpoint, band);
                let occupation = wavecar.bands().occupation(state);
                if occupation == 0.0 {
                    continue;
                }
                let weight = degeneracy * weights[kindex] * occupation;
                let coefficients = wavecar.read_coefficients(state, false)?;

                let components: Vec<(Vec<GVector>, Vec<Complex64>)> = if layout.is_gamma() {
                    vec![expand_gamma_half(gvectors, &coefficients)]
                } else {
                    coefficients
                        .chunks(gvectors.len().max(1))
                        .map(|half| (gvectors.clone(), half.to_vec()))
                        .collect()
                };

                for (component_gvectors, component) in &components {
                    let laplacian_coefficients: Vec<Complex64> = component_gvectors
                        .iter()
                        .zip(component)
                        .map(|(gvector, value)| {
                            let gk = cartesian_vector(*gvector, kvector, reciprocal);
                            -value * (gk[0] * gk[0] + gk[1] * gk[1] + gk[2] * gk[2])
                        })
                        .collect();

                    let phi = transform(&plans, grid, component_gvectors, component, field_scale);
                    let laplacian = transform(
                        &plans,
                        grid,
                        component_gvectors,
                        &laplacian_coefficients,
                        field_scale,
                    );

                    Zip::from(&mut density)
                        .and(&mut kinetic)
                        .and(&phi)
                        .and(&laplacian)
                        .for_each(|rho, tau, phi, laplacian| {
                            *rho += weight * phi.norm_sqr();
                            *tau += -weight * (phi * laplacian.conj()).re;
                        });
                }
            }
        }

        let (laplacian, gradient_sq) = spectral_derivatives(&plans, &density, reciprocal);
        let mut elf = Array3::<f64>::zeros((grid[0], grid[1], grid[2]));
        Zip::from(&mut elf)
            .and(&density)
            .and(&kinetic)
            .and(&laplacian)
            .and(&gradient_sq)
            .for_each(|elf, &rho, &tau, &laplacian, &gradient_sq| {
                *elf = localization_index(rho, tau, laplacian, gradient_sq);
            });
        debug!(spin, ?grid, "computed electron localization function");
        localization.push(elf);
    }
    Ok(localization)
}

/// ELF at one grid point from density, kinetic term, `lap rho` and
/// `|grad rho|^2`.
pub fn localization_index(rho: f64, tau: f64, laplacian: f64, gradient_sq: f64) -> f64 {
    let homogeneous = if rho > 0.0 {
        0.6 * (3.0 * PI * PI).powf(2.0 / 3.0) * rho.powf(5.0 / 3.0)
    } else {
        0.0
    };
    let homogeneous = homogeneous.max(DH_FLOOR);
    let bosonic = if rho > 0.0 { 0.25 * gradient_sq / rho } else { 0.0 };
    let excess = tau + 0.5 * laplacian - bosonic;
    1.0 / (1.0 + (excess / homogeneous).powi(2))
}

/// Laplacian and squared gradient norm of a periodic real field, evaluated
/// spectrally with `G = f . 2 pi B` on the centered frequencies.
pub fn spectral_derivatives(
    plans: &Fft3d,
    field: &Array3<f64>,
    reciprocal: &[[f64; 3]; 3],
) -> (Array3<f64>, Array3<f64>) {
    let (nx, ny, nz) = field.dim();
    let points = (nx * ny * nz) as f64;
    let mut spectrum = field.mapv(|value| Complex64::new(value, 0.0));
    plans.forward(&mut spectrum);

    let frequencies = Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| {
        cartesian_vector(
            [
                centered_frequency(i, nx),
                centered_frequency(j, ny),
                centered_frequency(k, nz),
            ],
            [0.0; 3],
            reciprocal,
        )
    });

    let mut laplacian = Zip::from(&spectrum)
        .and(&frequencies)
        .map_collect(|value, g| -value * (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]));
    plans.inverse(&mut laplacian);

    let mut gradient_sq = Array3::<f64>::zeros((nx, ny, nz));
    for axis in 0..3 {
        let mut component = Zip::from(&spectrum)
            .and(&frequencies)
            .map_collect(|value, g| Complex64::new(0.0, g[axis]) * value);
        plans.inverse(&mut component);
        Zip::from(&mut gradient_sq)
            .and(&component)
            .for_each(|total, value| *total += (value / points).norm_sqr());
    }

    (laplacian.mapv(|value| value.re / points), gradient_sq)
}

fn transform(
    plans: &Fft3d,
    grid: [usize; 3],
    gvectors: &[GVector],
    coefficients: &[Complex64],
    scale: f64,
) -> Array3<Complex64> {
    let mut field = place_coefficients(grid, gvectors, coefficients);
    plans.inverse(&mut field);
    field.mapv_inplace(|value| value * scale);
    field
}
