use crate::common::constants::{AUTDEBYE, AUTOA, RYTOEV};
use crate::domain::{StateIndex, WavecarError, WavecarResult};
use crate::gvectors::cartesian_vector;
use crate::wavecar::coefficients::validate_state;
use crate::wavecar::{RecordSource, Wavecar};
use num_complex::Complex64;
use tracing::debug;

/// Momentum-representation dipole matrix element between two Bloch states
/// on one k-point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionDipole {
    /// `E_final - E_initial` in eV.
    pub energy_difference: f64,
    /// `<initial|final>` over the stored coefficients.
    pub overlap: Complex64,
    /// Cartesian components in Debye.
    pub moment: [Complex64; 3],
}

impl TransitionDipole {
    /// `|moment|^2` summed over components.
    pub fn strength(&self) -> f64 {
        self.moment.iter().map(|value| value.norm_sqr()).sum()
    }
}

pub fn transition_dipole_moment<S: RecordSource>(
    wavecar: &Wavecar<S>,
    initial: StateIndex,
    final_state: StateIndex,
    normalize: bool,
) -> WavecarResult<TransitionDipole> {
    let header = wavecar.header();
    validate_state(header, initial)?;
    validate_state(header, final_state)?;
    if initial.kpoint != final_state.kpoint {
        return Err(WavecarError::KPointMismatch {
            first: initial.kpoint,
            second: final_state.kpoint,
        });
    }

    let reciprocal = header.reciprocal_lattice();
    let gvectors: Vec<[f64; 3]> = wavecar
        .gvectors(initial.kpoint)?
        .into_iter()
        .map(|gvector| cartesian_vector(gvector, [0.0; 3], reciprocal))
        .collect();
    // Spinor coefficients repeat the basis once per channel.
    let basis: Vec<[f64; 3]> = gvectors
        .iter()
        .copied()
        .cycle()
        .take(gvectors.len() * wavecar.layout().spinor_components())
        .collect();

    let initial_coefficients = wavecar.read_coefficients(initial, normalize)?;
    let final_coefficients = wavecar.read_coefficients(final_state, normalize)?;
    let energy_difference = wavecar.bands().energy(final_state) - wavecar.bands().energy(initial);

    let dipole = dipole_from_coefficients(
        &basis,
        &initial_coefficients,
        &final_coefficients,
        energy_difference,
        wavecar.layout().is_gamma(),
    );
    debug!(
        %initial,
        final_state = %final_state,
        energy_difference,
        strength = dipole.strength(),
        "computed transition dipole"
    );
    Ok(dipole)
}

/// `i / (dE / 2Ry) * sum conj(c_i) c_j G * a0 * Debye`. Gamma-reduced bases
/// use the antisymmetrized sum so the implicit `-G` half is accounted for.
/// Degenerate states (`dE = 0`) give non-finite moments.
pub fn dipole_from_coefficients(
    cartesian_gvectors: &[[f64; 3]],
    initial: &[Complex64],
    final_state: &[Complex64],
    energy_difference: f64,
    gamma: bool,
) -> TransitionDipole {
    let mut overlap = Complex64::new(0.0, 0.0);
    let mut sum = [Complex64::new(0.0, 0.0); 3];

    for ((gvector, ci), cj) in cartesian_gvectors.iter().zip(initial).zip(final_state) {
        let forward = ci.conj() * cj;
        overlap += forward;
        let weight = if gamma {
            (forward - ci * cj.conj()) * 0.5
        } else {
            forward
        };
        for (component, g) in sum.iter_mut().zip(gvector) {
            *component += weight * *g;
        }
    }

    let prefactor =
        Complex64::new(0.0, 1.0) / (energy_difference / (2.0 * RYTOEV)) * AUTOA * AUTDEBYE;
    TransitionDipole {
        energy_difference,
        overlap,
        moment: sum.map(|value| prefactor * value),
    }
}
