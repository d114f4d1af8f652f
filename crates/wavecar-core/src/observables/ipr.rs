use crate::domain::{StateIndex, WavecarResult};
use crate::numerics::stable_sum;
use crate::reconstruct::{reconstruct_on_grid, RealSpaceWavefunction};
use crate::wavecar::{RecordSource, Wavecar};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParticipationRatio {
    pub state: StateIndex,
    /// Cumulative k-path coordinate, zero for a single k-point.
    pub kpath: f64,
    pub energy: f64,
    pub ipr: f64,
}

/// `sum |phi|^4 / (sum |phi|^2)^2`; spinor states use the summed density of
/// both channels. A vanishing field reports zero.
pub fn inverse_participation_ratio(field: &RealSpaceWavefunction) -> f64 {
    let density = field.density();
    let total = stable_sum(density.iter().copied());
    if total == 0.0 {
        return 0.0;
    }
    stable_sum(density.iter().map(|value| value * value)) / (total * total)
}

/// IPR of every state on the minimum grid, spin-major.
pub fn inverse_participation_ratios<S: RecordSource>(
    wavecar: &Wavecar<S>,
    normalize: bool,
) -> WavecarResult<Vec<ParticipationRatio>> {
    let header = wavecar.header();
    let grid = header.minimum_grid();
    let gvectors = (1..=header.kpoint_count())
        .map(|kpoint| wavecar.gvectors(kpoint))
        .collect::<WavecarResult<Vec<_>>>()?;

    let mut ratios = Vec::with_capacity(
        header.spin_count() * header.kpoint_count() * header.band_count(),
    );
    for state in wavecar.states() {
        let coefficients = wavecar.read_coefficients(state, normalize)?;
        let field = reconstruct_on_grid(
            grid,
            &gvectors[state.kpoint - 1],
            &coefficients,
            wavecar.layout(),
            None,
        )?;
        let ipr = inverse_participation_ratio(&field);
        debug!(%state, ipr, "computed inverse participation ratio");
        ratios.push(ParticipationRatio {
            state,
            kpath: wavecar
                .bands()
                .kpath()
                .map_or(0.0, |path| path[state.kpoint - 1]),
            energy: wavecar.bands().energy(state),
            ipr,
        });
    }
    Ok(ratios)
}
