//! Plane-wave basis enumeration.
//!
//! G-vectors come out in z-major, y-middle, x-minor order over the FFT grid,
//! which is the order the producer stored the coefficients in. Any change to
//! the frequency mapping or the half-space rule breaks positional matching
//! against the stored coefficient blocks.

use crate::common::constants::{HSQDTM, TPI};
use crate::domain::{GammaReduction, WavecarError, WavecarLayout, WavecarResult};
use crate::numerics::row_times_matrix;
use crate::wavecar::WavecarHeader;
use tracing::debug;

/// Integer reciprocal-lattice index triple, not yet wrapped onto a grid.
pub type GVector = [i64; 3];

/// Signed frequency of grid index `index` on an axis of length `n`:
/// `index` when `index < n / 2 + 1` (integer division), else `index - n`.
pub fn centered_frequency(index: usize, n: usize) -> i64 {
    if index < n / 2 + 1 {
        index as i64
    } else {
        index as i64 - n as i64
    }
}

/// Placement index of a frequency on an axis of length `n`.
pub fn wrap_frequency(frequency: i64, n: usize) -> usize {
    frequency.rem_euclid(n as i64) as usize
}

/// Whether `frequency` lies in the half of the Hermitian-symmetric set that a
/// gamma-reduced container stores. Shared by basis enumeration and by the
/// conjugate completion before the real-valued transform.
pub fn is_canonical_half(frequency: GVector, reduction: GammaReduction) -> bool {
    let [fx, fy, fz] = frequency;
    let (lead, middle, last) = match reduction {
        GammaReduction::Full => return true,
        GammaReduction::HalfX => (fx, fy, fz),
        GammaReduction::HalfZ => (fz, fy, fx),
    };
    lead > 0 || (lead == 0 && middle > 0) || (lead == 0 && middle == 0 && last >= 0)
}

/// Enumerates the plane-wave basis of one k-point on a fixed grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GVectorGenerator {
    grid: [usize; 3],
    reciprocal: [[f64; 3]; 3],
    encut: f64,
}

impl GVectorGenerator {
    pub fn new(grid: [usize; 3], reciprocal: [[f64; 3]; 3], encut: f64) -> Self {
        Self {
            grid,
            reciprocal,
            encut,
        }
    }

    /// Generator on the header's minimum grid, the grid the producer used.
    pub fn for_header(header: &WavecarHeader) -> Self {
        Self::new(
            header.minimum_grid(),
            *header.reciprocal_lattice(),
            header.encut(),
        )
    }

    pub fn grid(&self) -> [usize; 3] {
        self.grid
    }

    /// All frequency triples admitted by `reduction`, before the cutoff.
    pub fn candidates(&self, reduction: GammaReduction) -> impl Iterator<Item = GVector> + '_ {
        let [nx, ny, nz] = self.grid;
        (0..nz).flat_map(move |k| {
            (0..ny).flat_map(move |j| {
                (0..nx).filter_map(move |i| {
                    let frequency = [
                        centered_frequency(i, nx),
                        centered_frequency(j, ny),
                        centered_frequency(k, nz),
                    ];
                    is_canonical_half(frequency, reduction).then_some(frequency)
                })
            })
        })
    }

    /// `HSQDTM * |(G + k) . 2 pi B|^2` in eV.
    pub fn kinetic_energy(&self, gvector: GVector, kvector: [f64; 3]) -> f64 {
        let cartesian = cartesian_vector(gvector, kvector, &self.reciprocal);
        HSQDTM * cartesian.iter().map(|value| value * value).sum::<f64>()
    }

    /// Basis of k-point `kvector`: candidates strictly below the cutoff, in
    /// enumeration order.
    pub fn generate(&self, kvector: [f64; 3], reduction: GammaReduction) -> Vec<GVector> {
        let gvectors: Vec<GVector> = self
            .candidates(reduction)
            .filter(|gvector| self.kinetic_energy(*gvector, kvector) < self.encut)
            .collect();
        debug!(
            grid = ?self.grid,
            %reduction,
            count = gvectors.len(),
            "generated G-vectors"
        );
        gvectors
    }
}

/// Cartesian `(G + k) . 2 pi B` in 1/Angstrom.
pub fn cartesian_vector(gvector: GVector, kvector: [f64; 3], reciprocal: &[[f64; 3]; 3]) -> [f64; 3] {
    let shifted = [
        (gvector[0] as f64 + kvector[0]) * TPI,
        (gvector[1] as f64 + kvector[1]) * TPI,
        (gvector[2] as f64 + kvector[2]) * TPI,
    ];
    row_times_matrix(shifted, reciprocal)
}

/// Compare a generated basis with the stored plane-wave count; spin-orbit
/// containers store two coefficients per G-vector.
pub fn check_plane_wave_count(
    kpoint: usize,
    generated: usize,
    stored: usize,
    layout: WavecarLayout,
) -> WavecarResult<()> {
    if generated * layout.spinor_components() != stored {
        return Err(WavecarError::PlaneWaveCountMismatch {
            kpoint,
            generated,
            stored,
        });
    }
    Ok(())
}
