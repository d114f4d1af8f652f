//! The WAVECAR container handle.
//!
//! Opening parses the header and the band tables of every spin channel once;
//! coefficient blocks are read on demand through positional reads, so a
//! shared `&Wavecar` can serve concurrent callers.

pub mod bands;
pub mod coefficients;
pub mod header;
pub mod source;

pub use bands::BandTable;
pub use header::{Precision, WavecarHeader};
pub use source::RecordSource;

use crate::domain::{
    GammaReduction, IndexKind, StateIndex, WavecarError, WavecarLayout, WavecarResult,
};
use crate::gvectors::{check_plane_wave_count, GVector, GVectorGenerator};
use crate::reconstruct::{reconstruct_on_grid, RealSpaceWavefunction, ReconstructionRequest};
use num_complex::Complex64;
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

#[derive(Debug)]
pub struct Wavecar<S = File> {
    source: S,
    layout: WavecarLayout,
    header: WavecarHeader,
    bands: BandTable,
}

impl Wavecar<File> {
    pub fn open(path: impl AsRef<Path>, layout: WavecarLayout) -> WavecarResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            WavecarError::stream(format!("failed to open '{}'", path.display()), source)
        })?;
        Self::from_source(file, layout)
    }
}

impl<S: RecordSource> Wavecar<S> {
    pub fn from_source(source: S, layout: WavecarLayout) -> WavecarResult<Self> {
        let header = WavecarHeader::read_from(&source)?;
        if layout.is_spin_orbit() && header.spin_count() != 1 {
            return Err(WavecarError::malformed(format!(
                "spin-orbit layout requires a single spin channel, header declares {}",
                header.spin_count()
            )));
        }
        let bands = BandTable::read_from(&source, &header)?;
        Ok(Self {
            source,
            layout,
            header,
            bands,
        })
    }

    pub fn header(&self) -> &WavecarHeader {
        &self.header
    }

    pub fn bands(&self) -> &BandTable {
        &self.bands
    }

    pub fn layout(&self) -> WavecarLayout {
        self.layout
    }

    /// Every addressable state, spin-major then k-point then band.
    pub fn states(&self) -> impl Iterator<Item = StateIndex> + '_ {
        let (spins, kpoints, bands) = (
            self.header.spin_count(),
            self.header.kpoint_count(),
            self.header.band_count(),
        );
        (1..=spins).flat_map(move |spin| {
            (1..=kpoints).flat_map(move |kpoint| {
                (1..=bands).map(move |band| StateIndex::new(spin, kpoint, band))
            })
        })
    }

    /// G-vectors of a 1-based k-point under the handle's layout, checked
    /// against the stored plane-wave count.
    pub fn gvectors(&self, kpoint: usize) -> WavecarResult<Vec<GVector>> {
        self.gvectors_with(kpoint, self.layout.reduction(), true)
    }

    /// G-vectors with an explicit reduction; `check` toggles the comparison
    /// with the stored plane-wave count.
    pub fn gvectors_with(
        &self,
        kpoint: usize,
        reduction: GammaReduction,
        check: bool,
    ) -> WavecarResult<Vec<GVector>> {
        coefficients::check_index(IndexKind::KPoint, kpoint, self.header.kpoint_count())?;
        let gvectors = GVectorGenerator::for_header(&self.header)
            .generate(self.bands.kvector(kpoint), reduction);
        if check {
            check_plane_wave_count(
                kpoint,
                gvectors.len(),
                self.bands.plane_wave_count(kpoint),
                self.layout,
            )?;
        }
        Ok(gvectors)
    }

    /// Stored coefficients of `state`; spinor states return both halves
    /// concatenated.
    pub fn read_coefficients(
        &self,
        state: StateIndex,
        normalize: bool,
    ) -> WavecarResult<Vec<Complex64>> {
        coefficients::validate_state(&self.header, state)?;
        coefficients::read_coefficients(
            &self.source,
            &self.header,
            state,
            self.bands.plane_wave_count(state.kpoint),
            normalize,
        )
    }

    pub fn reconstruct(
        &self,
        request: &ReconstructionRequest,
    ) -> WavecarResult<RealSpaceWavefunction> {
        let state = request.state();
        coefficients::validate_state(&self.header, state)?;
        let grid = request.grid().unwrap_or(self.header.minimum_grid());
        self.header.validate_grid(grid)?;

        let gvectors: Cow<'_, [GVector]> = match request.gvectors() {
            Some(gvectors) => Cow::Borrowed(gvectors),
            None => Cow::Owned(self.gvectors(state.kpoint)?),
        };
        let coefficients: Cow<'_, [Complex64]> = match request.coefficients() {
            Some(coefficients) => Cow::Borrowed(coefficients),
            None => Cow::Owned(self.read_coefficients(state, request.normalize())?),
        };

        reconstruct_on_grid(grid, &gvectors, &coefficients, self.layout, request.scale())
    }

    pub fn summary(&self) -> WavecarSummary<'_> {
        let kpath = self.bands.kpath();
        let kpoints = (1..=self.header.kpoint_count())
            .map(|kpoint| KPointSummary {
                index: kpoint,
                kvector: self.bands.kvector(kpoint),
                plane_waves: self.bands.plane_wave_count(kpoint),
                kpath: kpath.map(|path| path[kpoint - 1]),
                bands: (1..=self.header.spin_count())
                    .flat_map(|spin| {
                        (1..=self.header.band_count()).map(move |band| {
                            let state = StateIndex::new(spin, kpoint, band);
                            BandSummary {
                                spin,
                                band,
                                energy: self.bands.energy(state),
                                occupation: self.bands.occupation(state),
                            }
                        })
                    })
                    .collect(),
            })
            .collect();

        WavecarSummary {
            layout: self.layout,
            header: &self.header,
            kpoints,
        }
    }
}

/// Header and band table in a serializable shape.
#[derive(Debug, Clone, Serialize)]
pub struct WavecarSummary<'a> {
    pub layout: WavecarLayout,
    pub header: &'a WavecarHeader,
    pub kpoints: Vec<KPointSummary>,
}

impl WavecarSummary<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KPointSummary {
    pub index: usize,
    pub kvector: [f64; 3],
    pub plane_waves: usize,
    pub kpath: Option<f64>,
    pub bands: Vec<BandSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandSummary {
    pub spin: usize,
    pub band: usize,
    pub energy: f64,
    pub occupation: f64,
}
