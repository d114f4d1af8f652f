use super::coefficients::record_index;
use super::header::WavecarHeader;
use super::source::{read_f64_values, RecordSource};
use crate::domain::{StateIndex, WavecarError, WavecarResult};
use crate::numerics::{norm3, row_times_matrix};
use ndarray::Array3;
use tracing::{debug, warn};

/// Per-k-point plane-wave counts, k-vectors and the band energy/occupation
/// table of every spin channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    plane_wave_counts: Vec<usize>,
    kvectors: Vec<[f64; 3]>,
    energies: Array3<f64>,
    occupations: Array3<f64>,
    kpath: Option<Vec<f64>>,
}

impl BandTable {
    pub fn read_from<S: RecordSource + ?Sized>(
        source: &S,
        header: &WavecarHeader,
    ) -> WavecarResult<Self> {
        let spins = header.spin_count();
        let kpoints = header.kpoint_count();
        let bands = header.band_count();

        let source_length = source
            .byte_len()
            .map_err(|error| WavecarError::stream("failed to query WAVECAR length", error))?;
        let last_record = header.record_offset(header.record_count() - 1);
        if source_length <= last_record {
            return Err(WavecarError::malformed(format!(
                "header declares {} records of {} bytes but the source holds only {} bytes",
                header.record_count(),
                header.record_length(),
                source_length
            )));
        }

        let values_per_record = bands
            .checked_mul(3)
            .and_then(|values| values.checked_add(4))
            .filter(|values| {
                values
                    .checked_mul(8)
                    .is_some_and(|bytes| bytes as u64 <= header.record_length())
            })
            .ok_or_else(|| {
                WavecarError::malformed(format!(
                    "band table of {bands} bands does not fit in a {}-byte record",
                    header.record_length()
                ))
            })?;

        let mut plane_wave_counts = vec![0_usize; kpoints];
        let mut kvectors = vec![[0.0; 3]; kpoints];
        let mut energies = Array3::<f64>::zeros((spins, kpoints, bands));
        let mut occupations = Array3::<f64>::zeros((spins, kpoints, bands));

        for spin in 0..spins {
            for kpoint in 0..kpoints {
                let record = record_index(header, StateIndex::new(spin + 1, kpoint + 1, 1)) - 1;
                let values =
                    read_f64_values(source, header.record_offset(record), values_per_record)
                        .map_err(|error| {
                            WavecarError::stream(
                                format!(
                                    "failed to read band table of spin {} k-point {}",
                                    spin + 1,
                                    kpoint + 1
                                ),
                                error,
                            )
                        })?;

                let plane_waves = plane_wave_count(values[0], kpoint + 1)?;
                let kvector = [values[1], values[2], values[3]];
                if spin == 0 {
                    let fits = plane_waves
                        .checked_mul(header.precision().complex_bytes())
                        .is_some_and(|bytes| bytes as u64 <= header.record_length());
                    if !fits {
                        return Err(WavecarError::malformed(format!(
                            "{} plane waves at k-point {} do not fit in a {}-byte record",
                            plane_waves,
                            kpoint + 1,
                            header.record_length()
                        )));
                    }
                    plane_wave_counts[kpoint] = plane_waves;
                    kvectors[kpoint] = kvector;
                } else if plane_waves != plane_wave_counts[kpoint] || kvector != kvectors[kpoint] {
                    // Only the first spin channel is authoritative.
                    warn!(
                        spin = spin + 1,
                        kpoint = kpoint + 1,
                        plane_waves,
                        first_channel_plane_waves = plane_wave_counts[kpoint],
                        "spin channel disagrees with spin 1 on plane-wave count or k-vector"
                    );
                }

                for (band, triple) in values[4..].chunks_exact(3).enumerate() {
                    energies[[spin, kpoint, band]] = triple[0];
                    occupations[[spin, kpoint, band]] = triple[2];
                }
            }
        }

        let kpath = cumulative_kpath(&kvectors, header.reciprocal_lattice());
        debug!(
            kpoints,
            bands,
            max_plane_waves = plane_wave_counts.iter().copied().max().unwrap_or(0),
            "parsed WAVECAR band table"
        );

        Ok(Self {
            plane_wave_counts,
            kvectors,
            energies,
            occupations,
            kpath,
        })
    }

    /// Stored plane-wave count of a 1-based k-point.
    pub fn plane_wave_count(&self, kpoint: usize) -> usize {
        self.plane_wave_counts[kpoint - 1]
    }

    pub fn plane_wave_counts(&self) -> &[usize] {
        &self.plane_wave_counts
    }

    /// Fractional k-vector of a 1-based k-point.
    pub fn kvector(&self, kpoint: usize) -> [f64; 3] {
        self.kvectors[kpoint - 1]
    }

    pub fn kvectors(&self) -> &[[f64; 3]] {
        &self.kvectors
    }

    /// Band energies indexed `[spin, kpoint, band]` from zero.
    pub fn energies(&self) -> &Array3<f64> {
        &self.energies
    }

    pub fn occupations(&self) -> &Array3<f64> {
        &self.occupations
    }

    pub fn energy(&self, state: StateIndex) -> f64 {
        self.energies[[state.spin - 1, state.kpoint - 1, state.band - 1]]
    }

    pub fn occupation(&self, state: StateIndex) -> f64 {
        self.occupations[[state.spin - 1, state.kpoint - 1, state.band - 1]]
    }

    /// Cumulative Cartesian k-path length; `None` for a single k-point.
    pub fn kpath(&self) -> Option<&[f64]> {
        self.kpath.as_deref()
    }
}

/// Distances between successive k-points in Cartesian units (1/Angstrom,
/// without 2*pi), accumulated from zero.
pub fn cumulative_kpath(kvectors: &[[f64; 3]], reciprocal: &[[f64; 3]; 3]) -> Option<Vec<f64>> {
    if kvectors.len() < 2 {
        return None;
    }

    let mut path = Vec::with_capacity(kvectors.len());
    path.push(0.0);
    let mut total = 0.0;
    for pair in kvectors.windows(2) {
        let delta = [
            pair[1][0] - pair[0][0],
            pair[1][1] - pair[0][1],
            pair[1][2] - pair[0][2],
        ];
        total += norm3(row_times_matrix(delta, reciprocal));
        path.push(total);
    }
    Some(path)
}

fn plane_wave_count(value: f64, kpoint: usize) -> WavecarResult<usize> {
    if !value.is_finite() || value < 1.0 {
        return Err(WavecarError::malformed(format!(
            "k-point {kpoint} records an invalid plane-wave count {value}"
        )));
    }
    Ok(value as usize)
}
