//! Synthetic WAVECAR containers for tests.
//!
//! Compiled for the crate's own unit tests and, through the `test-support`
//! feature, for integration tests here and in the CLI crate.

use crate::domain::{StateIndex, WavecarLayout};
use crate::gvectors::GVectorGenerator;
use crate::wavecar::coefficients::{normalize_coefficients, record_index};
use crate::wavecar::{Precision, WavecarHeader};
use num_complex::Complex64;
use std::fs;
use std::path::{Path, PathBuf};

pub const CUBIC: [[f64; 3]; 3] = [[6.0, 0.0, 0.0], [0.0, 6.0, 0.0], [0.0, 0.0, 6.0]];

pub const POSCAR: &str =
    "cubic test cell\n1.0\n6.0 0.0 0.0\n0.0 6.0 0.0\n0.0 0.0 6.0\nH\n1\nDirect\n0.0 0.0 0.0\n";

pub fn write_poscar(dir: &Path) -> PathBuf {
    let path = dir.join("POSCAR");
    fs::write(&path, POSCAR).expect("POSCAR fixture should be written");
    path
}

/// Deterministic coefficients with a real first entry, so gamma-half
/// vectors stay Hermitian at `G = 0`.
pub fn smooth_coefficients(count: usize, normalize: bool) -> Vec<Complex64> {
    let mut values: Vec<Complex64> = (0..count)
        .map(|index| {
            let n = index as f64;
            Complex64::new((0.9 * n).cos() + 1.1, (1.3 * n).sin()) / (1.0 + n)
        })
        .collect();
    if normalize {
        normalize_coefficients(&mut values);
    }
    values
}

/// WAVECAR bytes assembled record by record, little-endian: one band table
/// record and one record per band for every (spin, k-point).
#[derive(Debug, Clone)]
pub struct SyntheticWavecar {
    pub layout: WavecarLayout,
    pub spin_count: usize,
    pub precision: Precision,
    pub band_count: usize,
    pub encut: f64,
    pub lattice: [[f64; 3]; 3],
    pub kvectors: Vec<[f64; 3]>,
    /// Overrides the derived record length when set.
    pub record_length: Option<usize>,
    pub tag: Option<f64>,
}

impl SyntheticWavecar {
    /// Three bands at Gamma in a 6 Angstrom cube, 20 eV cutoff.
    pub fn cubic(layout: WavecarLayout) -> Self {
        Self {
            layout,
            spin_count: 1,
            precision: Precision::Double,
            band_count: 3,
            encut: 20.0,
            lattice: CUBIC,
            kvectors: vec![[0.0; 3]],
            record_length: None,
            tag: None,
        }
    }

    /// Cutoff low enough that only `G = 0` survives on a 3x3x3 grid.
    pub fn origin_only() -> Self {
        Self {
            precision: Precision::Single,
            band_count: 1,
            encut: 1.0,
            ..Self::cubic(WavecarLayout::Standard)
        }
    }

    pub fn energy(&self, state: StateIndex) -> f64 {
        -4.0 + 2.0 * state.band as f64 + 0.5 * state.kpoint as f64 + 0.05 * state.spin as f64
    }

    pub fn occupation(&self, state: StateIndex) -> f64 {
        if state.band == 1 { 1.0 } else { 0.0 }
    }

    /// Coefficients as the reader returns them, rounded through `f32` for
    /// single precision.
    pub fn coefficients(&self, state: StateIndex, count: usize) -> Vec<Complex64> {
        let phase =
            0.45 * state.band as f64 + 0.35 * state.kpoint as f64 + 0.15 * state.spin as f64;
        (0..count)
            .map(|index| {
                let n = index as f64;
                let value = if index == 0 {
                    Complex64::new(1.0 + phase, 0.0)
                } else {
                    Complex64::new((phase * n).cos(), (phase + 0.5 * n).sin()) / (1.0 + n)
                };
                match self.precision {
                    Precision::Single => {
                        Complex64::new(f64::from(value.re as f32), f64::from(value.im as f32))
                    }
                    Precision::Double => value,
                }
            })
            .collect()
    }

    fn header(&self, record_length: usize) -> WavecarHeader {
        WavecarHeader::new(
            record_length as u64,
            self.spin_count,
            self.precision,
            self.kvectors.len(),
            self.band_count,
            self.encut,
            self.lattice,
        )
        .expect("synthetic header should be valid")
    }

    /// Stored coefficient count per k-point.
    pub fn plane_wave_counts(&self) -> Vec<usize> {
        let generator = GVectorGenerator::for_header(&self.header(128));
        self.kvectors
            .iter()
            .map(|kvector| {
                generator.generate(*kvector, self.layout.reduction()).len()
                    * self.layout.spinor_components()
            })
            .collect()
    }

    pub fn derived_record_length(&self) -> usize {
        let largest = self.plane_wave_counts().into_iter().max().unwrap_or(0);
        ((4 + 3 * self.band_count) * 8)
            .max(largest * self.precision.complex_bytes())
            .max(12 * 8)
    }

    pub fn build(&self) -> Vec<u8> {
        let record_length = self
            .record_length
            .unwrap_or_else(|| self.derived_record_length());
        let header = self.header(record_length);
        let counts = self.plane_wave_counts();
        let records = 2 + self.spin_count * self.kvectors.len() * (self.band_count + 1);
        let mut bytes = vec![0_u8; records * record_length];

        let tag = self.tag.unwrap_or(self.precision.tag() as f64);
        put_f64(&mut bytes, 0, &[record_length as f64, self.spin_count as f64, tag]);
        let mut record2 = vec![self.kvectors.len() as f64, self.band_count as f64, self.encut];
        record2.extend(self.lattice.iter().flatten());
        put_f64(&mut bytes, record_length, &record2);

        for spin in 1..=self.spin_count {
            for (kindex, kvector) in self.kvectors.iter().enumerate() {
                let kpoint = kindex + 1;
                let table = record_index(&header, StateIndex::new(spin, kpoint, 1)) - 1;
                let mut values = vec![counts[kindex] as f64, kvector[0], kvector[1], kvector[2]];
                for band in 1..=self.band_count {
                    let state = StateIndex::new(spin, kpoint, band);
                    values.extend([self.energy(state), 0.0, self.occupation(state)]);
                }
                put_f64(&mut bytes, table as usize * record_length, &values);

                for band in 1..=self.band_count {
                    let state = StateIndex::new(spin, kpoint, band);
                    let offset = record_index(&header, state) as usize * record_length;
                    let flat: Vec<f64> = self
                        .coefficients(state, counts[kindex])
                        .iter()
                        .flat_map(|value| [value.re, value.im])
                        .collect();
                    match self.precision {
                        Precision::Single => {
                            let encoded: Vec<u8> = flat
                                .iter()
                                .flat_map(|value| (*value as f32).to_le_bytes())
                                .collect();
                            put_bytes(&mut bytes, offset, &encoded);
                        }
                        Precision::Double => put_f64(&mut bytes, offset, &flat),
                    }
                }
            }
        }
        bytes
    }

    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("WAVECAR");
        fs::write(&path, self.build()).expect("WAVECAR fixture should be written");
        path
    }
}

pub fn put_f64(bytes: &mut Vec<u8>, offset: usize, values: &[f64]) {
    let encoded: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
    put_bytes(bytes, offset, &encoded);
}

/// Undersized record lengths let blocks run past the nominal end of file.
fn put_bytes(bytes: &mut Vec<u8>, offset: usize, encoded: &[u8]) {
    if bytes.len() < offset + encoded.len() {
        bytes.resize(offset + encoded.len(), 0);
    }
    bytes[offset..offset + encoded.len()].copy_from_slice(encoded);
}
