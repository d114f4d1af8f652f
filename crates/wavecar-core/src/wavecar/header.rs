use super::source::{read_f64_values, RecordSource};
use crate::common::constants::{AUTOA, RYTOEV, TPI};
use crate::domain::{WavecarError, WavecarResult};
use crate::numerics::{norm3, reciprocal_lattice};
use serde::Serialize;
use tracing::debug;

pub const TAG_SINGLE_PRECISION: i64 = 45200;
pub const TAG_DOUBLE_PRECISION: i64 = 45210;
pub const TAG_VASP5_SINGLE_PRECISION: i64 = 53300;
pub const TAG_VASP5_DOUBLE_PRECISION: i64 = 53310;

const RECORD1_VALUES: usize = 3;
const RECORD2_VALUES: usize = 12;

/// Stored width of the plane-wave coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    pub fn from_tag(tag: i64) -> WavecarResult<Self> {
        match tag {
            TAG_SINGLE_PRECISION => Ok(Self::Single),
            TAG_DOUBLE_PRECISION => Ok(Self::Double),
            TAG_VASP5_SINGLE_PRECISION => Err(WavecarError::UnsupportedFormat {
                tag,
                reason: "VASP5 WAVECAR revision is not implemented",
            }),
            TAG_VASP5_DOUBLE_PRECISION => Err(WavecarError::UnsupportedFormat {
                tag,
                reason: "VASP5 WAVECAR revision with double-precision coefficients is not implemented",
            }),
            _ => Err(WavecarError::UnsupportedFormat {
                tag,
                reason: "unrecognized precision tag",
            }),
        }
    }

    pub const fn tag(self) -> i64 {
        match self {
            Self::Single => TAG_SINGLE_PRECISION,
            Self::Double => TAG_DOUBLE_PRECISION,
        }
    }

    /// Bytes occupied by one complex coefficient.
    pub const fn complex_bytes(self) -> usize {
        match self {
            Self::Single => 8,
            Self::Double => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavecarHeader {
    record_length: u64,
    spin_count: usize,
    precision: Precision,
    kpoint_count: usize,
    band_count: usize,
    record_count: u64,
    encut: f64,
    lattice: [[f64; 3]; 3],
    reciprocal: [[f64; 3]; 3],
    volume: f64,
    minimum_grid: [usize; 3],
}

impl WavecarHeader {
    /// Validate raw header values and derive reciprocal lattice, volume and
    /// the minimum FFT grid.
    pub fn new(
        record_length: u64,
        spin_count: usize,
        precision: Precision,
        kpoint_count: usize,
        band_count: usize,
        encut: f64,
        lattice: [[f64; 3]; 3],
    ) -> WavecarResult<Self> {
        if record_length == 0 {
            return Err(WavecarError::malformed("record length must be positive"));
        }
        if !(1..=2).contains(&spin_count) {
            return Err(WavecarError::malformed(format!(
                "spin channel count must be 1 or 2, got {spin_count}"
            )));
        }
        if kpoint_count == 0 || band_count == 0 {
            return Err(WavecarError::malformed(format!(
                "k-point and band counts must be positive, got {kpoint_count} and {band_count}"
            )));
        }
        let record_count = declared_record_count(spin_count, kpoint_count, band_count)
            .filter(|records| records.checked_mul(record_length).is_some())
            .ok_or_else(|| {
                WavecarError::malformed(format!(
                    "{spin_count} spin channels, {kpoint_count} k-points and {band_count} bands \
                     overflow the addressable size with {record_length}-byte records"
                ))
            })?;
        if !encut.is_finite() || encut <= 0.0 {
            return Err(WavecarError::malformed(format!(
                "energy cutoff must be positive, got {encut}"
            )));
        }
        if lattice.iter().flatten().any(|value| !value.is_finite()) {
            return Err(WavecarError::malformed("lattice contains non-finite values"));
        }

        let (reciprocal, volume) = reciprocal_lattice(&lattice).map_err(|source| {
            WavecarError::malformed(format!("degenerate lattice (zero volume): {source}"))
        })?;
        let minimum_grid = minimum_fft_grid(encut, &lattice);

        Ok(Self {
            record_length,
            spin_count,
            precision,
            kpoint_count,
            band_count,
            record_count,
            encut,
            lattice,
            reciprocal,
            volume,
            minimum_grid,
        })
    }

    /// Parse the two leading records.
    pub fn read_from<S: RecordSource + ?Sized>(source: &S) -> WavecarResult<Self> {
        let record1 = read_f64_values(source, 0, RECORD1_VALUES)
            .map_err(|error| WavecarError::stream("failed to read WAVECAR record 1", error))?;
        let record_length = header_integer(record1[0], "record length")?;
        if record_length == 0 {
            return Err(WavecarError::malformed("record length must be positive"));
        }
        let spin_count = header_integer(record1[1], "spin channel count")?;
        let tag = record1[2] as i64;
        let precision = Precision::from_tag(tag)?;

        let record2 = read_f64_values(source, record_length, RECORD2_VALUES)
            .map_err(|error| WavecarError::stream("failed to read WAVECAR record 2", error))?;
        let kpoint_count = header_integer(record2[0], "k-point count")?;
        let band_count = header_integer(record2[1], "band count")?;
        let encut = record2[2];
        let mut lattice = [[0.0; 3]; 3];
        for (row, values) in lattice.iter_mut().enumerate() {
            values.copy_from_slice(&record2[3 + 3 * row..6 + 3 * row]);
        }

        let header = Self::new(
            record_length,
            usize::try_from(spin_count).unwrap_or(usize::MAX),
            precision,
            usize::try_from(kpoint_count).unwrap_or(usize::MAX),
            usize::try_from(band_count).unwrap_or(usize::MAX),
            encut,
            lattice,
        )?;
        debug!(
            record_length = header.record_length,
            spins = header.spin_count,
            kpoints = header.kpoint_count,
            bands = header.band_count,
            encut = header.encut,
            grid = ?header.minimum_grid,
            "parsed WAVECAR header"
        );
        Ok(header)
    }

    pub fn record_length(&self) -> u64 {
        self.record_length
    }

    pub fn spin_count(&self) -> usize {
        self.spin_count
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn kpoint_count(&self) -> usize {
        self.kpoint_count
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Records addressed by the header, the two leading ones included.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Bytes the container spans when every record is complete.
    pub fn declared_length(&self) -> u64 {
        self.record_count * self.record_length
    }

    pub fn encut(&self) -> f64 {
        self.encut
    }

    pub fn lattice(&self) -> &[[f64; 3]; 3] {
        &self.lattice
    }

    pub fn reciprocal_lattice(&self) -> &[[f64; 3]; 3] {
        &self.reciprocal
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn minimum_grid(&self) -> [usize; 3] {
        self.minimum_grid
    }

    /// Byte offset of a record counted from zero. `record` must be below
    /// [`Self::record_count`].
    pub fn record_offset(&self, record: u64) -> u64 {
        record * self.record_length
    }

    /// Reject grids smaller than the minimum on any axis.
    pub fn validate_grid(&self, grid: [usize; 3]) -> WavecarResult<()> {
        if grid
            .iter()
            .zip(self.minimum_grid.iter())
            .any(|(requested, minimum)| requested < minimum)
        {
            return Err(WavecarError::InvalidGridSize {
                requested: grid,
                minimum: self.minimum_grid,
            });
        }
        Ok(())
    }
}

/// `2 * ceil(sqrt(ENCUT / Ry) * |a_i| / (2 pi a0)) + 1` per axis.
pub fn minimum_fft_grid(encut: f64, lattice: &[[f64; 3]; 3]) -> [usize; 3] {
    lattice.map(|axis| {
        let bound = ((encut / RYTOEV).sqrt() / (TPI / (norm3(axis) / AUTOA))).ceil();
        2 * bound as usize + 1
    })
}

/// `2 + S * K * (B + 1)`, or `None` when it does not fit in a `u64`.
fn declared_record_count(spins: usize, kpoints: usize, bands: usize) -> Option<u64> {
    let stride = u64::try_from(bands).ok()?.checked_add(1)?;
    u64::try_from(kpoints)
        .ok()?
        .checked_mul(stride)?
        .checked_mul(u64::try_from(spins).ok()?)?
        .checked_add(2)
}

fn header_integer(value: f64, field: &str) -> WavecarResult<u64> {
    if !value.is_finite() || value < 0.0 {
        return Err(WavecarError::malformed(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(value as u64)
}
