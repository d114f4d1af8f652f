use super::header::{Precision, WavecarHeader};
use super::source::{read_f32_values, read_f64_values, RecordSource};
use crate::domain::{IndexKind, StateIndex, WavecarError, WavecarResult};
use crate::numerics::complex_norm;
use num_complex::Complex64;

/// Record number holding the coefficients of `state`:
/// `2 + (s-1) K (B+1) + (k-1) (B+1) + b`. Multiply by the record length for
/// the byte offset. Band index 1 minus one is the k-point's band table.
///
/// `state` must lie within the header's bounds; the result is then below
/// [`WavecarHeader::record_count`], which the header has already checked for
/// overflow.
pub fn record_index(header: &WavecarHeader, state: StateIndex) -> u64 {
    let kpoints = header.kpoint_count() as u64;
    let stride = header.band_count() as u64 + 1;
    2 + (state.spin as u64 - 1) * kpoints * stride
        + (state.kpoint as u64 - 1) * stride
        + state.band as u64
}

pub fn validate_state(header: &WavecarHeader, state: StateIndex) -> WavecarResult<()> {
    check_index(IndexKind::Spin, state.spin, header.spin_count())?;
    check_index(IndexKind::KPoint, state.kpoint, header.kpoint_count())?;
    check_index(IndexKind::Band, state.band, header.band_count())
}

pub fn check_index(index: IndexKind, value: usize, max: usize) -> WavecarResult<()> {
    if value == 0 || value > max {
        return Err(WavecarError::IndexOutOfRange { index, value, max });
    }
    Ok(())
}

/// Read `count` complex coefficients of `state`, widened to double precision.
pub fn read_coefficients<S: RecordSource + ?Sized>(
    source: &S,
    header: &WavecarHeader,
    state: StateIndex,
    count: usize,
    normalize: bool,
) -> WavecarResult<Vec<Complex64>> {
    validate_state(header, state)?;
    let offset = header.record_offset(record_index(header, state));
    let context = || format!("failed to read coefficients of {state}");

    let mut coefficients: Vec<Complex64> = match header.precision() {
        Precision::Single => read_f32_values(source, offset, 2 * count)
            .map_err(|error| WavecarError::stream(context(), error))?
            .chunks_exact(2)
            .map(|pair| Complex64::new(f64::from(pair[0]), f64::from(pair[1])))
            .collect(),
        Precision::Double => read_f64_values(source, offset, 2 * count)
            .map_err(|error| WavecarError::stream(context(), error))?
            .chunks_exact(2)
            .map(|pair| Complex64::new(pair[0], pair[1]))
            .collect(),
    };

    if normalize {
        normalize_coefficients(&mut coefficients);
    }
    Ok(coefficients)
}

/// Scale to unit Euclidean norm; an all-zero vector is left untouched.
pub fn normalize_coefficients(coefficients: &mut [Complex64]) {
    let norm = complex_norm(coefficients);
    if norm > 0.0 {
        for value in coefficients.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_coefficients, read_coefficients, record_index, validate_state};
    use crate::domain::{IndexKind, StateIndex, WavecarError};
    use crate::numerics::complex_norm;
    use crate::wavecar::header::{Precision, WavecarHeader};
    use num_complex::Complex64;

    const CUBIC: [[f64; 3]; 3] = [[6.0, 0.0, 0.0], [0.0, 6.0, 0.0], [0.0, 0.0, 6.0]];

    fn header(precision: Precision) -> WavecarHeader {
        WavecarHeader::new(64, 2, precision, 3, 4, 20.0, CUBIC).expect("header")
    }

    #[test]
    fn record_formula_skips_band_tables_between_kpoints() {
        let header = header(Precision::Single);
        assert_eq!(record_index(&header, StateIndex::new(1, 1, 1)), 3);
        assert_eq!(record_index(&header, StateIndex::new(1, 1, 4)), 6);
        assert_eq!(record_index(&header, StateIndex::new(1, 2, 1)), 8);
        assert_eq!(record_index(&header, StateIndex::new(2, 1, 1)), 18);
        assert_eq!(record_index(&header, StateIndex::new(2, 3, 4)), 31);
        assert_eq!(header.record_count(), 32);
    }

    #[test]
    fn index_validation_names_the_axis() {
        let header = header(Precision::Single);
        validate_state(&header, StateIndex::new(2, 3, 4)).expect("upper bounds are valid");

        let cases = [
            (StateIndex::new(0, 1, 1), IndexKind::Spin),
            (StateIndex::new(3, 1, 1), IndexKind::Spin),
            (StateIndex::new(1, 4, 1), IndexKind::KPoint),
            (StateIndex::new(1, 1, 0), IndexKind::Band),
            (StateIndex::new(1, 1, 5), IndexKind::Band),
        ];
        for (state, expected) in cases {
            match validate_state(&header, state) {
                Err(WavecarError::IndexOutOfRange { index, .. }) => assert_eq!(index, expected),
                other => panic!("expected index error for {state}, got {other:?}"),
            }
        }
    }

    #[test]
    fn single_precision_coefficients_widen_to_double() {
        let header = header(Precision::Single);
        let offset = (record_index(&header, StateIndex::new(1, 1, 2)) * 64) as usize;
        let mut bytes = vec![0_u8; offset];
        for value in [1.5_f32, -0.5, 0.25, 2.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let coefficients =
            read_coefficients(&bytes, &header, StateIndex::new(1, 1, 2), 2, false)
                .expect("coefficients");
        assert_eq!(
            coefficients,
            vec![Complex64::new(1.5, -0.5), Complex64::new(0.25, 2.0)]
        );
    }

    #[test]
    fn double_precision_coefficients_can_be_normalized() {
        let header = header(Precision::Double);
        let offset = (record_index(&header, StateIndex::new(2, 3, 4)) * 64) as usize;
        let mut bytes = vec![0_u8; offset];
        for value in [3.0_f64, 0.0, 0.0, 4.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let coefficients =
            read_coefficients(&bytes, &header, StateIndex::new(2, 3, 4), 2, true)
                .expect("coefficients");
        assert!((coefficients[0] - Complex64::new(0.6, 0.0)).norm() <= 1.0e-15);
        assert!((coefficients[1] - Complex64::new(0.0, 0.8)).norm() <= 1.0e-15);
    }

    #[test]
    fn invalid_indices_fail_before_any_read() {
        let header = header(Precision::Double);
        let empty: Vec<u8> = Vec::new();
        let error = read_coefficients(&empty, &header, StateIndex::new(1, 1, 9), 2, false)
            .expect_err("band out of range");
        assert!(matches!(
            error,
            WavecarError::IndexOutOfRange {
                index: IndexKind::Band,
                ..
            }
        ));
    }

    #[test]
    fn zero_vectors_survive_normalization() {
        let mut values = vec![Complex64::new(0.0, 0.0); 3];
        normalize_coefficients(&mut values);
        assert_eq!(complex_norm(&values), 0.0);
    }
}
