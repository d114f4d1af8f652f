use num_complex::Complex64;
use std::fs;
use tempfile::TempDir;
use wavecar_core::test_support::{put_f64, SyntheticWavecar};
use wavecar_core::{
    GammaReduction, IndexKind, Precision, RealSpaceWavefunction, ReconstructionRequest,
    StateIndex, Wavecar, WavecarError, WavecarLayout,
};

const LAYOUTS: [WavecarLayout; 4] = [
    WavecarLayout::Standard,
    WavecarLayout::GammaHalfZ,
    WavecarLayout::GammaHalfX,
    WavecarLayout::SpinOrbit,
];

fn open(temp: &TempDir, fixture: &SyntheticWavecar) -> Wavecar {
    Wavecar::open(fixture.write_to(temp.path()), fixture.layout)
        .expect("fixture WAVECAR should open")
}

#[test]
fn origin_only_container_reconstructs_a_uniform_field() {
    let temp = TempDir::new().expect("tempdir should be created");
    let fixture = SyntheticWavecar::origin_only();
    let wavecar = open(&temp, &fixture);

    assert_eq!(wavecar.header().precision(), Precision::Single);
    assert_eq!(wavecar.header().minimum_grid(), [3, 3, 3]);
    assert_eq!(wavecar.gvectors(1).expect("gvectors"), vec![[0, 0, 0]]);
    assert_eq!(wavecar.bands().plane_wave_count(1), 1);
    assert_eq!(wavecar.bands().kpath(), None);

    let state = StateIndex::new(1, 1, 1);
    let request =
        ReconstructionRequest::new(state).with_coefficients(vec![Complex64::new(1.0, 0.0)]);
    let RealSpaceWavefunction::Complex(field) = wavecar.reconstruct(&request).expect("field")
    else {
        panic!("standard layout should yield a complex field");
    };

    let expected = 1.0 / 27.0_f64.sqrt();
    assert_eq!(field.dim(), (3, 3, 3));
    for value in field.iter() {
        assert!((value.re - expected).abs() <= 1.0e-12, "{value}");
        assert!(value.im.abs() <= 1.0e-12, "{value}");
    }
}

#[test]
fn header_and_band_table_round_trip_through_a_file() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut fixture = SyntheticWavecar::cubic(WavecarLayout::Standard);
    fixture.spin_count = 2;
    fixture.kvectors = vec![[0.0, 0.0, 0.0], [0.25, 0.0, 0.0], [0.25, 0.25, 0.0]];
    let wavecar = open(&temp, &fixture);

    let header = wavecar.header();
    assert_eq!(header.spin_count(), 2);
    assert_eq!(header.kpoint_count(), 3);
    assert_eq!(header.band_count(), 3);
    assert_eq!(header.encut(), 20.0);
    assert!((header.volume() - 216.0).abs() <= 1.0e-9);
    assert_eq!(
        header.record_length(),
        fixture.derived_record_length() as u64
    );

    let bands = wavecar.bands();
    assert_eq!(bands.kvector(2), [0.25, 0.0, 0.0]);
    for state in wavecar.states() {
        assert_eq!(bands.energy(state), fixture.energy(state), "{state}");
        assert_eq!(bands.occupation(state), fixture.occupation(state), "{state}");
    }
    let kpath = bands.kpath().expect("multiple k-points define a path");
    assert_eq!(kpath[0], 0.0);
    assert!((kpath[1] - 0.25 / 6.0).abs() <= 1.0e-12);
    assert!((kpath[2] - 0.5 / 6.0).abs() <= 1.0e-12);
}

#[test]
fn stored_coefficients_match_the_written_values() {
    let temp = TempDir::new().expect("tempdir should be created");
    for precision in [Precision::Single, Precision::Double] {
        let mut fixture = SyntheticWavecar::cubic(WavecarLayout::Standard);
        fixture.precision = precision;
        let wavecar = open(&temp, &fixture);

        let state = StateIndex::new(1, 1, 2);
        let raw = wavecar.read_coefficients(state, false).expect("raw coefficients");
        assert_eq!(raw, fixture.coefficients(state, 33));

        let normalized = wavecar.read_coefficients(state, true).expect("normalized");
        let norm: f64 = normalized.iter().map(|value| value.norm_sqr()).sum();
        assert!((norm - 1.0).abs() <= 1.0e-12, "{precision:?}: {norm}");
    }
}

#[test]
fn normalized_states_reconstruct_to_unit_weight_for_every_layout() {
    let temp = TempDir::new().expect("tempdir should be created");
    for layout in LAYOUTS {
        let wavecar = open(&temp, &SyntheticWavecar::cubic(layout));
        for grid in [[7, 7, 7], [8, 9, 10]] {
            for band in 1..=3 {
                let request =
                    ReconstructionRequest::new(StateIndex::new(1, 1, band)).with_grid(grid);
                let field = wavecar.reconstruct(&request).expect("reconstruction");
                assert_eq!(field.shape(), grid);
                let weight = field.total_weight();
                assert!(
                    (weight - 1.0).abs() <= 1.0e-10,
                    "{layout} grid {grid:?} band {band}: {weight}"
                );
            }
        }
    }
}

#[test]
fn layouts_select_the_matching_field_kind() {
    let temp = TempDir::new().expect("tempdir should be created");
    let state = StateIndex::new(1, 1, 1);
    for layout in LAYOUTS {
        let wavecar = open(&temp, &SyntheticWavecar::cubic(layout));
        let field = wavecar
            .reconstruct(&ReconstructionRequest::new(state))
            .expect("reconstruction");
        match (layout, field) {
            (WavecarLayout::Standard, RealSpaceWavefunction::Complex(_))
            | (WavecarLayout::GammaHalfZ, RealSpaceWavefunction::Real(_))
            | (WavecarLayout::GammaHalfX, RealSpaceWavefunction::Real(_))
            | (WavecarLayout::SpinOrbit, RealSpaceWavefunction::Spinor(_)) => {}
            (layout, field) => panic!("{layout} produced {:?}", field.shape()),
        }
    }
}

#[test]
fn explicit_overrides_are_observationally_equivalent() {
    let temp = TempDir::new().expect("tempdir should be created");
    for layout in LAYOUTS {
        let wavecar = open(&temp, &SyntheticWavecar::cubic(layout));
        let state = StateIndex::new(1, 1, 3);
        let implicit = wavecar
            .reconstruct(&ReconstructionRequest::new(state).with_grid([9, 8, 7]))
            .expect("implicit");

        let explicit = wavecar
            .reconstruct(
                &ReconstructionRequest::new(state)
                    .with_grid([9, 8, 7])
                    .with_gvectors(wavecar.gvectors(1).expect("gvectors"))
                    .with_coefficients(wavecar.read_coefficients(state, true).expect("read")),
            )
            .expect("explicit");

        assert_eq!(implicit, explicit, "{layout}");
    }
}

#[test]
fn grid_at_the_minimum_succeeds_and_one_below_fails() {
    let temp = TempDir::new().expect("tempdir should be created");
    let wavecar = open(&temp, &SyntheticWavecar::cubic(WavecarLayout::Standard));
    let state = StateIndex::new(1, 1, 1);
    assert_eq!(wavecar.header().minimum_grid(), [7, 7, 7]);

    wavecar
        .reconstruct(&ReconstructionRequest::new(state).with_grid([7, 7, 7]))
        .expect("minimum grid is accepted");

    for grid in [[6, 7, 7], [7, 6, 7], [7, 7, 6]] {
        let error = wavecar
            .reconstruct(&ReconstructionRequest::new(state).with_grid(grid))
            .expect_err("grid below minimum");
        assert!(
            matches!(
                error,
                WavecarError::InvalidGridSize { requested, minimum }
                    if requested == grid && minimum == [7, 7, 7]
            ),
            "{error}"
        );
    }
}

#[test]
fn explicit_scale_multiplies_the_field() {
    let temp = TempDir::new().expect("tempdir should be created");
    let wavecar = open(&temp, &SyntheticWavecar::origin_only());
    let state = StateIndex::new(1, 1, 1);
    let field = wavecar
        .reconstruct(&ReconstructionRequest::new(state).with_scale(27.0))
        .expect("scaled");
    assert!((field.total_weight() - 27.0).abs() <= 1.0e-9);
}

#[test]
fn coefficient_override_of_the_wrong_length_is_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let wavecar = open(&temp, &SyntheticWavecar::cubic(WavecarLayout::Standard));
    let request = ReconstructionRequest::new(StateIndex::new(1, 1, 1))
        .with_coefficients(vec![Complex64::new(1.0, 0.0); 5]);
    let error = wavecar.reconstruct(&request).expect_err("length mismatch");
    assert!(matches!(
        error,
        WavecarError::CoefficientCountMismatch {
            expected: 33,
            actual: 5
        }
    ));
}

#[test]
fn indices_are_checked_before_any_read() {
    let temp = TempDir::new().expect("tempdir should be created");
    let wavecar = open(&temp, &SyntheticWavecar::cubic(WavecarLayout::Standard));

    let cases = [
        (StateIndex::new(2, 1, 1), IndexKind::Spin, 2, 1),
        (StateIndex::new(1, 0, 1), IndexKind::KPoint, 0, 1),
        (StateIndex::new(1, 1, 4), IndexKind::Band, 4, 3),
    ];
    for (state, kind, value, max) in cases {
        let error = wavecar.read_coefficients(state, true).expect_err("bad index");
        assert!(
            matches!(
                error,
                WavecarError::IndexOutOfRange { index, value: v, max: m }
                    if index == kind && v == value && m == max
            ),
            "{state}: {error}"
        );
    }
    assert!(matches!(
        wavecar.gvectors(2),
        Err(WavecarError::IndexOutOfRange {
            index: IndexKind::KPoint,
            ..
        })
    ));
}

#[test]
fn reading_a_gamma_file_as_standard_reports_the_count_mismatch() {
    let temp = TempDir::new().expect("tempdir should be created");
    let path = SyntheticWavecar::cubic(WavecarLayout::GammaHalfZ).write_to(temp.path());
    let wavecar = Wavecar::open(&path, WavecarLayout::Standard).expect("header is layout-agnostic");

    let error = wavecar.gvectors(1).expect_err("count mismatch");
    assert!(matches!(
        error,
        WavecarError::PlaneWaveCountMismatch {
            kpoint: 1,
            generated: 33,
            stored: 17
        }
    ));
    assert_eq!(error.exit_code(), 4);

    let unchecked = wavecar
        .gvectors_with(1, GammaReduction::HalfZ, false)
        .expect("forced reduction");
    assert_eq!(unchecked.len(), 17);
}

#[test]
fn newer_and_unknown_precision_tags_are_unsupported() {
    let temp = TempDir::new().expect("tempdir should be created");
    for tag in [53300.0, 53310.0, 12345.0] {
        let mut fixture = SyntheticWavecar::cubic(WavecarLayout::Standard);
        fixture.tag = Some(tag);
        let path = fixture.write_to(temp.path());
        let error = Wavecar::open(&path, fixture.layout).expect_err("unsupported tag");
        assert!(
            matches!(error, WavecarError::UnsupportedFormat { tag: t, .. } if t == tag as i64),
            "{error}"
        );
        assert_eq!(error.exit_code(), 2);
    }
}

#[test]
fn spin_orbit_layout_needs_a_single_spin_channel() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut fixture = SyntheticWavecar::cubic(WavecarLayout::Standard);
    fixture.spin_count = 2;
    let path = fixture.write_to(temp.path());
    let error = Wavecar::open(&path, WavecarLayout::SpinOrbit).expect_err("spin-orbit");
    assert!(matches!(error, WavecarError::MalformedHeader(_)));
}

#[test]
fn undersized_records_are_malformed() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut fixture = SyntheticWavecar::cubic(WavecarLayout::Standard);
    fixture.record_length = Some(128);
    let path = fixture.write_to(temp.path());
    let error = Wavecar::open(&path, fixture.layout).expect_err("33 plane waves need 528 bytes");
    assert!(matches!(error, WavecarError::MalformedHeader(_)), "{error}");
}

#[test]
fn header_counts_beyond_the_source_are_malformed() {
    let fixture = SyntheticWavecar::cubic(WavecarLayout::Standard);
    let record_length = fixture.derived_record_length();

    // Record 2 starts with the k-point and band counts.
    let mut bytes = fixture.build();
    put_f64(&mut bytes, record_length + 8, &[1.0e18]);
    let error = Wavecar::from_source(bytes, fixture.layout).expect_err("1e18 bands");
    assert!(matches!(error, WavecarError::MalformedHeader(_)), "{error}");

    let mut bytes = fixture.build();
    put_f64(&mut bytes, record_length, &[1.0e15]);
    let error = Wavecar::from_source(bytes, fixture.layout).expect_err("1e15 k-points");
    assert!(matches!(error, WavecarError::MalformedHeader(_)), "{error}");
    assert_eq!(error.exit_code(), 2);

    let mut bytes = fixture.build();
    put_f64(&mut bytes, record_length + 8, &[5.0]);
    let error = Wavecar::from_source(bytes, fixture.layout).expect_err("two missing bands");
    assert!(error.to_string().contains("records"), "{error}");
}

#[test]
fn truncated_and_missing_files_are_stream_errors() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = Wavecar::open(temp.path().join("absent"), WavecarLayout::Standard)
        .expect_err("missing file");
    assert!(matches!(missing, WavecarError::StreamError { .. }));
    assert_eq!(missing.exit_code(), 3);

    let fixture = SyntheticWavecar::cubic(WavecarLayout::Standard);
    let record_length = fixture.derived_record_length();
    let mut bytes = fixture.build();
    bytes.truncate(5 * record_length + 10);
    let path = temp.path().join("WAVECAR.truncated");
    fs::write(&path, bytes).expect("truncated WAVECAR should be written");

    let wavecar = Wavecar::open(&path, fixture.layout).expect("band tables are intact");
    wavecar
        .read_coefficients(StateIndex::new(1, 1, 2), false)
        .expect("band 2 is intact");
    let error = wavecar
        .read_coefficients(StateIndex::new(1, 1, 3), false)
        .expect_err("band 3 is cut short");
    assert!(matches!(error, WavecarError::StreamError { .. }), "{error}");
}

#[test]
fn summary_serializes_header_and_bands() {
    let temp = TempDir::new().expect("tempdir should be created");
    let wavecar = open(&temp, &SyntheticWavecar::cubic(WavecarLayout::GammaHalfX));
    let json = wavecar.summary().to_json().expect("summary json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(value["layout"], "gamma-half-x");
    assert_eq!(value["header"]["band_count"], 3);
    assert_eq!(value["header"]["precision"], "double");
    assert_eq!(value["kpoints"][0]["plane_waves"], 17);
    assert!(value["kpoints"][0]["kpath"].is_null());
    assert_eq!(
        value["kpoints"][0]["bands"]
            .as_array()
            .expect("bands array")
            .len(),
        3
    );
}
