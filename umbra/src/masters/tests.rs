use std::collections::BTreeMap;

use super::*;
use crate::Error;
use crate::frame::{FlatFrame, FlatIdentity, Frame, FrameHeader, ImageType, Plane, keys};
use crate::testing::{constant_frame, ms};

fn dark_library(darks: &[(u32, f64)]) -> DarkLibrary {
    let mut raw = BTreeMap::new();
    for &(exposure, value) in darks {
        raw.insert(ms(exposure), vec![constant_frame(4, 3, value)]);
    }
    build_master_darks(&raw).unwrap()
}

fn flat(filter: &str, exposure: u32, seq: &str, frame: Frame) -> FlatFrame {
    FlatFrame {
        identity: FlatIdentity {
            filter: filter.into(),
            exposure: ms(exposure),
        },
        name: format!("{filter}_{exposure}_{seq}"),
        frame,
    }
}

// ============================================================================
// Master darks
// ============================================================================

#[test]
fn test_master_dark_is_elementwise_median() {
    let frames = vec![
        Frame::from_plane(Plane::new(3, 1, vec![1.0, 9.0, 4.0])),
        Frame::from_plane(Plane::new(3, 1, vec![2.0, 7.0, 4.0])),
        Frame::from_plane(Plane::new(3, 1, vec![3.0, 8.0, 100.0])),
    ];
    let master = build_master_dark(ms(100), &frames).unwrap();
    assert_eq!(master.frame.plane.pixels(), &[2.0, 8.0, 4.0]);
    assert!(!master.interpolated);
}

#[test]
fn test_master_dark_of_two_frames_is_average() {
    let frames = vec![constant_frame(4, 4, 10.0), constant_frame(4, 4, 13.0)];
    let master = build_master_dark(ms(100), &frames).unwrap();
    assert!(master.frame.plane.iter().all(|&v| v == 11.5));
}

#[test]
fn test_master_dark_header_overrides() {
    let mut header = FrameHeader::new();
    header.set(keys::FILTER, "V");
    header.set(keys::OBJECT, "something");
    header.set("CCD-TEMP", -20.0);
    let frames = vec![
        Frame::new(Plane::zeros(2, 2), header.clone()),
        Frame::new(Plane::zeros(2, 2), header),
    ];

    let master = build_master_dark(ms(2500), &frames).unwrap();
    let header = &master.frame.header;
    assert_eq!(header.get_text(keys::FILTER), Some(""));
    assert_eq!(header.image_type(), Some(ImageType::Dark));
    assert_eq!(header.get_f64(keys::EXPTIME), Some(2.5));
    assert_eq!(header.get_f64(keys::EXPOSURE), Some(2.5));
    assert_eq!(header.get_text(keys::OBJECT), Some("DARK"));
    assert_eq!(header.get(keys::NCOMBINE).and_then(|v| v.as_i64()), Some(2));
    assert_eq!(header.get_f64("CCD-TEMP"), Some(-20.0));
}

#[test]
fn test_master_dark_empty_frames_is_none() {
    assert!(build_master_dark(ms(100), &[]).is_none());
}

#[test]
fn test_build_master_darks_without_data_is_missing_data() {
    let empty: BTreeMap<_, Vec<Frame>> = BTreeMap::new();
    assert!(matches!(
        build_master_darks(&empty),
        Err(Error::MissingData)
    ));

    let mut only_empty_lists = BTreeMap::new();
    only_empty_lists.insert(ms(100), Vec::new());
    assert!(matches!(
        build_master_darks(&only_empty_lists),
        Err(Error::MissingData)
    ));
}

#[test]
fn test_build_master_darks_one_per_exposure() {
    let library = dark_library(&[(100, 10.0), (500, 50.0)]);
    assert_eq!(library.len(), 2);
    assert_eq!(library.get(ms(100)).unwrap().frame.plane[0], 10.0);
    assert_eq!(library.get(ms(500)).unwrap().frame.plane[0], 50.0);
    assert_eq!(library.available().count(), 2);
}

// ============================================================================
// Dark interpolation
// ============================================================================

#[test]
fn test_single_exposure_model_is_bias_only() {
    let mut raw = BTreeMap::new();
    let plane = Plane::new(3, 1, vec![3.0, -1.5, 42.0]);
    raw.insert(ms(300), vec![Frame::from_plane(plane.clone())]);
    let mut library = build_master_darks(&raw).unwrap();

    let synthesized = interpolate_missing(&mut library, [ms(10), ms(300), ms(9000)]).unwrap();
    assert_eq!(synthesized, vec![ms(10), ms(9000)]);

    for exposure in [ms(10), ms(9000)] {
        let dark = library.get(exposure).unwrap();
        assert!(dark.interpolated);
        assert_eq!(dark.frame.plane, plane);
    }
}

#[test]
fn test_two_point_interpolation_is_exact() {
    let k = 0.37;
    let mut library = dark_library(&[(100, 100.0 * k), (1000, 1000.0 * k)]);

    interpolate_missing(&mut library, [ms(500)]).unwrap();

    let dark = library.get(ms(500)).unwrap();
    assert!(dark.interpolated);
    for &v in dark.frame.plane.iter() {
        assert!((v - 500.0 * k).abs() < 1e-9, "expected {}, got {v}", 500.0 * k);
    }
}

#[test]
fn test_least_squares_fit_over_three_exposures() {
    // Noisy points around d = 2e + 5: residuals +1, -2, +1 (sum zero, orthogonal to e)
    let library = dark_library(&[(1, 8.0), (2, 7.0), (3, 12.0)]);
    let model = DarkModel::fit(&library).unwrap();

    for (&a, &b) in model.slope.iter().zip(model.intercept.iter()) {
        assert!((a - 2.0).abs() < 1e-9, "slope {a}");
        assert!((b - 5.0).abs() < 1e-9, "intercept {b}");
    }
}

#[test]
fn test_model_is_per_pixel() {
    let mut raw = BTreeMap::new();
    raw.insert(
        ms(100),
        vec![Frame::from_plane(Plane::new(2, 1, vec![1.0, 10.0]))],
    );
    raw.insert(
        ms(200),
        vec![Frame::from_plane(Plane::new(2, 1, vec![2.0, 10.0]))],
    );
    let library = build_master_darks(&raw).unwrap();
    let model = DarkModel::fit(&library).unwrap();

    let dark = model.evaluate(ms(400));
    assert!((dark[0] - 4.0).abs() < 1e-12);
    assert!((dark[1] - 10.0).abs() < 1e-12);
}

#[test]
fn test_fit_ignores_interpolated_darks() {
    let mut library = dark_library(&[(100, 10.0)]);
    interpolate_missing(&mut library, [ms(1000)]).unwrap();

    // Synthetic darks never feed back into the model.
    library.insert(MasterDark {
        exposure: ms(1000),
        frame: constant_frame(4, 3, 999.0),
        interpolated: true,
    });
    let model = DarkModel::fit(&library).unwrap();
    assert!(model.slope.iter().all(|&a| a == 0.0));
    assert!(model.intercept.iter().all(|&b| b == 10.0));
}

#[test]
fn test_interpolated_header() {
    let mut library = dark_library(&[(100, 10.0), (200, 20.0)]);
    interpolate_missing(&mut library, [ms(1500)]).unwrap();

    let header = &library.get(ms(1500)).unwrap().frame.header;
    assert_eq!(header.image_type(), Some(ImageType::InterpolatedDark));
    assert_eq!(header.get_text(keys::IMAGETYP), Some("Interpolated dark"));
    assert_eq!(header.get_f64(keys::EXPTIME), Some(1.5));
    assert_eq!(header.get_f64(keys::EXPOSURE), Some(1.5));
    assert!(!header.contains(keys::NCOMBINE));
}

#[test]
fn test_interpolation_without_available_darks_is_missing_data() {
    let mut library = DarkLibrary::new();
    let err = interpolate_missing(&mut library, [ms(100)]).unwrap_err();
    assert!(matches!(err, Error::MissingData));
    assert!(library.is_empty());

    assert!(matches!(
        DarkModel::fit(&DarkLibrary::new()),
        Err(Error::MissingData)
    ));
}

#[test]
fn test_nothing_missing_synthesizes_nothing() {
    let mut library = dark_library(&[(100, 10.0)]);
    let synthesized = interpolate_missing(&mut library, [ms(100), ms(100)]).unwrap();
    assert!(synthesized.is_empty());
    assert_eq!(library.len(), 1);
}

#[test]
fn test_missing_is_sorted_and_deduplicated() {
    let library = dark_library(&[(100, 10.0)]);
    assert_eq!(
        library.missing([ms(900), ms(100), ms(300), ms(900)]),
        vec![ms(300), ms(900)]
    );
}

// ============================================================================
// Master transmission
// ============================================================================

#[test]
fn test_normalize_flat_is_column_wise() {
    let dark = MasterDark {
        exposure: ms(100),
        frame: Frame::from_plane(Plane::filled(2, 2, 1.0)),
        interpolated: false,
    };

    // Columns after dark subtraction: col 0 = [1, 3] (mean 2), col 1 = [5, 15] (mean 10)
    let flat = Frame::from_plane(Plane::new(2, 2, vec![2.0, 6.0, 4.0, 16.0]));
    let normalized = normalize_flat(&flat, &dark);

    assert_eq!(normalized.pixels(), &[0.5, 0.5, 1.5, 1.5]);
    // A whole-frame scalar mean (6) would have given [1/6, 5/6, 3/6, 15/6].
}

#[test]
fn test_master_transmission_median_of_normalized_flats() {
    let darks = dark_library(&[(100, 10.0), (200, 20.0)]);
    let flats = vec![
        flat("V", 100, "1", constant_frame(4, 3, 210.0)),
        flat("V", 200, "2", constant_frame(4, 3, 420.0)),
    ];

    let transmission = build_master_transmission(&"V".into(), &flats, &darks).unwrap();
    assert!(transmission.frame.plane.iter().all(|&v| (v - 1.0).abs() < 1e-12));
}

#[test]
fn test_master_transmission_header() {
    let darks = dark_library(&[(100, 10.0)]);
    let flats = vec![flat("R", 100, "1", constant_frame(4, 3, 110.0))];

    let transmission = build_master_transmission(&"R".into(), &flats, &darks).unwrap();
    let header = &transmission.frame.header;
    assert_eq!(header.get_text(keys::FILTER), Some("R"));
    assert_eq!(header.image_type(), Some(ImageType::LightFrame));
    assert_eq!(header.get_f64(keys::EXPTIME), Some(-1.0));
    assert_eq!(header.get_f64(keys::EXPOSURE), Some(-1.0));
    assert_eq!(header.get_text(keys::OBJECT), Some("FLAT"));
}

#[test]
fn test_master_transmission_uses_interpolated_dark() {
    let mut darks = dark_library(&[(100, 10.0)]);
    interpolate_missing(&mut darks, [ms(700)]).unwrap();
    let flats = vec![flat("V", 700, "1", constant_frame(4, 3, 60.0))];

    let transmission = build_master_transmission(&"V".into(), &flats, &darks).unwrap();
    assert!(transmission.frame.plane.iter().all(|&v| v == 1.0));
}

#[test]
fn test_master_transmission_without_dark_is_coverage_error() {
    let darks = dark_library(&[(100, 10.0)]);
    let flats = vec![flat("V", 300, "1", constant_frame(4, 3, 60.0))];

    let err = build_master_transmission(&"V".into(), &flats, &darks).unwrap_err();
    assert!(matches!(err, Error::Coverage { .. }), "got {err}");
    assert!(err.to_string().contains("V_300_1"));
}

#[test]
fn test_master_transmission_without_flats_is_coverage_error() {
    let darks = dark_library(&[(100, 10.0)]);
    let err = build_master_transmission(&"B".into(), &[], &darks).unwrap_err();
    assert!(matches!(err, Error::Coverage { .. }));
}

#[test]
fn test_build_master_transmissions_one_per_filter() {
    let darks = dark_library(&[(100, 10.0)]);
    let mut flats = BTreeMap::new();
    flats.insert(
        "V".into(),
        vec![flat("V", 100, "1", constant_frame(4, 3, 110.0))],
    );
    flats.insert(
        "B".into(),
        vec![
            flat("B", 100, "1", constant_frame(4, 3, 50.0)),
            flat("B", 100, "2", constant_frame(4, 3, 70.0)),
        ],
    );

    let library = build_master_transmissions(&flats, &darks).unwrap();
    assert_eq!(library.len(), 2);
    assert!(library.get(&"V".into()).is_some());
    let b = library.get(&"B".into()).unwrap();
    assert_eq!(b.frame.header.get(keys::NCOMBINE).and_then(|v| v.as_i64()), Some(2));
}
