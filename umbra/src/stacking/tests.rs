use super::*;
use crate::testing::{constant_frame, identity};

fn aux(seq: &str, value: f64) -> AuxFrame {
    AuxFrame {
        identity: identity("M1", "V", 100),
        seq: seq.to_string(),
        frame: constant_frame(3, 2, value),
    }
}

fn tag() -> Tag {
    identity("M1", "V", 100).tag()
}

#[test]
fn test_median_stacker_odd_count() {
    let frames = vec![aux("1", 1.0), aux("2", 100.0), aux("3", 3.0)];
    let plane = MedianStacker.stack(&tag(), &frames).unwrap();
    assert_eq!(plane, Plane::filled(3, 2, 3.0));
}

#[test]
fn test_median_stacker_even_count_averages_middle() {
    let frames = vec![aux("1", 1.0), aux("2", 2.0), aux("3", 4.0), aux("4", 8.0)];
    let plane = MedianStacker.stack(&tag(), &frames).unwrap();
    assert_eq!(plane, Plane::filled(3, 2, 3.0));
}

#[test]
fn test_median_stacker_single_frame_is_identity() {
    let mut frame = aux("1", 0.0);
    frame.frame.plane = Plane::new(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let plane = MedianStacker.stack(&tag(), std::slice::from_ref(&frame)).unwrap();
    assert_eq!(plane, frame.frame.plane);
}

#[test]
fn test_median_stacker_empty_is_error() {
    let err = MedianStacker.stack(&tag(), &[]).unwrap_err();
    assert!(matches!(err, Error::EmptyStack { ref tag } if tag == "M1_V_100"));
}

#[test]
fn test_median_stacker_rejects_mixed_shapes() {
    let mut odd = aux("2", 1.0);
    odd.frame = constant_frame(2, 3, 1.0);
    let err = MedianStacker.stack(&tag(), &[aux("1", 1.0), odd]).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { ref key, .. } if key == "tmp/aux_M1_V_100_2"));
}

#[test]
fn test_reduced_frame_key() {
    let reduced = ReducedFrame {
        tag: tag(),
        frame: constant_frame(1, 1, 0.0),
    };
    assert_eq!(reduced.key().to_string(), "reduced/M1_V_100");
}
