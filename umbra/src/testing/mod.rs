//! Testing utilities for umbra.

#![allow(dead_code)]

use crate::frame::{ExposureTime, FrameIdentity, Frame, FrameKind, Plane};
use crate::store::{FrameKey, FrameStore, MemoryStore};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Exposure time from milliseconds; panics on zero.
pub fn ms(millis: u32) -> ExposureTime {
    ExposureTime::from_millis(millis).expect("exposure must be positive")
}

/// Frame filled with a constant value and an empty header.
pub fn constant_frame(width: usize, height: usize, value: f64) -> Frame {
    Frame::from_plane(Plane::filled(width, height, value))
}

pub fn identity(object: &str, filter: &str, exposure: u32) -> FrameIdentity {
    FrameIdentity::new(object, filter, ms(exposure))
}

/// Store a raw working frame under `kind` with the given file name.
pub fn put_raw(store: &MemoryStore, kind: FrameKind, name: &str, frame: Frame) {
    store
        .write(
            &FrameKey::Raw {
                kind,
                name: name.to_string(),
            },
            &frame,
        )
        .expect("memory store write cannot fail");
}
