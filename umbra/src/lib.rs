//! Umbra - CCD calibration and reduction pipeline.
//!
//! Turns raw dark, flat and object exposures into science-ready stacked frames:
//! - Master dark synthesis (per-pixel median per exposure time)
//! - Interpolation of missing master darks via a per-pixel linear model
//! - Flat normalization and master transmission maps per filter
//! - Object calibration, tag grouping and per-tag stacking
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use umbra::{DirStore, MedianStacker, Pipeline, ReductionConfig};
//!
//! let config = ReductionConfig::from_file("reduction.yaml")?;
//! let store = DirStore::new("work");
//! let stacker = MedianStacker;
//!
//! let report = Pipeline::new(&store, &stacker).run_config(&config)?;
//! println!("Produced {} reduced frames", report.reduced.len());
//! ```

mod calibrate;
mod error;
mod frame;
mod grouping;
mod masters;
mod math;
mod pipeline;
mod stacking;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude;

// ============================================================================
// Core frame types
// ============================================================================

pub use error::{Error, Result};
pub use frame::{
    DarkIdentity, ExposureTime, FilterName, FlatFrame, FlatIdentity, Frame, FrameDimensions,
    FrameHeader, FrameIdentity, FrameKind, HeaderCard, HeaderValue, ImageType, ObjectFrame,
    ObjectName, Plane, Tag, keys, parse_dark_name, parse_flat_name, parse_object_name,
};

// ============================================================================
// Storage
// ============================================================================

#[cfg(feature = "fits")]
pub use store::FitsStore;
pub use store::{DirStore, FrameKey, FrameStore, MemoryStore};

// ============================================================================
// Calibration masters
// ============================================================================

pub use masters::{
    DarkLibrary, DarkModel, MasterDark, MasterTransmission, TransmissionLibrary,
    build_master_dark, build_master_darks, build_master_transmission, build_master_transmissions,
    interpolate_missing, normalize_flat,
};

// ============================================================================
// Object calibration and grouping
// ============================================================================

pub use calibrate::{AuxFrame, calibrate_frame, calibrate_object};
pub use grouping::group_frames;

// ============================================================================
// Stacking
// ============================================================================

pub use stacking::{MedianStacker, ReducedFrame, Stacker};

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{
    Inventory, Pipeline, PipelineProgress, PipelineStage, ProgressCallback, ReductionConfig,
    ReductionReport,
};
