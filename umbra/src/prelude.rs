//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use umbra::prelude::*;
//! ```

// Frames and identities
pub use crate::{
    ExposureTime, FilterName, Frame, FrameHeader, FrameIdentity, ObjectName, Plane, Tag,
};

// Storage
pub use crate::{DirStore, FrameKey, FrameStore, MemoryStore};

// Pipeline - main API
pub use crate::{
    Error, MedianStacker, Pipeline, PipelineStage, ReductionConfig, ReductionReport, Result,
    Stacker,
};
