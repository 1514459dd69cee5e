//! Frames: pixel planes, ordered headers and typed identities.

mod header;
mod identity;
mod plane;


use std::fmt;

pub use header::{FrameHeader, HeaderCard, HeaderValue, ImageType, keys};
pub use identity::{
    DarkIdentity, ExposureTime, FilterName, FlatIdentity, FrameIdentity, FrameKind, ObjectName,
    Tag, parse_dark_name, parse_flat_name, parse_object_name,
};
pub use plane::Plane;

/// Pixel dimensions shared by every frame of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameDimensions {
    pub width: usize,
    pub height: usize,
}

impl FrameDimensions {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for FrameDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A 2D frame plus its header. Raw frames are never mutated after reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub plane: Plane,
    pub header: FrameHeader,
}

impl Frame {
    pub fn new(plane: Plane, header: FrameHeader) -> Self {
        Self { plane, header }
    }

    /// Frame with an empty header.
    pub fn from_plane(plane: Plane) -> Self {
        Self {
            plane,
            header: FrameHeader::new(),
        }
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.plane.dimensions()
    }
}

/// Raw flat frame with its parsed identity.
#[derive(Debug, Clone)]
pub struct FlatFrame {
    pub identity: FlatIdentity,
    /// Working file name the frame was read from.
    pub name: String,
    pub frame: Frame,
}

/// Raw object frame with its parsed identity.
#[derive(Debug, Clone)]
pub struct ObjectFrame {
    pub identity: FrameIdentity,
    /// Sequence suffix of the working file name, reused for the aux frame.
    pub seq: String,
    /// Working file name the frame was read from.
    pub name: String,
    pub frame: Frame,
}
