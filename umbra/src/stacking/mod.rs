//! Per-tag stacking of calibrated frames.
//!
//! The pipeline calls a [`Stacker`] exactly once per tag with all and only
//! that tag's aux frames. Registration, if any, happens inside the stacker.

#[cfg(test)]
mod tests;

use crate::calibrate::AuxFrame;
use crate::error::{Error, Result};
use crate::frame::{Frame, Plane, Tag};
use crate::math::median_combine;
use crate::store::FrameKey;

/// Aligns and combines the aux frames of one tag into a single plane.
///
/// Implementations must return a plane of the same shape as the inputs.
pub trait Stacker: Send + Sync {
    fn stack(&self, tag: &Tag, frames: &[AuxFrame]) -> Result<Plane>;
}

/// Per-pixel median of frames that are already registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedianStacker;

impl Stacker for MedianStacker {
    fn stack(&self, tag: &Tag, frames: &[AuxFrame]) -> Result<Plane> {
        let first = frames.first().ok_or_else(|| Error::EmptyStack {
            tag: tag.to_string(),
        })?;

        let expected = first.frame.dimensions();
        if let Some(odd) = frames.iter().find(|f| f.frame.dimensions() != expected) {
            return Err(Error::ShapeMismatch {
                key: odd.key().to_string(),
                expected,
                actual: odd.frame.dimensions(),
            });
        }

        let planes: Vec<&Plane> = frames.iter().map(|f| &f.frame.plane).collect();
        Ok(median_combine(&planes))
    }
}

/// Terminal artefact of a run: one stacked frame per tag.
#[derive(Debug, Clone)]
pub struct ReducedFrame {
    pub tag: Tag,
    pub frame: Frame,
}

impl ReducedFrame {
    pub fn key(&self) -> FrameKey {
        FrameKey::Reduced(self.tag.clone())
    }
}
