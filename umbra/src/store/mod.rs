//! Frame storage: the working area read and written by every stage.
//!
//! The pipeline never touches paths directly. Every frame is addressed by a
//! [`FrameKey`] that maps onto the working-area layout:
//!
//! ```text
//! dark/{prefix}_{exposure}_{seq}           raw darks
//! flat/{filter}_{exposure}_{seq}           raw flats
//! obj/{object}_{filter}_{exposure}_{seq}   raw object frames
//! tmp/mdark_{exposure}                     master darks
//! tmp/mtrans_{filter}                      master transmissions
//! tmp/aux_{object}_{filter}_{exposure}_{seq}
//! reduced/{object}_{filter}_{exposure}     reduced frames
//! ```

mod dir;
#[cfg(feature = "fits")]
mod fits;
mod memory;


use std::fmt;
use std::path::PathBuf;

pub use dir::DirStore;
#[cfg(feature = "fits")]
pub use fits::FitsStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::frame::{ExposureTime, FilterName, Frame, FrameIdentity, FrameKind, Tag};

/// Directory for intermediate artefacts.
pub const TMP_DIR: &str = "tmp";
/// Directory for reduced output frames.
pub const REDUCED_DIR: &str = "reduced";

/// Address of a frame in the working area.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameKey {
    /// Raw working frame, addressed by its file name within the kind's directory.
    Raw { kind: FrameKind, name: String },
    MasterDark(ExposureTime),
    MasterTransmission(FilterName),
    /// Calibrated object frame.
    Aux { identity: FrameIdentity, seq: String },
    Reduced(Tag),
}

impl FrameKey {
    /// Directory and file name of this key.
    pub fn parts(&self) -> (&'static str, String) {
        match self {
            FrameKey::Raw { kind, name } => (kind.dir(), name.clone()),
            FrameKey::MasterDark(exposure) => (TMP_DIR, format!("mdark_{exposure}")),
            FrameKey::MasterTransmission(filter) => (TMP_DIR, format!("mtrans_{filter}")),
            FrameKey::Aux { identity, seq } => (TMP_DIR, format!("aux_{identity}_{seq}")),
            FrameKey::Reduced(tag) => (REDUCED_DIR, tag.to_string()),
        }
    }

    /// Path relative to the working-area root, without a storage extension.
    pub fn relative_path(&self) -> PathBuf {
        let (dir, name) = self.parts();
        PathBuf::from(dir).join(name)
    }

    /// Raw frame kind, if this key addresses a raw frame.
    pub fn raw_kind(&self) -> Option<FrameKind> {
        match self {
            FrameKey::Raw { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (dir, name) = self.parts();
        write!(f, "{dir}/{name}")
    }
}

/// Read/write access to frames in the working area.
///
/// Implementations must tolerate concurrent calls on distinct keys: stages
/// process their units in parallel and every unit writes its own key.
pub trait FrameStore: Send + Sync {
    fn read(&self, key: &FrameKey) -> Result<Frame>;

    fn write(&self, key: &FrameKey, frame: &Frame) -> Result<()>;

    /// Raw frame keys of `kind`, sorted by name.
    fn list(&self, kind: FrameKind) -> Result<Vec<FrameKey>>;
}
