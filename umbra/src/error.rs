//! Error types for the reduction pipeline.
//!
//! Every variant is fatal: the run halts at the point of detection and no
//! error is downgraded to a warning.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::frame::FrameDimensions;
use crate::pipeline::PipelineStage;

/// Errors that can occur while calibrating and reducing frames.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No dark frames available for any exposure")]
    MissingData,

    #[error("Missing calibration coverage: {what}")]
    Coverage { what: String },

    #[error("Frame '{key}' has dimensions {actual}, expected {expected}")]
    ShapeMismatch {
        key: String,
        expected: FrameDimensions,
        actual: FrameDimensions,
    },

    #[error("I/O failure on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Frame store failure for '{key}': {reason}")]
    Store { key: String, reason: String },

    #[error("Invalid frame name '{name}': expected {expected}")]
    InvalidFrameName {
        name: String,
        expected: &'static str,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Nothing to stack for tag {tag}")]
    EmptyStack { tag: String },

    #[error("Pipeline halted while reaching stage {stage}: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<Error>,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn coverage(what: impl Into<String>) -> Self {
        Error::Coverage { what: what.into() }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Wrap this error with the stage the pipeline was working towards.
    pub(crate) fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage the pipeline halted in, if this error came out of a run.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage wrapping removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_message() {
        let err = Error::MissingData;
        assert_eq!(err.to_string(), "No dark frames available for any exposure");
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = Error::ShapeMismatch {
            key: "obj/M1_V_100_001".to_string(),
            expected: FrameDimensions::new(64, 32),
            actual: FrameDimensions::new(32, 64),
        };
        let msg = err.to_string();
        assert!(msg.contains("obj/M1_V_100_001"));
        assert!(msg.contains("64x32"));
        assert!(msg.contains("32x64"));
    }

    #[test]
    fn test_io_error_source_chain() {
        use std::error::Error as StdError;

        let err = Error::Io {
            path: PathBuf::from("/work/dark/D_100_001.frame"),
            source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
        };
        assert!(err.to_string().contains("/work/dark/D_100_001.frame"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_in_stage_wraps_once() {
        let err = Error::MissingData
            .in_stage(PipelineStage::DarksBuilt)
            .in_stage(PipelineStage::FlatsBuilt);

        assert_eq!(err.stage(), Some(PipelineStage::DarksBuilt));
        assert!(matches!(err.root(), Error::MissingData));
        assert!(err.to_string().contains("DarksBuilt"));
    }

    #[test]
    fn test_root_of_unwrapped_error_is_itself() {
        let err = Error::coverage("filter 'R' has no flat frames");
        assert!(err.stage().is_none());
        assert!(matches!(err.root(), Error::Coverage { .. }));
    }
}
