//! Object frame calibration: `aux = (raw - dark[exposure]) / transmission[filter]`.

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameIdentity, ImageType, ObjectFrame, Tag};
use crate::masters::{DarkLibrary, MasterDark, MasterTransmission, TransmissionLibrary};
use crate::store::FrameKey;

/// Calibrated object frame, consumed once by grouping and stacking.
#[derive(Debug, Clone)]
pub struct AuxFrame {
    pub identity: FrameIdentity,
    /// Sequence suffix inherited from the raw frame.
    pub seq: String,
    pub frame: Frame,
}

impl AuxFrame {
    pub fn key(&self) -> FrameKey {
        FrameKey::Aux {
            identity: self.identity.clone(),
            seq: self.seq.clone(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.identity.tag()
    }
}

/// Apply dark subtraction and flat division to one raw frame.
///
/// The header is cloned from `raw` with the identity keywords overridden.
pub fn calibrate_frame(
    raw: &Frame,
    identity: &FrameIdentity,
    dark: &MasterDark,
    transmission: &MasterTransmission,
) -> Frame {
    debug_assert_eq!(dark.exposure, identity.exposure);
    debug_assert_eq!(transmission.filter, identity.filter);

    let mut plane = raw.plane.clone();
    plane.subtract(&dark.frame.plane);
    plane.divide(&transmission.frame.plane);

    let mut header = raw.header.clone();
    header.stamp(
        identity.filter.as_str(),
        ImageType::LightFrame,
        identity.exposure.seconds(),
        identity.object.as_str(),
    );

    Frame::new(plane, header)
}

/// Calibrate an ingested object frame against the run's masters.
///
/// A missing dark or transmission is a coverage error: setup is expected to
/// have guaranteed both.
pub fn calibrate_object(
    object: &ObjectFrame,
    darks: &DarkLibrary,
    transmissions: &TransmissionLibrary,
) -> Result<AuxFrame> {
    let identity = &object.identity;
    let dark = darks.get(identity.exposure).ok_or_else(|| {
        Error::coverage(format!(
            "no master dark at {} ms for object frame '{}'",
            identity.exposure, object.name
        ))
    })?;
    let transmission = transmissions.get(&identity.filter).ok_or_else(|| {
        Error::coverage(format!(
            "no master transmission for filter '{}' for object frame '{}'",
            identity.filter, object.name
        ))
    })?;

    let frame = calibrate_frame(&object.frame, identity, dark, transmission);
    tracing::debug!("Calibrated {}", object.name);

    Ok(AuxFrame {
        identity: identity.clone(),
        seq: object.seq.clone(),
        frame,
    })
}
