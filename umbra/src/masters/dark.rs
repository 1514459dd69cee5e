use std::collections::BTreeMap;

use rayon::prelude::*;

use super::{DarkLibrary, MasterDark};
use crate::error::{Error, Result};
use crate::frame::{ExposureTime, Frame, ImageType, Plane, keys};
use crate::math::median_combine;

/// OBJECT keyword of every master dark.
const DARK_OBJECT: &str = "DARK";

/// Median-combine the raw darks of one exposure into a master dark.
///
/// Returns `None` if `frames` is empty. The header is taken from the first
/// frame with the filter cleared and the exposure keywords set to `exposure`.
pub fn build_master_dark(exposure: ExposureTime, frames: &[Frame]) -> Option<MasterDark> {
    let first = frames.first()?;

    let planes: Vec<&Plane> = frames.iter().map(|f| &f.plane).collect();
    let plane = median_combine(&planes);

    let mut header = first.header.clone();
    header.stamp("", ImageType::Dark, exposure.seconds(), DARK_OBJECT);
    header.set(keys::NCOMBINE, frames.len() as i64);

    Some(MasterDark {
        exposure,
        frame: Frame::new(plane, header),
        interpolated: false,
    })
}

/// Build one master dark per exposure that has at least one raw dark.
///
/// Fails with [`Error::MissingData`] when no exposure has any dark frame.
pub fn build_master_darks(darks: &BTreeMap<ExposureTime, Vec<Frame>>) -> Result<DarkLibrary> {
    let units: Vec<(ExposureTime, &[Frame])> = darks
        .iter()
        .filter_map(|(exposure, frames)| {
            if frames.is_empty() {
                tracing::warn!("Exposure {} ms listed without any dark frames", exposure);
                None
            } else {
                Some((*exposure, frames.as_slice()))
            }
        })
        .collect();

    if units.is_empty() {
        return Err(Error::MissingData);
    }

    let masters: Vec<MasterDark> = units
        .par_iter()
        .filter_map(|(exposure, frames)| build_master_dark(*exposure, frames))
        .collect();

    let mut library = DarkLibrary::new();
    for master in masters {
        tracing::info!(
            "Master dark {} ms combined from {} frames",
            master.exposure,
            master
                .frame
                .header
                .get(keys::NCOMBINE)
                .and_then(|v| v.as_i64())
                .unwrap_or_default()
        );
        library.insert(master);
    }

    Ok(library)
}
