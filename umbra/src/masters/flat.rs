use std::collections::BTreeMap;

use rayon::prelude::*;

use super::{DarkLibrary, MasterDark, MasterTransmission, TransmissionLibrary};
use crate::error::{Error, Result};
use crate::frame::{FilterName, FlatFrame, Frame, ImageType, Plane, keys};
use crate::math::median_combine;

/// OBJECT keyword of every master transmission.
const FLAT_OBJECT: &str = "FLAT";

/// EXPTIME/EXPOSURE of a transmission map, which is not tied to one exposure.
const NO_EXPOSURE: f64 = -1.0;

/// Dark-subtract a flat and normalize it by its column means.
///
/// The mean is taken along the first image axis, giving one divisor per
/// column that is broadcast over every row. This is not a whole-frame scalar
/// normalization.
pub fn normalize_flat(flat: &Frame, dark: &MasterDark) -> Plane {
    let mut normalized = flat.plane.clone();
    normalized.subtract(&dark.frame.plane);

    let means = normalized.column_means();
    let degenerate = means.iter().filter(|m| !(m.is_finite() && **m > 0.0)).count();
    if degenerate > 0 {
        tracing::warn!(
            "{} of {} flat columns have a non-positive mean after dark subtraction ({} ms)",
            degenerate,
            means.len(),
            dark.exposure
        );
    }

    normalized.divide_columns(&means);
    normalized
}

/// Combine the normalized flats of one filter into its master transmission.
pub fn build_master_transmission(
    filter: &FilterName,
    flats: &[FlatFrame],
    darks: &DarkLibrary,
) -> Result<MasterTransmission> {
    let first = flats
        .first()
        .ok_or_else(|| Error::coverage(format!("filter '{filter}' has no flat frames")))?;

    let normalized: Vec<Plane> = flats
        .par_iter()
        .map(|flat| {
            debug_assert_eq!(&flat.identity.filter, filter);
            let dark = darks.get(flat.identity.exposure).ok_or_else(|| {
                Error::coverage(format!(
                    "no master dark at {} ms for flat '{}'",
                    flat.identity.exposure, flat.name
                ))
            })?;
            Ok(normalize_flat(&flat.frame, dark))
        })
        .collect::<Result<_>>()?;

    let planes: Vec<&Plane> = normalized.iter().collect();
    let plane = median_combine(&planes);

    let mut header = first.frame.header.clone();
    header.stamp(
        filter.as_str(),
        ImageType::LightFrame,
        NO_EXPOSURE,
        FLAT_OBJECT,
    );
    header.set(keys::NCOMBINE, flats.len() as i64);

    tracing::info!(
        "Master transmission '{}' combined from {} flats",
        filter,
        flats.len()
    );

    Ok(MasterTransmission {
        filter: filter.clone(),
        frame: Frame::new(plane, header),
    })
}

/// Build one master transmission per filter.
pub fn build_master_transmissions(
    flats: &BTreeMap<FilterName, Vec<FlatFrame>>,
    darks: &DarkLibrary,
) -> Result<TransmissionLibrary> {
    let units: Vec<(&FilterName, &Vec<FlatFrame>)> = flats.iter().collect();

    let maps: Vec<MasterTransmission> = units
        .par_iter()
        .map(|(filter, frames)| build_master_transmission(filter, frames, darks))
        .collect::<Result<_>>()?;

    let mut library = TransmissionLibrary::new();
    for map in maps {
        library.insert(map);
    }
    Ok(library)
}
