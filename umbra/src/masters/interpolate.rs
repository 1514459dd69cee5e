//! Synthetic master darks for exposures without real dark data.
//!
//! Each pixel is modelled as `dark(e) = a·e + b` over the exposures that do
//! have master darks. With a single exposure the dark is treated as pure bias
//! (`a = 0`, `b = that dark`). With two or more, `a` and `b` are the
//! closed-form ordinary least-squares estimators:
//!
//! ```text
//! a = (mean(e·d) − mean(e)·mean(d)) / (mean(e²) − mean(e)²)
//! b = mean(d) − a·mean(e)
//! ```

use rayon::prelude::*;

use super::{DarkLibrary, MasterDark};
use crate::error::{Error, Result};
use crate::frame::{ExposureTime, Frame, FrameHeader, ImageType, Plane, keys};
use crate::math::mean_f64;

/// Per-pixel linear dark model fitted over available master darks.
#[derive(Debug, Clone)]
pub struct DarkModel {
    /// Dark signal per millisecond of exposure.
    pub slope: Plane,
    /// Exposure-independent (bias) component.
    pub intercept: Plane,
    /// Header of the first available master dark, the base of synthesized headers.
    template: FrameHeader,
}

impl DarkModel {
    /// Fit the model over the non-interpolated darks of `library`.
    pub fn fit(library: &DarkLibrary) -> Result<Self> {
        let available: Vec<&MasterDark> = library.available().collect();

        let (first, rest) = available.split_first().ok_or(Error::MissingData)?;
        let template = first.frame.header.clone();

        if rest.is_empty() {
            let plane = &first.frame.plane;
            return Ok(Self {
                slope: Plane::zeros(plane.width(), plane.height()),
                intercept: plane.clone(),
                template,
            });
        }

        let dims = first.frame.dimensions();
        let n = available.len() as f64;
        let exposures: Vec<f64> = available.iter().map(|d| d.exposure.as_f64()).collect();
        let squares: Vec<f64> = exposures.iter().map(|e| e * e).collect();
        let mean_e = mean_f64(&exposures);
        let variance_e = mean_f64(&squares) - mean_e * mean_e;

        let mean_d = Plane::from_pixel_fn(dims, |i| {
            available.iter().map(|d| d.frame.plane[i]).sum::<f64>() / n
        });
        let mean_ed = Plane::from_pixel_fn(dims, |i| {
            available
                .iter()
                .zip(&exposures)
                .map(|(d, e)| e * d.frame.plane[i])
                .sum::<f64>()
                / n
        });

        let slope = Plane::from_pixel_fn(dims, |i| (mean_ed[i] - mean_e * mean_d[i]) / variance_e);
        let intercept = Plane::from_pixel_fn(dims, |i| mean_d[i] - slope[i] * mean_e);

        Ok(Self {
            slope,
            intercept,
            template,
        })
    }

    /// Model dark plane at `exposure`.
    pub fn evaluate(&self, exposure: ExposureTime) -> Plane {
        Plane::affine(&self.slope, exposure.as_f64(), &self.intercept)
    }

    /// Synthetic master dark at `exposure`.
    pub fn synthesize(&self, exposure: ExposureTime) -> MasterDark {
        let mut header = self.template.clone();
        header.set(keys::IMAGETYP, ImageType::InterpolatedDark);
        header.set(keys::EXPTIME, exposure.seconds());
        header.set(keys::EXPOSURE, exposure.seconds());
        header.remove(keys::NCOMBINE);

        MasterDark {
            exposure,
            frame: Frame::new(self.evaluate(exposure), header),
            interpolated: true,
        }
    }
}

/// Add a synthetic master dark for every requested exposure missing from `library`.
///
/// Returns the synthesized exposures in ascending order. Fails with
/// [`Error::MissingData`] when `library` has no real master dark.
pub fn interpolate_missing(
    library: &mut DarkLibrary,
    requested: impl IntoIterator<Item = ExposureTime>,
) -> Result<Vec<ExposureTime>> {
    if library.available().next().is_none() {
        return Err(Error::MissingData);
    }

    let missing = library.missing(requested);
    if missing.is_empty() {
        return Ok(missing);
    }

    let model = DarkModel::fit(library)?;
    let synthesized: Vec<MasterDark> = missing
        .par_iter()
        .map(|exposure| model.synthesize(*exposure))
        .collect();

    for dark in synthesized {
        tracing::info!("Interpolated master dark for {} ms", dark.exposure);
        library.insert(dark);
    }

    Ok(missing)
}
