//! Calibration master creation: master darks, interpolated darks and
//! master transmission maps.

mod dark;
mod flat;
mod interpolate;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use crate::frame::{ExposureTime, FilterName, Frame};

pub use dark::{build_master_dark, build_master_darks};
pub use flat::{build_master_transmission, build_master_transmissions, normalize_flat};
pub use interpolate::{DarkModel, interpolate_missing};

/// Master dark for one exposure time.
#[derive(Debug, Clone)]
pub struct MasterDark {
    pub exposure: ExposureTime,
    pub frame: Frame,
    /// `true` when synthesized from the dark model rather than combined
    /// from real dark frames.
    pub interpolated: bool,
}

/// Normalized, combined flat for one filter.
#[derive(Debug, Clone)]
pub struct MasterTransmission {
    pub filter: FilterName,
    pub frame: Frame,
}

/// Master darks keyed by exposure time.
///
/// Computed once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct DarkLibrary {
    darks: BTreeMap<ExposureTime, MasterDark>,
}

impl DarkLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dark: MasterDark) {
        self.darks.insert(dark.exposure, dark);
    }

    pub fn get(&self, exposure: ExposureTime) -> Option<&MasterDark> {
        self.darks.get(&exposure)
    }

    pub fn contains(&self, exposure: ExposureTime) -> bool {
        self.darks.contains_key(&exposure)
    }

    pub fn len(&self) -> usize {
        self.darks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.darks.is_empty()
    }

    /// All master darks in ascending exposure order.
    pub fn iter(&self) -> impl Iterator<Item = &MasterDark> {
        self.darks.values()
    }

    /// Master darks combined from real dark frames.
    pub fn available(&self) -> impl Iterator<Item = &MasterDark> {
        self.darks.values().filter(|d| !d.interpolated)
    }

    pub fn exposures(&self) -> impl Iterator<Item = ExposureTime> + '_ {
        self.darks.keys().copied()
    }

    /// Exposures from `requested` that have no master dark, deduplicated and sorted.
    pub fn missing(&self, requested: impl IntoIterator<Item = ExposureTime>) -> Vec<ExposureTime> {
        let mut missing: Vec<ExposureTime> = requested
            .into_iter()
            .filter(|e| !self.contains(*e))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

/// Master transmission maps keyed by filter.
#[derive(Debug, Clone, Default)]
pub struct TransmissionLibrary {
    maps: BTreeMap<FilterName, MasterTransmission>,
}

impl TransmissionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transmission: MasterTransmission) {
        self.maps.insert(transmission.filter.clone(), transmission);
    }

    pub fn get(&self, filter: &FilterName) -> Option<&MasterTransmission> {
        self.maps.get(filter)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MasterTransmission> {
        self.maps.values()
    }
}
