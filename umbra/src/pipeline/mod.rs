//! Run orchestration.
//!
//! A run moves through a fixed sequence of states:
//!
//! ```text
//! DarksBuilt -> DarksInterpolated -> FlatsBuilt -> ObjectsCalibrated -> Grouped -> Stacked
//! ```
//!
//! No stage begins before its predecessor completes for all inputs. The first
//! fatal error halts the run; artefacts already written stay in the store.

mod config;
mod inventory;


use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use strum_macros::Display;

pub use config::ReductionConfig;
pub use inventory::Inventory;

use crate::calibrate::{AuxFrame, calibrate_object};
use crate::error::{Error, Result};
use crate::frame::{ExposureTime, Frame, FrameHeader, ImageType, ObjectFrame, Tag};
use crate::grouping::group_frames;
use crate::masters::{
    DarkLibrary, TransmissionLibrary, build_master_darks, build_master_transmissions,
    interpolate_missing,
};
use crate::stacking::{ReducedFrame, Stacker};
use crate::store::{FrameKey, FrameStore};

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum PipelineStage {
    DarksBuilt,
    DarksInterpolated,
    FlatsBuilt,
    ObjectsCalibrated,
    Grouped,
    Stacked,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::DarksBuilt,
        PipelineStage::DarksInterpolated,
        PipelineStage::FlatsBuilt,
        PipelineStage::ObjectsCalibrated,
        PipelineStage::Grouped,
        PipelineStage::Stacked,
    ];

    /// Position in [`PipelineStage::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Progress information for a run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineProgress {
    /// Stage just completed.
    pub stage: PipelineStage,
    /// Number of completed stages.
    pub current: usize,
    /// Total number of stages.
    pub total: usize,
}

/// Callback type for progress reporting.
pub type ProgressCallback = Option<Arc<dyn Fn(PipelineProgress) + Send + Sync>>;

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct ReductionReport {
    /// One reduced frame per tag, in tag order.
    pub reduced: Vec<ReducedFrame>,
    /// Exposures whose master dark was synthesized.
    pub interpolated: Vec<ExposureTime>,
    pub darks: DarkLibrary,
    pub transmissions: TransmissionLibrary,
}

impl ReductionReport {
    pub fn reduced(&self, tag: &Tag) -> Option<&ReducedFrame> {
        self.reduced.iter().find(|r| &r.tag == tag)
    }
}

/// Sequences the calibration stages over one store.
pub struct Pipeline<'a> {
    store: &'a dyn FrameStore,
    stacker: &'a dyn Stacker,
    progress: ProgressCallback,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn FrameStore, stacker: &'a dyn Stacker) -> Self {
        Self {
            store,
            stacker,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Ingest the store's raw frames for `config` and run every stage.
    pub fn run_config(&self, config: &ReductionConfig) -> Result<ReductionReport> {
        let inventory = Inventory::load(self.store, config)?;
        self.run(&inventory)
    }

    /// Run every stage over an ingested inventory.
    ///
    /// Errors are wrapped in [`Error::Stage`] naming the stage that failed.
    pub fn run(&self, inventory: &Inventory) -> Result<ReductionReport> {
        let mut darks = self
            .build_darks(inventory)
            .map_err(|e| e.in_stage(PipelineStage::DarksBuilt))?;
        self.completed(PipelineStage::DarksBuilt);

        let interpolated = self
            .interpolate_darks(inventory, &mut darks)
            .map_err(|e| e.in_stage(PipelineStage::DarksInterpolated))?;
        self.completed(PipelineStage::DarksInterpolated);

        let transmissions = self
            .build_flats(inventory, &darks)
            .map_err(|e| e.in_stage(PipelineStage::FlatsBuilt))?;
        self.completed(PipelineStage::FlatsBuilt);

        let aux = self
            .calibrate_objects(inventory, &darks, &transmissions)
            .map_err(|e| e.in_stage(PipelineStage::ObjectsCalibrated))?;
        self.completed(PipelineStage::ObjectsCalibrated);

        let groups = group_all(aux);
        self.completed(PipelineStage::Grouped);

        let reduced = self
            .stack_groups(inventory, groups)
            .map_err(|e| e.in_stage(PipelineStage::Stacked))?;
        self.completed(PipelineStage::Stacked);

        Ok(ReductionReport {
            reduced,
            interpolated,
            darks,
            transmissions,
        })
    }

    fn completed(&self, stage: PipelineStage) {
        tracing::info!("Pipeline reached {}", stage);
        if let Some(f) = self.progress.as_ref() {
            f(PipelineProgress {
                stage,
                current: stage.index() + 1,
                total: PipelineStage::ALL.len(),
            });
        }
    }

    fn build_darks(&self, inventory: &Inventory) -> Result<DarkLibrary> {
        let library = build_master_darks(&inventory.darks)?;
        let masters: Vec<_> = library.iter().collect();
        masters
            .par_iter()
            .try_for_each(|d| self.store.write(&FrameKey::MasterDark(d.exposure), &d.frame))?;
        Ok(library)
    }

    fn interpolate_darks(
        &self,
        inventory: &Inventory,
        darks: &mut DarkLibrary,
    ) -> Result<Vec<ExposureTime>> {
        if !inventory.config.interpolate {
            let missing = darks.missing(inventory.required_exposures());
            if let Some(exposure) = missing.first() {
                return Err(Error::coverage(format!(
                    "no master dark at {exposure} ms and interpolation is disabled"
                )));
            }
            return Ok(Vec::new());
        }

        let synthesized = interpolate_missing(darks, inventory.required_exposures())?;
        let written: Vec<_> = synthesized.iter().filter_map(|e| darks.get(*e)).collect();
        written
            .par_iter()
            .try_for_each(|d| self.store.write(&FrameKey::MasterDark(d.exposure), &d.frame))?;
        Ok(synthesized)
    }

    fn build_flats(&self, inventory: &Inventory, darks: &DarkLibrary) -> Result<TransmissionLibrary> {
        let library = build_master_transmissions(&inventory.flats, darks)?;
        let maps: Vec<_> = library.iter().collect();
        maps.par_iter().try_for_each(|t| {
            self.store
                .write(&FrameKey::MasterTransmission(t.filter.clone()), &t.frame)
        })?;
        Ok(library)
    }

    fn calibrate_objects(
        &self,
        inventory: &Inventory,
        darks: &DarkLibrary,
        transmissions: &TransmissionLibrary,
    ) -> Result<Vec<AuxFrame>> {
        let objects: Vec<&ObjectFrame> = inventory.objects.values().flatten().collect();
        let aux: Vec<AuxFrame> = objects
            .par_iter()
            .map(|object| {
                let aux = calibrate_object(object, darks, transmissions)?;
                self.store.write(&aux.key(), &aux.frame)?;
                Ok(aux)
            })
            .collect::<Result<_>>()?;

        tracing::info!("Calibrated {} object frames", aux.len());
        Ok(aux)
    }

    fn stack_groups(
        &self,
        inventory: &Inventory,
        groups: BTreeMap<Tag, Vec<AuxFrame>>,
    ) -> Result<Vec<ReducedFrame>> {
        let templates = header_templates(inventory);
        let units: Vec<(Tag, Vec<AuxFrame>)> = groups.into_iter().collect();

        units
            .par_iter()
            .map(|(tag, frames)| {
                let plane = self.stacker.stack(tag, frames)?;
                if plane.dimensions() != inventory.dimensions {
                    return Err(Error::ShapeMismatch {
                        key: FrameKey::Reduced(tag.clone()).to_string(),
                        expected: inventory.dimensions,
                        actual: plane.dimensions(),
                    });
                }

                let mut header = templates.get(tag).cloned().cloned().unwrap_or_default();
                header.stamp(
                    tag.filter.as_str(),
                    ImageType::LightFrame,
                    tag.exposure.seconds(),
                    tag.object.as_str(),
                );

                let reduced = ReducedFrame {
                    tag: tag.clone(),
                    frame: Frame::new(plane, header),
                };
                self.store.write(&reduced.key(), &reduced.frame)?;
                tracing::info!("Stacked {} frames into {}", frames.len(), reduced.key());
                Ok(reduced)
            })
            .collect()
    }
}

/// Partition every object's aux frames into per-tag groups.
fn group_all(aux: Vec<AuxFrame>) -> BTreeMap<Tag, Vec<AuxFrame>> {
    let mut per_object: BTreeMap<_, Vec<AuxFrame>> = BTreeMap::new();
    for frame in aux {
        per_object
            .entry(frame.identity.object.clone())
            .or_default()
            .push(frame);
    }

    let mut groups = BTreeMap::new();
    for (object, frames) in per_object {
        groups.extend(group_frames(&object, frames));
    }
    groups
}

/// Header of the first raw object frame of every tag.
fn header_templates(inventory: &Inventory) -> BTreeMap<Tag, &FrameHeader> {
    let mut templates = BTreeMap::new();
    for object in inventory.objects.values().flatten() {
        templates
            .entry(object.identity.tag())
            .or_insert(&object.frame.header);
    }
    templates
}
