//! Ingestion: list, parse and read every raw frame of a run exactly once.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rayon::prelude::*;

use super::ReductionConfig;
use crate::error::{Error, Result};
use crate::frame::{
    ExposureTime, FilterName, FlatFrame, Frame, FrameDimensions, FrameKind, ObjectFrame,
    ObjectName, parse_dark_name, parse_flat_name, parse_object_name,
};
use crate::store::{FrameKey, FrameStore};

/// Every raw frame of a run, grouped the way the stages consume them.
///
/// Construction checks the run preconditions: one common frame shape and
/// calibration coverage for everything the configuration asks for.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub config: ReductionConfig,
    /// Shape shared by every frame of the run.
    pub dimensions: FrameDimensions,
    pub darks: BTreeMap<ExposureTime, Vec<Frame>>,
    pub flats: BTreeMap<FilterName, Vec<FlatFrame>>,
    pub objects: BTreeMap<ObjectName, Vec<ObjectFrame>>,
    required_exposures: BTreeSet<ExposureTime>,
}

/// Tracks the first frame shape seen and rejects any other, and any empty one.
#[derive(Default)]
struct ShapeCheck {
    expected: Option<FrameDimensions>,
}

impl ShapeCheck {
    fn check(&mut self, label: impl fmt::Display, actual: FrameDimensions) -> Result<()> {
        if actual.width == 0 || actual.height == 0 {
            return Err(Error::ShapeMismatch {
                key: label.to_string(),
                expected: self.expected.unwrap_or(actual),
                actual,
            });
        }
        match self.expected {
            None => {
                self.expected = Some(actual);
                Ok(())
            }
            Some(expected) if expected == actual => Ok(()),
            Some(expected) => Err(Error::ShapeMismatch {
                key: label.to_string(),
                expected,
                actual,
            }),
        }
    }
}

fn raw_name(key: &FrameKey) -> &str {
    match key {
        FrameKey::Raw { name, .. } => name,
        _ => "",
    }
}

/// Read `names` of `kind` from `store` in parallel, keeping their order.
fn read_all(
    store: &dyn FrameStore,
    kind: FrameKind,
    names: &[String],
) -> Result<Vec<Frame>> {
    names
        .par_iter()
        .map(|name| {
            let key = FrameKey::Raw {
                kind,
                name: name.clone(),
            };
            let frame = store.read(&key)?;
            tracing::debug!("Read {} ({})", key, frame.dimensions());
            Ok(frame)
        })
        .collect()
}

impl Inventory {
    /// Ingest the raw frames held by `store` for `config`.
    ///
    /// Frames whose object or filter is not configured are skipped without
    /// being read.
    pub fn load(store: &dyn FrameStore, config: &ReductionConfig) -> Result<Self> {
        config.validate()?;
        let filters: BTreeSet<&FilterName> = config.filters.iter().collect();

        let mut dark_names = Vec::new();
        let mut dark_ids = Vec::new();
        for key in store.list(FrameKind::Dark)? {
            let name = raw_name(&key);
            let (identity, _seq) = parse_dark_name(name)?;
            dark_ids.push(identity.exposure);
            dark_names.push(name.to_string());
        }

        let mut flat_names = Vec::new();
        let mut flat_ids = Vec::new();
        for key in store.list(FrameKind::Flat)? {
            let name = raw_name(&key);
            let (identity, _seq) = parse_flat_name(name)?;
            if !filters.contains(&identity.filter) {
                tracing::debug!("Ignoring flat '{}': filter not configured", name);
                continue;
            }
            flat_ids.push(identity);
            flat_names.push(name.to_string());
        }

        let mut object_names = Vec::new();
        let mut object_ids = Vec::new();
        for key in store.list(FrameKind::Object)? {
            let name = raw_name(&key);
            let Some((identity, seq)) = parse_object_name(name, &config.objects)? else {
                tracing::debug!("Ignoring object frame '{}': object not configured", name);
                continue;
            };
            if !filters.contains(&identity.filter) {
                tracing::debug!("Ignoring object frame '{}': filter not configured", name);
                continue;
            }
            object_ids.push((identity, seq));
            object_names.push(name.to_string());
        }

        let dark_frames = read_all(store, FrameKind::Dark, &dark_names)?;
        let flat_frames = read_all(store, FrameKind::Flat, &flat_names)?;
        let object_frames = read_all(store, FrameKind::Object, &object_names)?;

        let mut shapes = ShapeCheck::default();
        let labelled = [
            (FrameKind::Dark, &dark_names, &dark_frames),
            (FrameKind::Flat, &flat_names, &flat_frames),
            (FrameKind::Object, &object_names, &object_frames),
        ];
        for (kind, names, frames) in labelled {
            for (name, frame) in names.iter().zip(frames.iter()) {
                shapes.check(format_args!("{}/{}", kind.dir(), name), frame.dimensions())?;
            }
        }

        let mut darks: BTreeMap<ExposureTime, Vec<Frame>> = BTreeMap::new();
        for (exposure, frame) in dark_ids.into_iter().zip(dark_frames) {
            darks.entry(exposure).or_default().push(frame);
        }

        let mut flats: BTreeMap<FilterName, Vec<FlatFrame>> = BTreeMap::new();
        for ((identity, name), frame) in flat_ids.into_iter().zip(flat_names).zip(flat_frames) {
            flats
                .entry(identity.filter.clone())
                .or_default()
                .push(FlatFrame {
                    identity,
                    name,
                    frame,
                });
        }

        let mut object_map: BTreeMap<ObjectName, Vec<ObjectFrame>> = BTreeMap::new();
        for (((identity, seq), name), frame) in
            object_ids.into_iter().zip(object_names).zip(object_frames)
        {
            object_map
                .entry(identity.object.clone())
                .or_default()
                .push(ObjectFrame {
                    identity,
                    seq,
                    name,
                    frame,
                });
        }

        let inventory = Self::from_parts(config.clone(), darks, flats, object_map)?;
        tracing::info!(
            "Ingested {} darks, {} flats and {} object frames ({})",
            inventory.darks.values().map(Vec::len).sum::<usize>(),
            inventory.flats.values().map(Vec::len).sum::<usize>(),
            inventory.objects.values().map(Vec::len).sum::<usize>(),
            inventory.dimensions
        );
        Ok(inventory)
    }

    /// Build an inventory from frames already in memory.
    ///
    /// Applies the same configuration filtering and precondition checks as
    /// [`Inventory::load`].
    pub fn from_parts(
        config: ReductionConfig,
        darks: BTreeMap<ExposureTime, Vec<Frame>>,
        mut flats: BTreeMap<FilterName, Vec<FlatFrame>>,
        mut objects: BTreeMap<ObjectName, Vec<ObjectFrame>>,
    ) -> Result<Self> {
        config.validate()?;

        flats.retain(|filter, _| {
            let keep = config.filters.contains(filter);
            if !keep {
                tracing::debug!("Ignoring flats of unconfigured filter '{}'", filter);
            }
            keep
        });
        objects.retain(|object, _| {
            let keep = config.objects.contains(object);
            if !keep {
                tracing::debug!("Ignoring frames of unconfigured object '{}'", object);
            }
            keep
        });
        for frames in objects.values_mut() {
            frames.retain(|f| config.filters.contains(&f.identity.filter));
        }

        let mut shapes = ShapeCheck::default();
        for (exposure, frames) in &darks {
            for (i, frame) in frames.iter().enumerate() {
                shapes.check(
                    format_args!("dark #{i} at {exposure} ms"),
                    frame.dimensions(),
                )?;
            }
        }
        for flat in flats.values().flatten() {
            shapes.check(format_args!("flat/{}", flat.name), flat.frame.dimensions())?;
        }
        for object in objects.values().flatten() {
            shapes.check(format_args!("obj/{}", object.name), object.frame.dimensions())?;
        }

        for filter in &config.filters {
            if flats.get(filter).is_none_or(Vec::is_empty) {
                return Err(Error::coverage(format!("filter '{filter}' has no flat frames")));
            }
        }
        for object in &config.objects {
            if objects.get(object).is_none_or(Vec::is_empty) {
                return Err(Error::coverage(format!("object '{object}' has no frames")));
            }
        }

        let mut required_exposures: BTreeSet<ExposureTime> =
            config.exposures.iter().copied().collect();
        required_exposures.extend(flats.values().flatten().map(|f| f.identity.exposure));
        required_exposures.extend(objects.values().flatten().map(|o| o.identity.exposure));

        // Without darks at all the run halts in the first stage instead.
        let has_darks = darks.values().any(|frames| !frames.is_empty());
        if !config.interpolate && has_darks {
            let missing: Vec<String> = required_exposures
                .iter()
                .filter(|e| darks.get(*e).is_none_or(Vec::is_empty))
                .map(|e| format!("{e} ms"))
                .collect();
            if !missing.is_empty() {
                return Err(Error::coverage(format!(
                    "no dark frames for exposures {} and interpolation is disabled",
                    missing.join(", ")
                )));
            }
        }

        Ok(Self {
            config,
            // Configured filters are non-empty and each has a flat, so a shape exists.
            dimensions: shapes.expected.unwrap_or_default(),
            darks,
            flats,
            objects,
            required_exposures,
        })
    }

    /// Exposures that need a master dark: configured ones plus those used by
    /// ingested flats and object frames.
    pub fn required_exposures(&self) -> impl Iterator<Item = ExposureTime> + '_ {
        self.required_exposures.iter().copied()
    }
}
