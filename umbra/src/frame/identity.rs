//! Typed frame identities parsed once at ingestion.
//!
//! Working files follow the naming conventions of the reduction area:
//! - darks: `{prefix}_{exposure}_{seq}`
//! - flats: `{filter}_{exposure}_{seq}`
//! - objects: `{object}_{filter}_{exposure}_{seq}`
//!
//! Fields are split from the left and the sequence field takes the rest, so it
//! may contain underscores. Object names may too; they are matched against the
//! configured objects.

use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::{Error, Result};

/// Exposure time in whole milliseconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ExposureTime(NonZeroU32);

impl ExposureTime {
    pub fn from_millis(millis: u32) -> Option<Self> {
        NonZeroU32::new(millis).map(Self)
    }

    #[inline]
    pub fn millis(self) -> u32 {
        self.0.get()
    }

    /// Exposure in seconds, as written to EXPTIME/EXPOSURE.
    #[inline]
    pub fn seconds(self) -> f64 {
        self.millis() as f64 / 1000.0
    }

    /// Exposure in milliseconds as a float, the abscissa of the dark model.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.millis() as f64
    }
}

impl TryFrom<u32> for ExposureTime {
    type Error = Error;

    fn try_from(millis: u32) -> Result<Self> {
        Self::from_millis(millis).ok_or_else(|| Error::config("exposure time must be positive"))
    }
}

impl From<ExposureTime> for u32 {
    fn from(exposure: ExposureTime) -> Self {
        exposure.millis()
    }
}

impl FromStr for ExposureTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let millis: u32 = s
            .parse()
            .map_err(|_| Error::config(format!("'{s}' is not an exposure in milliseconds")))?;
        Self::try_from(millis)
    }
}

impl fmt::Display for ExposureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.millis())
    }
}

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }
    };
}

name_type!(
    /// Identifier of an optical filter.
    FilterName
);

name_type!(
    /// Identifier of an observed target.
    ObjectName
);

/// Category of a raw working frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FrameKind {
    Dark,
    Flat,
    Object,
}

impl FrameKind {
    /// Working-area subdirectory holding raw frames of this kind.
    pub fn dir(self) -> &'static str {
        match self {
            FrameKind::Dark => "dark",
            FrameKind::Flat => "flat",
            FrameKind::Object => "obj",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DarkIdentity {
    pub exposure: ExposureTime,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlatIdentity {
    pub filter: FilterName,
    pub exposure: ExposureTime,
}

/// Identity of an object frame: who, through what, for how long.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameIdentity {
    pub object: ObjectName,
    pub filter: FilterName,
    pub exposure: ExposureTime,
}

impl FrameIdentity {
    pub fn new(
        object: impl Into<ObjectName>,
        filter: impl Into<FilterName>,
        exposure: ExposureTime,
    ) -> Self {
        Self {
            object: object.into(),
            filter: filter.into(),
            exposure,
        }
    }

    pub fn tag(&self) -> Tag {
        Tag {
            object: self.object.clone(),
            filter: self.filter.clone(),
            exposure: self.exposure,
        }
    }
}

impl fmt::Display for FrameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.object, self.filter, self.exposure)
    }
}

/// Stacking key: all aux frames sharing a tag are stacked together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub object: ObjectName,
    pub filter: FilterName,
    pub exposure: ExposureTime,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.object, self.filter, self.exposure)
    }
}

fn stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Split `stem` into exactly `N` non-empty fields from the left. The last
/// field keeps any remaining underscores.
fn split_fields<const N: usize>(
    name: &str,
    stem: &str,
    expected: &'static str,
) -> Result<[String; N]> {
    let invalid = || Error::InvalidFrameName {
        name: name.to_string(),
        expected,
    };

    let fields: Vec<String> = stem.splitn(N, '_').map(str::to_string).collect();
    if fields.len() != N || fields.iter().any(String::is_empty) {
        return Err(invalid());
    }
    fields.try_into().map_err(|_| invalid())
}

fn parse_exposure(name: &str, field: &str, expected: &'static str) -> Result<ExposureTime> {
    field
        .parse::<u32>()
        .ok()
        .and_then(ExposureTime::from_millis)
        .ok_or_else(|| Error::InvalidFrameName {
            name: name.to_string(),
            expected,
        })
}

/// Parse a dark working file name, returning its identity and sequence suffix.
pub fn parse_dark_name(name: &str) -> Result<(DarkIdentity, String)> {
    const EXPECTED: &str = "{prefix}_{exposure}_{seq}";
    let [_prefix, exposure, seq] = split_fields::<3>(name, stem(name), EXPECTED)?;
    let exposure = parse_exposure(name, &exposure, EXPECTED)?;
    Ok((DarkIdentity { exposure }, seq))
}

/// Parse a flat working file name, returning its identity and sequence suffix.
pub fn parse_flat_name(name: &str) -> Result<(FlatIdentity, String)> {
    const EXPECTED: &str = "{filter}_{exposure}_{seq}";
    let [filter, exposure, seq] = split_fields::<3>(name, stem(name), EXPECTED)?;
    let exposure = parse_exposure(name, &exposure, EXPECTED)?;
    Ok((
        FlatIdentity {
            filter: FilterName::new(filter),
            exposure,
        },
        seq,
    ))
}

/// Parse an object working file name against the known object names.
///
/// Object names may contain underscores, so the object field is matched as a
/// prefix, longest name first. Returns `Ok(None)` when no known object
/// matches. A matched name whose remaining fields are malformed is an error.
pub fn parse_object_name(
    name: &str,
    objects: &[ObjectName],
) -> Result<Option<(FrameIdentity, String)>> {
    const EXPECTED: &str = "{object}_{filter}_{exposure}_{seq}";
    let stem = stem(name);

    let mut candidates: Vec<(&ObjectName, &str)> = objects
        .iter()
        .filter_map(|object| {
            let rest = stem.strip_prefix(object.as_str())?.strip_prefix('_')?;
            Some((object, rest))
        })
        .collect();
    candidates.sort_by_key(|(object, _)| std::cmp::Reverse(object.as_str().len()));

    let mut first_error = None;
    for (object, rest) in candidates {
        let parsed = split_fields::<3>(name, rest, EXPECTED).and_then(|[filter, exposure, seq]| {
            let exposure = parse_exposure(name, &exposure, EXPECTED)?;
            Ok((FrameIdentity::new(object.as_str(), filter.as_str(), exposure), seq))
        });
        match parsed {
            Ok(parsed) => return Ok(Some(parsed)),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(None), Err)
}
