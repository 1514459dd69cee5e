use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Well-known header keywords written by the pipeline.
pub mod keys {
    pub const FILTER: &str = "FILTER";
    pub const IMAGETYP: &str = "IMAGETYP";
    /// Exposure time in seconds.
    pub const EXPTIME: &str = "EXPTIME";
    /// Exposure time in seconds (duplicate of EXPTIME kept for older readers).
    pub const EXPOSURE: &str = "EXPOSURE";
    pub const OBJECT: &str = "OBJECT";
    /// Number of raw frames combined into a master.
    pub const NCOMBINE: &str = "NCOMBINE";
}

/// Value of the IMAGETYP keyword for frames produced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum ImageType {
    #[strum(serialize = "Dark")]
    Dark,
    #[strum(serialize = "Interpolated dark")]
    InterpolatedDark,
    #[strum(serialize = "Light Frame")]
    LightFrame,
}

/// A single header value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(f) => Some(*f),
            HeaderValue::Integer(i) => Some(*i as f64),
            HeaderValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Integer(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Text(value)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Integer(value)
    }
}

impl From<ImageType> for HeaderValue {
    fn from(value: ImageType) -> Self {
        HeaderValue::Text(value.to_string())
    }
}

/// One keyword/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCard {
    pub key: String,
    pub value: HeaderValue,
}

/// Ordered frame metadata.
///
/// Keys are stored upper-case, as FITS keywords are. Setting an existing key
/// replaces its value in place so card order is stable across overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameHeader {
    cards: Vec<HeaderCard>,
}

impl FrameHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderCard> {
        self.cards.iter()
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|card| card.key.eq_ignore_ascii_case(key))
            .map(|card| &card.value)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_text)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let value = value.into();
        match self
            .cards
            .iter_mut()
            .find(|card| card.key.eq_ignore_ascii_case(key))
        {
            Some(card) => card.value = value,
            None => self.cards.push(HeaderCard {
                key: key.to_ascii_uppercase(),
                value,
            }),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        let idx = self
            .cards
            .iter()
            .position(|card| card.key.eq_ignore_ascii_case(key))?;
        Some(self.cards.remove(idx).value)
    }

    /// IMAGETYP parsed as a pipeline image type, if it is one.
    pub fn image_type(&self) -> Option<ImageType> {
        self.get_text(keys::IMAGETYP)
            .and_then(|s| ImageType::from_str(s).ok())
    }

    /// Override the identity keywords shared by every derived frame.
    ///
    /// `exposure_seconds` goes to both EXPTIME and EXPOSURE.
    pub fn stamp(
        &mut self,
        filter: &str,
        image_type: ImageType,
        exposure_seconds: f64,
        object: &str,
    ) {
        self.set(keys::FILTER, filter);
        self.set(keys::IMAGETYP, image_type);
        self.set(keys::EXPTIME, exposure_seconds);
        self.set(keys::EXPOSURE, exposure_seconds);
        self.set(keys::OBJECT, object);
    }
}
