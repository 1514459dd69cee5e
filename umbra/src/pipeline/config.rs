use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{ExposureTime, FilterName, ObjectName};

/// Configuration file encoding, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::config(format!("'{}' has no file extension", path.display()))
            })?;

        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(Error::config(format!(
                "unsupported configuration format '{}'",
                path.display()
            ))),
        }
    }
}

/// What to reduce: the objects, exposures and filters of a run.
///
/// ```yaml
/// objects: [M1, NGC7000]
/// exposures: [100, 500]   # milliseconds
/// filters: [V, R]
/// interpolate: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionConfig {
    pub objects: Vec<ObjectName>,
    pub exposures: Vec<ExposureTime>,
    pub filters: Vec<FilterName>,
    /// Synthesize master darks for exposures that have no dark frames.
    #[serde(default)]
    pub interpolate: bool,
}

impl ReductionConfig {
    /// Load and validate a YAML or JSON configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&text, format)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config = Self::parse(text, ConfigFormat::Yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config = Self::parse(text, ConfigFormat::Json)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(text: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Yaml => serde_yml::from_str(text).map_err(|e| Error::config(e.to_string())),
            ConfigFormat::Json => {
                serde_json::from_str(text).map_err(|e| Error::config(e.to_string()))
            }
        }
    }

    /// Reject empty lists, empty names, duplicates and filters containing '_'.
    pub fn validate(&self) -> Result<()> {
        check_list("objects", &self.objects, |o| o.as_str().is_empty())?;
        check_list("filters", &self.filters, |f| f.as_str().is_empty())?;
        check_list("exposures", &self.exposures, |_| false)?;

        // Object file names are split from the right, so only the object may hold '_'.
        if let Some(filter) = self.filters.iter().find(|f| f.as_str().contains('_')) {
            return Err(Error::config(format!(
                "filter '{filter}' must not contain '_'"
            )));
        }
        Ok(())
    }
}

fn check_list<T: Ord + std::fmt::Display>(
    field: &str,
    items: &[T],
    is_blank: impl Fn(&T) -> bool,
) -> Result<()> {
    if items.is_empty() {
        return Err(Error::config(format!("'{field}' must not be empty")));
    }
    if items.iter().any(is_blank) {
        return Err(Error::config(format!("'{field}' contains an empty name")));
    }

    let mut seen = BTreeSet::new();
    for item in items {
        if !seen.insert(item) {
            return Err(Error::config(format!("'{field}' lists {item} twice")));
        }
    }
    Ok(())
}
