//! FITS-backed frame store.
//!
//! Raw working frames keep the file name they were ingested with (usually
//! ending in `.fit` or `.fits`). Derived frames get a `.fits` suffix.

use std::fs;
use std::path::{Path, PathBuf};

use fitsio::FitsFile;
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};

use super::{FrameKey, FrameStore};
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameHeader, FrameKind, HeaderValue, Plane, keys};

const FITS_EXTENSIONS: [&str; 3] = ["fits", "fit", "fts"];

/// Text keywords carried over when reading.
const TEXT_KEYS: &[&str] = &[
    keys::FILTER,
    keys::IMAGETYP,
    keys::OBJECT,
    "INSTRUME",
    "TELESCOP",
    "DATE-OBS",
];

/// Floating-point keywords carried over when reading.
const FLOAT_KEYS: &[&str] = &[keys::EXPTIME, keys::EXPOSURE, "CCD-TEMP", "SET-TEMP"];

/// Integer keywords carried over when reading.
const INT_KEYS: &[&str] = &[keys::NCOMBINE, "XBINNING", "YBINNING"];

/// Keywords owned by cfitsio that must not be written by hand.
const STRUCTURAL_KEYS: &[&str] = &["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND"];

/// Frame store over a directory of FITS files.
#[derive(Debug, Clone)]
pub struct FitsStore {
    root: PathBuf,
}

impl FitsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk path of `key`.
    pub fn path(&self, key: &FrameKey) -> PathBuf {
        let path = self.root.join(key.relative_path());
        match key {
            FrameKey::Raw { .. } => path,
            _ => {
                let mut os = path.into_os_string();
                os.push(".fits");
                PathBuf::from(os)
            }
        }
    }
}

fn fits_error(key: &FrameKey) -> impl FnOnce(fitsio::errors::Error) -> Error + '_ {
    move |e| Error::Store {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

fn read_header(hdu: &FitsHdu, fptr: &mut FitsFile) -> FrameHeader {
    let mut header = FrameHeader::new();
    for key in TEXT_KEYS {
        if let Ok(value) = hdu.read_key::<String>(fptr, key) {
            header.set(key, value.trim_end());
        }
    }
    for key in FLOAT_KEYS {
        if let Ok(value) = hdu.read_key::<f64>(fptr, key) {
            header.set(key, value);
        }
    }
    for key in INT_KEYS {
        if let Ok(value) = hdu.read_key::<i64>(fptr, key) {
            header.set(key, value);
        }
    }
    header
}

impl FrameStore for FitsStore {
    fn read(&self, key: &FrameKey) -> Result<Frame> {
        let path = self.path(key);
        let mut fptr = FitsFile::open(&path).map_err(fits_error(key))?;
        let hdu = fptr.primary_hdu().map_err(fits_error(key))?;

        // Shape is reported in reverse NAXIS order: [height, width].
        let (width, height) = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (shape[1], shape[0]),
            HduInfo::ImageInfo { shape, .. } => {
                return Err(Error::Store {
                    key: key.to_string(),
                    reason: format!("expected a 2D image, found {} axes", shape.len()),
                });
            }
            _ => {
                return Err(Error::Store {
                    key: key.to_string(),
                    reason: "primary HDU is not an image".to_string(),
                });
            }
        };

        let pixels: Vec<f64> = hdu.read_image(&mut fptr).map_err(fits_error(key))?;
        if pixels.len() != width * height {
            return Err(Error::Store {
                key: key.to_string(),
                reason: format!(
                    "read {} pixels, expected {} for {}x{}",
                    pixels.len(),
                    width * height,
                    width,
                    height
                ),
            });
        }
        let header = read_header(&hdu, &mut fptr);

        Ok(Frame::new(Plane::new(width, height, pixels), header))
    }

    fn write(&self, key: &FrameKey, frame: &Frame) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        // cfitsio refuses to create over an existing file.
        if path.exists() {
            fs::remove_file(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
        }

        let dims = frame.dimensions();
        let description = ImageDescription {
            data_type: ImageType::Double,
            dimensions: &[dims.height, dims.width],
        };
        let mut fptr = FitsFile::create(&path)
            .with_custom_primary(&description)
            .open()
            .map_err(fits_error(key))?;
        let hdu = fptr.primary_hdu().map_err(fits_error(key))?;
        hdu.write_image(&mut fptr, frame.plane.pixels())
            .map_err(fits_error(key))?;

        for card in frame.header.iter() {
            if STRUCTURAL_KEYS.contains(&card.key.as_str()) {
                continue;
            }
            let written = match &card.value {
                HeaderValue::Integer(v) => hdu.write_key(&mut fptr, &card.key, *v),
                HeaderValue::Float(v) => hdu.write_key(&mut fptr, &card.key, *v),
                HeaderValue::Text(v) => hdu.write_key(&mut fptr, &card.key, v.as_str()),
            };
            written.map_err(fits_error(key))?;
        }

        tracing::debug!("Wrote {} ({})", path.display(), dims);
        Ok(())
    }

    fn list(&self, kind: FrameKind) -> Result<Vec<FrameKey>> {
        let dir = self.root.join(kind.dir());
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let io_error = |source| Error::Io {
            path: dir.clone(),
            source,
        };
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let is_fits = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FITS_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)));
            if !path.is_file() || !is_fits {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                keys.push(FrameKey::Raw {
                    kind,
                    name: name.to_string(),
                });
            }
        }
        keys.sort();
        Ok(keys)
    }
}
