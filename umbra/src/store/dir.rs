//! Directory-backed frame store.
//!
//! Frame file format (`{key}.frame`):
//! - Header: [`FrameFileHeader`] (magic, version, width, height as u32)
//! - Data: f64 pixels in row-major order, native endianness
//!
//! The header cards live next to it in a JSON sidecar (`{key}.json`).

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::mem::size_of;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};

use super::{FrameKey, FrameStore};
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameHeader, FrameKind, Plane};

const FRAME_EXTENSION: &str = "frame";
const HEADER_EXTENSION: &str = "json";
const MAGIC: u32 = u32::from_le_bytes(*b"UMBR");
const VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct FrameFileHeader {
    magic: u32,
    version: u32,
    width: u32,
    height: u32,
}

/// Frame store rooted at a working directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn base_path(&self, key: &FrameKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Path of the pixel file for `key`.
    pub fn frame_path(&self, key: &FrameKey) -> PathBuf {
        with_suffix(&self.base_path(key), FRAME_EXTENSION)
    }

    /// Path of the header sidecar for `key`.
    pub fn header_path(&self, key: &FrameKey) -> PathBuf {
        with_suffix(&self.base_path(key), HEADER_EXTENSION)
    }
}

/// Append `.{ext}` without replacing anything after a dot already in the name.
fn with_suffix(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn store_error(key: &FrameKey, reason: impl Into<String>) -> Error {
    Error::Store {
        key: key.to_string(),
        reason: reason.into(),
    }
}

impl FrameStore for DirStore {
    fn read(&self, key: &FrameKey) -> Result<Frame> {
        let frame_path = self.frame_path(key);
        let bytes = fs::read(&frame_path).map_err(io_error(&frame_path))?;

        let header_size = size_of::<FrameFileHeader>();
        if bytes.len() < header_size {
            return Err(store_error(key, "truncated frame header"));
        }
        let file_header: FrameFileHeader = bytemuck::pod_read_unaligned(&bytes[..header_size]);
        if file_header.magic != MAGIC || file_header.version != VERSION {
            return Err(store_error(key, "not a frame file"));
        }

        let width = file_header.width as usize;
        let height = file_header.height as usize;
        let data = &bytes[header_size..];
        let expected_len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(size_of::<f64>()))
            .ok_or_else(|| store_error(key, format!("frame size {width}x{height} overflows")))?;
        if data.len() != expected_len {
            return Err(store_error(
                key,
                format!(
                    "pixel data is {} bytes, expected {} for {}x{}",
                    data.len(),
                    expected_len,
                    width,
                    height
                ),
            ));
        }
        let pixels: Vec<f64> = data
            .chunks_exact(size_of::<f64>())
            .map(bytemuck::pod_read_unaligned)
            .collect();

        let header_path = self.header_path(key);
        let header = match fs::read(&header_path) {
            Ok(json) => serde_json::from_slice::<FrameHeader>(&json)
                .map_err(|e| store_error(key, format!("invalid header sidecar: {e}")))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => FrameHeader::new(),
            Err(e) => return Err(io_error(&header_path)(e)),
        };

        Ok(Frame::new(Plane::new(width, height, pixels), header))
    }

    fn write(&self, key: &FrameKey, frame: &Frame) -> Result<()> {
        let frame_path = self.frame_path(key);
        if let Some(parent) = frame_path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let dims = frame.dimensions();
        let file_header = FrameFileHeader {
            magic: MAGIC,
            version: VERSION,
            width: u32::try_from(dims.width).map_err(|_| store_error(key, "width exceeds u32"))?,
            height: u32::try_from(dims.height)
                .map_err(|_| store_error(key, "height exceeds u32"))?,
        };

        let file = File::create(&frame_path).map_err(io_error(&frame_path))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(bytemuck::bytes_of(&file_header))
            .map_err(io_error(&frame_path))?;
        writer
            .write_all(bytemuck::cast_slice(frame.plane.pixels()))
            .map_err(io_error(&frame_path))?;
        writer.flush().map_err(io_error(&frame_path))?;

        let header_path = self.header_path(key);
        let json = serde_json::to_vec_pretty(&frame.header)
            .map_err(|e| store_error(key, format!("cannot encode header: {e}")))?;
        fs::write(&header_path, json).map_err(io_error(&header_path))?;

        tracing::debug!("Wrote {} ({})", key, dims);
        Ok(())
    }

    fn list(&self, kind: FrameKind) -> Result<Vec<FrameKey>> {
        let dir = self.root.join(kind.dir());
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let suffix = format!(".{FRAME_EXTENSION}");
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
            let entry = entry.map_err(io_error(&dir))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(&suffix))
            else {
                continue;
            };
            keys.push(FrameKey::Raw {
                kind,
                name: name.to_string(),
            });
        }
        keys.sort();
        Ok(keys)
    }
}
