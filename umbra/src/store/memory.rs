use std::collections::HashMap;

use parking_lot::RwLock;

use super::{FrameKey, FrameStore};
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameKind};

/// In-memory frame store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    frames: RwLock<HashMap<FrameKey, Frame>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.read().is_empty()
    }

    pub fn contains(&self, key: &FrameKey) -> bool {
        self.frames.read().contains_key(key)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<FrameKey> {
        let mut keys: Vec<FrameKey> = self.frames.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl FrameStore for MemoryStore {
    fn read(&self, key: &FrameKey) -> Result<Frame> {
        self.frames
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Store {
                key: key.to_string(),
                reason: "no such frame".to_string(),
            })
    }

    fn write(&self, key: &FrameKey, frame: &Frame) -> Result<()> {
        self.frames.write().insert(key.clone(), frame.clone());
        Ok(())
    }

    fn list(&self, kind: FrameKind) -> Result<Vec<FrameKey>> {
        let mut keys: Vec<FrameKey> = self
            .frames
            .read()
            .keys()
            .filter(|key| key.raw_kind() == Some(kind))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
