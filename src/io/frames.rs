//! Ordered frame sequences.
//!
//! Frames are identified by a key (the file stem, e.g. `0042` for
//! `cam1_img/0042.png`). Results depend on frame order, so a sequence is
//! always sorted by key and never relies on directory enumeration order.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LocalizationError, Result};
use crate::imaging;

/// One frame of the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    pub key: String,
    pub path: PathBuf,
}

impl FrameEntry {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }
}

/// Validated, key-sorted sequence of frames.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    entries: Vec<FrameEntry>,
}

impl FrameSequence {
    /// Collect every image in `dir`, keyed by file stem.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || !imaging::is_image(&path) {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    LocalizationError::InvalidFrameSequence(format!(
                        "cannot derive a frame key from {:?}",
                        path
                    ))
                })?
                .to_string();
            entries.push(FrameEntry { key, path });
        }
        Self::from_entries(entries)
    }

    /// Sort entries by key, rejecting empty sequences, empty keys and duplicates.
    pub fn from_entries(mut entries: Vec<FrameEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(LocalizationError::InvalidFrameSequence(
                "no frames".to_string(),
            ));
        }
        if entries.iter().any(|e| e.key.is_empty()) {
            return Err(LocalizationError::InvalidFrameSequence(
                "empty frame key".to_string(),
            ));
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(LocalizationError::InvalidFrameSequence(format!(
                    "duplicate frame key '{}'",
                    entry.key
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&FrameEntry> {
        self.entries.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }
}
