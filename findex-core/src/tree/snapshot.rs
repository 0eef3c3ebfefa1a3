use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Everything retained about one scanned directory.
///
/// Identity is the canonical path. Child and match lists are kept sorted so
/// the serialized form is independent of scan ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirSnapshot {
    /// Canonical absolute path of the directory.
    pub path: PathBuf,
    /// Modification time observed at scan time; `None` when the directory
    /// could not be statted (unreadable).
    pub mtime: Option<SystemTime>,
    /// Device/mount identity observed at scan time.
    pub device: u64,
    /// Whether the directory contents were observable.
    pub readable: bool,
    /// Names of retained (non-excluded) child directories.
    pub child_dirs: Vec<String>,
    /// Names of files in this directory satisfying the match sets.
    pub matched_files: Vec<String>,
}

impl DirSnapshot {
    pub fn new(path: PathBuf, mtime: SystemTime, device: u64) -> Self {
        Self {
            path,
            mtime: Some(mtime),
            device,
            readable: true,
            child_dirs: Vec::new(),
            matched_files: Vec::new(),
        }
    }

    /// Leaf snapshot for a directory whose contents are not observable.
    pub fn unreadable(path: PathBuf) -> Self {
        Self {
            path,
            mtime: None,
            device: 0,
            readable: false,
            child_dirs: Vec::new(),
            matched_files: Vec::new(),
        }
    }
}
