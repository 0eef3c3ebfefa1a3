use std::fs::{self, File, Metadata};
use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use super::{DirEntry, EntryKind, FileSystem, FsError, StatInfo};

/// The real filesystem. Stat uses lstat semantics so symlinks are observed
/// as themselves, never followed.
#[derive(Debug, Default)]
pub struct OsFs;

impl OsFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFs {
    fn stat(&self, path: &Path) -> Result<StatInfo, FsError> {
        let metadata = fs::symlink_metadata(path)?;
        let mtime = metadata.modified().map_err(FsError::Other)?;
        Ok(StatInfo {
            mtime,
            device: device_id(&metadata),
        })
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        Ok(fs::read(path)?)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a temp file then rename so a crashed writer never leaves
        // a half-written file at the destination.
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        Ok(fs::remove_file(path)?)
    }

    fn view_id(&self) -> String {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let host = std::env::var("HOSTNAME")
            .ok()
            .or_else(|| {
                fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|s| s.trim().to_string())
            })
            .unwrap_or_else(|| "localhost".to_string());
        format!("{user}@{host}")
    }

    fn device_number(&self) -> u64 {
        std::env::current_dir()
            .and_then(fs::metadata)
            .map(|metadata| device_id(&metadata))
            .unwrap_or(0)
    }
}

/// Get device ID for mount-identity checks
#[cfg(unix)]
fn device_id(metadata: &Metadata) -> u64 {
    metadata.dev()
}

/// Get device ID (Windows - not supported, return 0)
#[cfg(not(unix))]
fn device_id(_metadata: &Metadata) -> u64 {
    0
}
