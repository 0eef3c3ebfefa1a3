mod mock;
mod os;

pub use mock::MockFs;
pub use os::OsFs;

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Filesystem error classified by the recovery policy it triggers.
///
/// `NotFound` and `PermissionDenied` are recoverable per entry during a
/// scan; `Other` aborts the whole scan.
#[derive(Debug)]
pub enum FsError {
    NotFound,
    PermissionDenied,
    Other(io::Error),
}

impl FsError {
    /// Lower back into an `io::Error` for embedding in a crate error.
    pub fn into_io(self) -> io::Error {
        match self {
            FsError::NotFound => io::Error::from(io::ErrorKind::NotFound),
            FsError::PermissionDenied => io::Error::from(io::ErrorKind::PermissionDenied),
            FsError::Other(err) => err,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
            _ => FsError::Other(err),
        }
    }
}

/// What a directory entry is, with lstat semantics: a symlink is reported
/// as a symlink regardless of what it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

/// A single entry returned by [`FileSystem::list_dir`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// The subset of stat output the index cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    pub mtime: SystemTime,
    pub device: u64,
}

/// The sole OS-facing seam. Everything the finder does to the outside
/// world goes through this trait, which makes the scan fully testable
/// against [`MockFs`].
pub trait FileSystem: Send + Sync {
    fn stat(&self, path: &Path) -> Result<StatInfo, FsError>;

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Atomically replace the file at `path`, creating parent directories
    /// as needed.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// `user@host` identity of the context this filesystem is viewed from.
    fn view_id(&self) -> String;

    /// Device identity of the context, folded into the cache fingerprint so
    /// an index built on one mount is not trusted on another.
    fn device_number(&self) -> u64;
}
