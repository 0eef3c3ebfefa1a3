pub mod cache;
pub mod config;
pub mod error;
pub mod finder;
pub mod fs;
pub mod paths;
pub mod scanner;
pub mod tree;

pub use cache::CacheFingerprint;
pub use config::{CacheParams, ScanParams};
pub use error::{FindexError, Result};
pub use finder::{DirEntries, Finder, Selection};
pub use fs::{DirEntry, EntryKind, FileSystem, FsError, MockFs, OsFs, StatInfo};
pub use scanner::{ScanScheduler, ScanStats};
pub use tree::{DirSnapshot, DirTree};
