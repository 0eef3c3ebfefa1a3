use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::paths;

/// Configuration describing what the index covers.
///
/// Relative entries in `root_dirs` are resolved against `working_directory`.
/// Two configurations that normalize to the same [`ScanParams`] share a
/// cache file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheParams {
    /// Base directory for resolving relative roots and query paths.
    pub working_directory: PathBuf,
    /// Root directories to index.
    pub root_dirs: Vec<PathBuf>,
    /// Directory basenames excluded from the index entirely.
    pub exclude_dirs: Vec<String>,
    /// Marker filenames whose presence prunes a directory's whole subtree.
    pub prune_files: Vec<String>,
    /// Exact filenames collected as matches.
    pub include_files: Vec<String>,
    /// Filename suffixes collected as matches.
    pub include_suffixes: Vec<String>,
}

impl CacheParams {
    /// Canonicalize into the form used for scanning and fingerprinting.
    pub(crate) fn normalize(&self) -> ScanParams {
        let mut roots: Vec<PathBuf> = self
            .root_dirs
            .iter()
            .map(|r| paths::resolve(&self.working_directory, r))
            .collect();
        roots.sort();
        roots.dedup();

        ScanParams {
            roots,
            exclude_dirs: self.exclude_dirs.iter().cloned().collect(),
            prune_files: self.prune_files.iter().cloned().collect(),
            include_files: self.include_files.iter().cloned().collect(),
            include_suffixes: self.include_suffixes.iter().cloned().collect(),
        }
    }
}

/// Normalized form of [`CacheParams`]: absolute, cleaned, deduplicated
/// roots and ordered name sets. This is the value embedded in the cache
/// fingerprint, so its serialization must be deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanParams {
    pub roots: Vec<PathBuf>,
    pub exclude_dirs: BTreeSet<String>,
    pub prune_files: BTreeSet<String>,
    pub include_files: BTreeSet<String>,
    pub include_suffixes: BTreeSet<String>,
}

impl ScanParams {
    /// Roots actually walked: nested roots are covered by their outermost
    /// ancestor's walk, and a root whose own basename is excluded indexes
    /// nothing (exclusion wins over root declaration).
    pub(crate) fn scan_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .filter(|root| {
                !self
                    .roots
                    .iter()
                    .any(|other| *root != other && root.starts_with(other))
            })
            .filter(|root| !self.is_excluded_name(root))
            .cloned()
            .collect()
    }

    fn is_excluded_name(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.exclude_dirs.contains(&name.to_string_lossy().into_owned()))
            .unwrap_or(false)
    }

    /// Whether a leaf name satisfies the configured match sets.
    pub(crate) fn matches(&self, name: &str) -> bool {
        self.include_files.contains(name)
            || self
                .include_suffixes
                .iter()
                .any(|suffix| name.ends_with(suffix.as_str()))
    }
}
