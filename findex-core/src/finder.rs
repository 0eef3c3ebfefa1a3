use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::cache::{self, CacheFingerprint};
use crate::config::CacheParams;
use crate::error::{FindexError, Result};
use crate::fs::{FileSystem, FsError};
use crate::paths;
use crate::scanner::{ScanScheduler, ScanStats};
use crate::tree::{DirSnapshot, DirTree};

/// One indexed directory as seen by a [`Finder::find_matching`] selector:
/// the canonical path, the retained child directory names, and the file
/// names that satisfied the configured match sets.
#[derive(Debug)]
pub struct DirEntries<'a> {
    pub path: &'a Path,
    pub dir_names: &'a [String],
    pub file_names: &'a [String],
}

/// What a selector chose for one directory: which files to report and
/// which child directories to descend into.
#[derive(Debug, Default)]
pub struct Selection {
    pub keep: Vec<String>,
    pub descend: Vec<String>,
}

/// The file-discovery index.
///
/// Construction verifies the configured roots, loads a
/// fingerprint-compatible cache if one exists, and runs the scan to
/// completion - queries are impossible until construction returns, and a
/// returned `Finder` is never partial. All query operations are pure reads
/// over the frozen tree: they never touch the filesystem and are safe to
/// call from any number of threads concurrently. Results are canonical
/// absolute paths in lexicographic order.
#[derive(Debug)]
pub struct Finder {
    working_directory: PathBuf,
    scan_roots: Vec<PathBuf>,
    tree: Arc<DirTree>,
    stats: ScanStats,
    db_path: PathBuf,
    dump: Mutex<Option<JoinHandle<()>>>,
}

impl Finder {
    /// Build the index with one worker per available core.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        params: CacheParams,
        db_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_num_threads(fs, params, db_path, 0)
    }

    /// Build the index with an explicit worker count (0 = auto).
    pub fn with_num_threads(
        fs: Arc<dyn FileSystem>,
        params: CacheParams,
        db_path: impl Into<PathBuf>,
        num_threads: usize,
    ) -> Result<Self> {
        let db_path = db_path.into();
        let num_threads = if num_threads == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            num_threads
        };

        let working_directory = paths::clean(&params.working_directory);
        let scan_params = params.normalize();

        // Every declared root must exist up front; a missing root is the
        // one configuration error queries could silently mask.
        for root in &scan_params.roots {
            match fs.stat(root) {
                Ok(_) | Err(FsError::PermissionDenied) => {}
                Err(FsError::NotFound) => return Err(FindexError::RootNotFound(root.clone())),
                Err(FsError::Other(source)) => {
                    return Err(FindexError::Io {
                        path: root.clone(),
                        source,
                    });
                }
            }
        }

        let fingerprint = CacheFingerprint::new(fs.as_ref(), &scan_params);
        let (prior, loaded_bytes) = match cache::load(fs.as_ref(), &db_path, &fingerprint) {
            Ok((tree, bytes)) => {
                debug!(dirs = tree.len(), "loaded usable cache");
                (tree, Some(bytes))
            }
            Err(err) => {
                debug!(error = %err, "no usable cache, scanning cold");
                (DirTree::new(), None)
            }
        };

        let scan_roots = scan_params.scan_roots();
        let stats = ScanStats::default();
        let scheduler = ScanScheduler::new(&scan_params, fs.as_ref(), &prior, &stats, num_threads);
        let tree = Arc::new(scheduler.scan(&scan_roots)?);

        let dump = spawn_db_dump(
            Arc::clone(&fs),
            Arc::clone(&tree),
            db_path.clone(),
            fingerprint,
            loaded_bytes,
        );

        Ok(Self {
            working_directory,
            scan_roots,
            tree,
            stats,
            db_path,
            dump: Mutex::new(Some(dump)),
        })
    }

    /// All matched paths with leaf name `name` at or beneath `root`.
    ///
    /// Queries are answered from the index alone: a `root` that is not a
    /// configured root (or beneath one), or a `name` outside the
    /// configured match sets, returns empty rather than triggering an
    /// on-demand scan. Every searchable location and name must be declared
    /// up front; that is the contract that keeps queries fast.
    pub fn find_named_at(&self, root: impl AsRef<Path>, name: &str) -> Vec<PathBuf> {
        self.find_matching(root, |entries| Selection {
            keep: entries
                .file_names
                .iter()
                .filter(|file| file.as_str() == name)
                .cloned()
                .collect(),
            descend: entries.dir_names.to_vec(),
        })
    }

    /// Generalized query: the selector sees each directory's retained
    /// children and matched files and chooses which files to report and
    /// which children to descend into.
    pub fn find_matching<F>(&self, root: impl AsRef<Path>, selector: F) -> Vec<PathBuf>
    where
        F: Fn(DirEntries<'_>) -> Selection,
    {
        let root = self.resolve(root.as_ref());
        let mut found = Vec::new();
        self.tree.walk(&root, &mut |snapshot: &DirSnapshot| {
            let selection = selector(DirEntries {
                path: &snapshot.path,
                dir_names: &snapshot.child_dirs,
                file_names: &snapshot.matched_files,
            });
            for file in selection.keep {
                if snapshot.matched_files.iter().any(|f| *f == file) {
                    found.push(snapshot.path.join(file));
                }
            }
            selection
                .descend
                .into_iter()
                .filter(|dir| snapshot.child_dirs.iter().any(|d| d == dir))
                .collect()
        });
        found.sort();
        found
    }

    /// The shallowest match per independent branch from each root;
    /// descent down a branch stops at its first match.
    pub fn find_first_named(&self, name: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.scan_roots {
            self.tree.walk(root, &mut |snapshot: &DirSnapshot| {
                if snapshot.matched_files.iter().any(|f| f == name) {
                    found.push(snapshot.path.join(name));
                    Vec::new()
                } else {
                    snapshot.child_dirs.clone()
                }
            });
        }
        found.sort();
        found
    }

    /// Every matched file in the index.
    pub fn find_all(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self
            .tree
            .iter()
            .flat_map(|snapshot| {
                snapshot
                    .matched_files
                    .iter()
                    .map(|name| snapshot.path.join(name))
            })
            .collect();
        found.sort();
        found
    }

    /// Block until the in-flight cache persistence has completed.
    pub fn wait_for_db_dump(&self) {
        let handle = self.dump.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Finalize persistence and release resources. Idempotent, and safe
    /// after `wait_for_db_dump`.
    pub fn shutdown(&self) {
        self.wait_for_db_dump();
    }

    /// Filesystem work counters from the construction scan.
    pub fn scan_stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Where the index is persisted.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        paths::resolve(&self.working_directory, path)
    }
}

impl Drop for Finder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Persist the tree off-thread; construction does not wait for the write.
/// The write is skipped when the serialized form is identical to what the
/// cache file already holds, so downstream consumers keying off the file's
/// hash see it change only when the index changed.
fn spawn_db_dump(
    fs: Arc<dyn FileSystem>,
    tree: Arc<DirTree>,
    db_path: PathBuf,
    fingerprint: CacheFingerprint,
    previous: Option<Vec<u8>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let encoded = match cache::encode(&fingerprint, &tree) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to serialize index, skipping cache write");
                return;
            }
        };
        if previous.as_deref() == Some(encoded.as_slice()) {
            debug!("index unchanged, skipping cache write");
            return;
        }
        match cache::save(fs.as_ref(), &db_path, &encoded) {
            Ok(()) => debug!(path = %db_path.display(), bytes = encoded.len(), "wrote cache"),
            Err(err) => warn!(error = %err, "failed to write cache"),
        }
    })
}
