use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use super::stats::ScanStats;
use crate::config::ScanParams;
use crate::error::{FindexError, Result};
use crate::fs::{EntryKind, FileSystem, FsError};
use crate::tree::{DirSnapshot, DirTree};

/// A unit of work for the pool: scan one directory, or shut down.
enum Task {
    Dir(PathBuf),
    Done,
}

/// What scanning one directory produced.
enum DirOutcome {
    /// Snapshot to keep, plus child directories to enqueue.
    Keep(DirSnapshot, Vec<PathBuf>),
    /// Path no longer exists; neither it nor its former subtree is kept.
    Dropped,
}

/// The incremental walking algorithm.
///
/// A fixed pool of workers consumes a self-replenishing queue of
/// per-directory tasks; each completed directory enqueues tasks for its
/// retained children. Every directory is always statted (staleness is only
/// detectable that way); an unchanged directory reuses its prior child and
/// match lists without the more expensive listing call. A shared
/// in-flight counter covering both queued and running tasks detects when
/// the whole multi-root scan has finished; the worker that observes it hit
/// zero broadcasts shutdown sentinels to the rest of the pool.
///
/// Each path is claimed by exactly one task (roots are deduplicated by the
/// caller), so workers never contend on per-path state - completed
/// snapshots flow over a channel and are assembled into the tree at the
/// end. The first unclassified filesystem error aborts the scan: an abort
/// flag makes the remaining tasks drain without touching the filesystem,
/// and the error surfaces to the caller.
pub struct ScanScheduler<'a> {
    params: &'a ScanParams,
    fs: &'a dyn FileSystem,
    prior: &'a DirTree,
    stats: &'a ScanStats,
    num_threads: usize,
}

impl<'a> ScanScheduler<'a> {
    pub fn new(
        params: &'a ScanParams,
        fs: &'a dyn FileSystem,
        prior: &'a DirTree,
        stats: &'a ScanStats,
        num_threads: usize,
    ) -> Self {
        Self {
            params,
            fs,
            prior,
            stats,
            num_threads: num_threads.max(1),
        }
    }

    /// Walk all `roots` and build the new tree. `roots` must already be
    /// deduplicated so no path is reachable from two of them.
    pub fn scan(&self, roots: &[PathBuf]) -> Result<DirTree> {
        if roots.is_empty() {
            return Ok(DirTree::new());
        }

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<Task>();
        let (snapshot_tx, snapshot_rx) = crossbeam_channel::unbounded::<DirSnapshot>();
        let pending = AtomicUsize::new(roots.len());
        let aborted = AtomicBool::new(false);
        let failure: Mutex<Option<FindexError>> = Mutex::new(None);

        for root in roots {
            let _ = task_tx.send(Task::Dir(root.clone()));
        }

        thread::scope(|scope| {
            for _ in 0..self.num_threads {
                let worker = Worker {
                    scheduler: self,
                    task_tx: task_tx.clone(),
                    task_rx: task_rx.clone(),
                    snapshot_tx: snapshot_tx.clone(),
                    pending: &pending,
                    aborted: &aborted,
                    failure: &failure,
                };
                scope.spawn(move || worker.run());
            }
        });

        if let Ok(mut guard) = failure.lock()
            && let Some(err) = guard.take()
        {
            return Err(err);
        }

        drop(snapshot_tx);
        let tree = DirTree::from_snapshots(snapshot_rx.try_iter());
        debug!(
            dirs = tree.len(),
            statted = self.stats.dirs_statted(),
            listed = self.stats.dirs_listed(),
            reused = self.stats.dirs_reused(),
            unreadable = self.stats.dirs_unreadable(),
            dropped = self.stats.dirs_dropped(),
            "scan complete"
        );
        Ok(tree)
    }
}

struct Worker<'a, 'b> {
    scheduler: &'b ScanScheduler<'a>,
    task_tx: Sender<Task>,
    task_rx: Receiver<Task>,
    snapshot_tx: Sender<DirSnapshot>,
    pending: &'b AtomicUsize,
    aborted: &'b AtomicBool,
    failure: &'b Mutex<Option<FindexError>>,
}

impl Worker<'_, '_> {
    fn run(&self) {
        while let Ok(task) = self.task_rx.recv() {
            let path = match task {
                Task::Done => break,
                Task::Dir(path) => path,
            };

            if !self.aborted.load(Ordering::SeqCst) {
                self.process(&path);
            }

            // Last task out broadcasts shutdown to the whole pool.
            if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                for _ in 0..self.scheduler.num_threads {
                    let _ = self.task_tx.send(Task::Done);
                }
            }
        }
    }

    fn process(&self, path: &Path) {
        match self.scan_dir(path) {
            Ok(DirOutcome::Keep(snapshot, children)) => {
                if !children.is_empty() {
                    self.pending.fetch_add(children.len(), Ordering::SeqCst);
                    for child in children {
                        let _ = self.task_tx.send(Task::Dir(child));
                    }
                }
                let _ = self.snapshot_tx.send(snapshot);
            }
            Ok(DirOutcome::Dropped) => {}
            Err(err) => {
                self.aborted.store(true, Ordering::SeqCst);
                if let Ok(mut guard) = self.failure.lock()
                    && guard.is_none()
                {
                    *guard = Some(err);
                }
            }
        }
    }

    fn scan_dir(&self, path: &Path) -> Result<DirOutcome> {
        let scheduler = self.scheduler;

        scheduler.stats.record_stat();
        let info = match scheduler.fs.stat(path) {
            Ok(info) => info,
            Err(FsError::NotFound) => {
                scheduler.stats.record_dropped();
                return Ok(DirOutcome::Dropped);
            }
            Err(FsError::PermissionDenied) => {
                scheduler.stats.record_unreadable();
                return Ok(DirOutcome::Keep(
                    DirSnapshot::unreadable(path.to_path_buf()),
                    Vec::new(),
                ));
            }
            Err(FsError::Other(source)) => {
                return Err(FindexError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        // Warm path: an unchanged directory keeps its cached child and
        // match lists and is never listed.
        if let Some(prior) = scheduler.prior.get(path)
            && prior.readable
            && prior.mtime == Some(info.mtime)
            && prior.device == info.device
        {
            scheduler.stats.record_reused();
            let children = child_paths(path, &prior.child_dirs);
            return Ok(DirOutcome::Keep(prior.clone(), children));
        }

        let entries = match scheduler.fs.list_dir(path) {
            Ok(entries) => entries,
            Err(FsError::NotFound) => {
                scheduler.stats.record_dropped();
                return Ok(DirOutcome::Dropped);
            }
            Err(FsError::PermissionDenied) => {
                scheduler.stats.record_unreadable();
                return Ok(DirOutcome::Keep(
                    DirSnapshot::unreadable(path.to_path_buf()),
                    Vec::new(),
                ));
            }
            Err(FsError::Other(source)) => {
                return Err(FindexError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        scheduler.stats.record_list();

        let mut snapshot = DirSnapshot::new(path.to_path_buf(), info.mtime, info.device);
        for entry in &entries {
            match entry.kind {
                EntryKind::Directory => {
                    if !scheduler.params.exclude_dirs.contains(&entry.name) {
                        snapshot.child_dirs.push(entry.name.clone());
                    }
                }
                // Symlinks count as plain names: matched by their own name,
                // never followed, never recursed into.
                EntryKind::File | EntryKind::Symlink => {
                    if scheduler.params.prune_files.contains(&entry.name) {
                        // Marker file: the whole subtree is cut, including
                        // this directory's own matches.
                        snapshot.child_dirs.clear();
                        snapshot.matched_files.clear();
                        return Ok(DirOutcome::Keep(snapshot, Vec::new()));
                    }
                    if scheduler.params.matches(&entry.name) {
                        snapshot.matched_files.push(entry.name.clone());
                    }
                }
            }
        }
        snapshot.child_dirs.sort();
        snapshot.matched_files.sort();

        let children = child_paths(path, &snapshot.child_dirs);
        Ok(DirOutcome::Keep(snapshot, children))
    }
}

fn child_paths(path: &Path, names: &[String]) -> Vec<PathBuf> {
    names.iter().map(|name| path.join(name)).collect()
}
