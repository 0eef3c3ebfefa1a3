mod snapshot;

pub use snapshot::DirSnapshot;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The index: scanned directories keyed by canonical path.
///
/// Mutated only while a scan assembles it; frozen afterwards, at which
/// point shared references can be read from any number of threads.
#[derive(Debug, Default)]
pub struct DirTree {
    dirs: HashMap<PathBuf, DirSnapshot>,
}

impl DirTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = DirSnapshot>) -> Self {
        let mut tree = Self::new();
        for snapshot in snapshots {
            tree.insert(snapshot);
        }
        tree
    }

    pub fn insert(&mut self, snapshot: DirSnapshot) {
        self.dirs.insert(snapshot.path.clone(), snapshot);
    }

    pub fn get(&self, path: &Path) -> Option<&DirSnapshot> {
        self.dirs.get(path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirSnapshot> {
        self.dirs.values()
    }

    /// Snapshots in lexicographic path order, the serialization order.
    pub fn sorted_snapshots(&self) -> Vec<&DirSnapshot> {
        let mut snapshots: Vec<&DirSnapshot> = self.dirs.values().collect();
        snapshots.sort_by(|a, b| a.path.cmp(&b.path));
        snapshots
    }

    /// Depth-first walk from `root`. The visitor returns the child names to
    /// descend into; returning an empty list stops that branch. A `root`
    /// not present in the tree visits nothing.
    pub fn walk<F>(&self, root: &Path, visit: &mut F)
    where
        F: FnMut(&DirSnapshot) -> Vec<String>,
    {
        let Some(snapshot) = self.dirs.get(root) else {
            return;
        };
        for child in visit(snapshot) {
            self.walk(&root.join(child), visit);
        }
    }
}
