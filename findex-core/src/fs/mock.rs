use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use super::{DirEntry, EntryKind, FileSystem, FsError, StatInfo};
use crate::paths;

/// In-memory [`FileSystem`] double.
///
/// Modification times come from an explicit logical clock that only moves
/// when [`MockFs::tick`] is called, so tests control exactly which
/// directories look changed. Mutating operations stamp the affected
/// directory (and the parent, for entry creation/removal) with the current
/// clock value the way a real filesystem updates mtimes. Readability,
/// device identity, and arbitrary I/O errors can be overridden per path,
/// and every `stat`/`list_dir` call is recorded so tests can assert that
/// warm scans skip the filesystem.
pub struct MockFs {
    state: Mutex<State>,
}

struct State {
    nodes: HashMap<PathBuf, Node>,
    clock: u64,
    view_id: String,
    device: u64,
    stat_calls: Vec<PathBuf>,
    list_calls: Vec<PathBuf>,
}

struct Node {
    kind: NodeKind,
    mtime: u64,
    device: Option<u64>,
    readable: bool,
    error: Option<io::ErrorKind>,
}

enum NodeKind {
    Dir,
    File(Vec<u8>),
    Symlink(#[allow(dead_code)] PathBuf),
}

impl Node {
    fn new(kind: NodeKind, mtime: u64) -> Self {
        Self {
            kind,
            mtime,
            device: None,
            readable: true,
            error: None,
        }
    }

    fn entry_kind(&self) -> EntryKind {
        match self.kind {
            NodeKind::Dir => EntryKind::Directory,
            NodeKind::File(_) => EntryKind::File,
            NodeKind::Symlink(_) => EntryKind::Symlink,
        }
    }
}

impl Default for MockFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFs {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(PathBuf::from("/"), Node::new(NodeKind::Dir, 0));
        Self {
            state: Mutex::new(State {
                nodes,
                clock: 1,
                view_id: "user@host".to_string(),
                device: 0,
                stat_calls: Vec::new(),
                list_calls: Vec::new(),
            }),
        }
    }

    /// Advance the logical clock by one tick.
    pub fn tick(&self) {
        self.lock().clock += 1;
    }

    /// Current logical time.
    pub fn time(&self) -> u64 {
        self.lock().clock
    }

    pub fn set_view_id(&self, view_id: &str) {
        self.lock().view_id = view_id.to_string();
    }

    pub fn set_device_number(&self, device: u64) {
        self.lock().device = device;
    }

    /// Override the device identity reported for one path.
    pub fn set_device(&self, path: &Path, device: u64) {
        let mut state = self.lock();
        if let Some(node) = state.nodes.get_mut(&paths::clean(path)) {
            node.device = Some(device);
        }
    }

    /// Toggle readability. The change stamps the node with the current
    /// clock, the way tests expect a permission change to be observable.
    pub fn set_readable(&self, path: &Path, readable: bool) {
        let mut state = self.lock();
        let clock = state.clock;
        if let Some(node) = state.nodes.get_mut(&paths::clean(path)) {
            node.readable = readable;
            node.mtime = clock;
        }
    }

    /// Inject an error returned by every subsequent stat/list/read of
    /// `path`. The kind goes through normal error classification, so
    /// `PermissionDenied`/`NotFound` behave like the real condition and
    /// anything else is an unclassified (fatal) failure.
    pub fn set_error(&self, path: &Path, kind: io::ErrorKind) {
        let mut state = self.lock();
        if let Some(node) = state.nodes.get_mut(&paths::clean(path)) {
            node.error = Some(kind);
        }
    }

    pub fn mkdirs(&self, path: &Path) {
        let mut state = self.lock();
        state.ensure_dirs(&paths::clean(path));
    }

    /// Create a file (and any missing parent directories), overwriting any
    /// existing file at that path.
    pub fn create_file(&self, path: &Path, contents: &[u8]) {
        let mut state = self.lock();
        state.insert(&paths::clean(path), NodeKind::File(contents.to_vec()));
    }

    /// Create a symlink entry. The target is recorded but never resolved;
    /// it does not need to exist.
    pub fn symlink(&self, path: &Path, target: &Path) {
        let mut state = self.lock();
        state.insert(&paths::clean(path), NodeKind::Symlink(target.to_path_buf()));
    }

    /// Remove a path and everything beneath it.
    pub fn remove_all(&self, path: &Path) {
        let mut state = self.lock();
        let path = paths::clean(path);
        state.nodes.retain(|key, _| !key.starts_with(&path));
        state.touch_parent(&path);
    }

    /// Move a subtree. The moved node itself is stamped with the current
    /// clock; nodes beneath it keep their mtimes, and both parents are
    /// stamped.
    pub fn rename(&self, from: &Path, to: &Path) {
        let mut state = self.lock();
        let from = paths::clean(from);
        let to = paths::clean(to);
        let clock = state.clock;

        let moved: Vec<(PathBuf, Node)> = {
            let keys: Vec<PathBuf> = state
                .nodes
                .keys()
                .filter(|key| key.starts_with(&from))
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|key| state.nodes.remove(&key).map(|node| (key, node)))
                .collect()
        };
        for (key, mut node) in moved {
            let new_key = if key == from {
                node.mtime = clock;
                to.clone()
            } else {
                to.join(key.strip_prefix(&from).unwrap_or(&key))
            };
            state.nodes.insert(new_key, node);
        }
        state.touch_parent(&from);
        state.touch_parent(&to);
    }

    /// Paths passed to `stat` so far, in call order.
    pub fn stat_calls(&self) -> Vec<PathBuf> {
        self.lock().stat_calls.clone()
    }

    /// Paths passed to `list_dir` so far, in call order.
    pub fn list_calls(&self) -> Vec<PathBuf> {
        self.lock().list_calls.clone()
    }

    pub fn clear_metrics(&self) {
        let mut state = self.lock();
        state.stat_calls.clear();
        state.list_calls.clear();
    }

    /// Logical mtime of a node, without recording a stat call.
    pub fn mtime_of(&self, path: &Path) -> Option<u64> {
        self.lock().nodes.get(&paths::clean(path)).map(|n| n.mtime)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn ensure_dirs(&mut self, path: &Path) {
        let mut ancestors: Vec<&Path> = path.ancestors().collect();
        ancestors.reverse();
        for dir in ancestors {
            if !self.nodes.contains_key(dir) {
                let clock = self.clock;
                self.nodes.insert(dir.to_path_buf(), Node::new(NodeKind::Dir, clock));
                self.touch_parent(dir);
            }
        }
    }

    fn insert(&mut self, path: &Path, kind: NodeKind) {
        if let Some(parent) = path.parent() {
            self.ensure_dirs(parent);
        }
        let clock = self.clock;
        let is_new = !self.nodes.contains_key(path);
        self.nodes.insert(path.to_path_buf(), Node::new(kind, clock));
        if is_new {
            self.touch_parent(path);
        }
    }

    fn touch_parent(&mut self, path: &Path) {
        let clock = self.clock;
        if let Some(parent) = path.parent()
            && let Some(node) = self.nodes.get_mut(parent)
        {
            node.mtime = clock;
        }
    }

    fn checked(&self, path: &Path) -> Result<&Node, FsError> {
        let node = self.nodes.get(path).ok_or(FsError::NotFound)?;
        if let Some(kind) = node.error {
            return Err(FsError::from(io::Error::new(kind, "injected error")));
        }
        if !node.readable {
            return Err(FsError::PermissionDenied);
        }
        Ok(node)
    }
}

fn mock_time(clock: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(clock)
}

impl FileSystem for MockFs {
    fn stat(&self, path: &Path) -> Result<StatInfo, FsError> {
        let mut state = self.lock();
        let path = paths::clean(path);
        state.stat_calls.push(path.clone());
        let default_device = state.device;
        let node = state.checked(&path)?;
        Ok(StatInfo {
            mtime: mock_time(node.mtime),
            device: node.device.unwrap_or(default_device),
        })
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let mut state = self.lock();
        let path = paths::clean(path);
        state.list_calls.push(path.clone());
        let node = state.checked(&path)?;
        if !matches!(node.kind, NodeKind::Dir) {
            return Err(FsError::Other(io::Error::new(
                io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }
        let entries = state
            .nodes
            .iter()
            .filter(|(key, _)| key.parent() == Some(&path) && **key != path)
            .map(|(key, node)| DirEntry {
                name: key
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                kind: node.entry_kind(),
            })
            .collect();
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let state = self.lock();
        let node = state.checked(&paths::clean(path))?;
        match &node.kind {
            NodeKind::File(data) => Ok(data.clone()),
            _ => Err(FsError::Other(io::Error::new(
                io::ErrorKind::IsADirectory,
                "not a file",
            ))),
        }
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut state = self.lock();
        state.insert(&paths::clean(path), NodeKind::File(data.to_vec()));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.lock();
        let path = paths::clean(path);
        match state.nodes.remove(&path) {
            Some(_) => {
                state.touch_parent(&path);
                Ok(())
            }
            None => Err(FsError::NotFound),
        }
    }

    fn view_id(&self) -> String {
        self.lock().view_id.clone()
    }

    fn device_number(&self) -> u64 {
        self.lock().device
    }
}
