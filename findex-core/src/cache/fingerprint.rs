use serde::{Deserialize, Serialize};

use crate::config::ScanParams;
use crate::fs::FileSystem;

/// Identity of a persisted index.
///
/// A cache file is only trusted when the fingerprint stored in its header
/// equals the fingerprint of the current run: same normalized parameters,
/// same `user@host` view, same device. Anything else (a cache copied to
/// another machine, a changed root set, a remounted tree) reads as "no
/// usable cache" and forces a cold scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheFingerprint {
    pub view_id: String,
    pub device: u64,
    pub params: ScanParams,
}

impl CacheFingerprint {
    pub(crate) fn new(fs: &dyn FileSystem, params: &ScanParams) -> Self {
        Self {
            view_id: fs.view_id(),
            device: fs.device_number(),
            params: params.clone(),
        }
    }
}
