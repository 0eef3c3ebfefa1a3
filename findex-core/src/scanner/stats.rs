use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how much filesystem work a scan performed.
///
/// Shared across workers; every counter is monotonic for the lifetime of
/// one scan. The interesting signal is `dirs_reused` vs `dirs_listed`: on a
/// warm, largely-unchanged tree almost everything should be reused.
#[derive(Debug, Default)]
pub struct ScanStats {
    statted: AtomicU64,
    listed: AtomicU64,
    reused: AtomicU64,
    unreadable: AtomicU64,
    dropped: AtomicU64,
}

impl ScanStats {
    pub(crate) fn record_stat(&self) {
        self.statted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_list(&self) {
        self.listed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unreadable(&self) {
        self.unreadable.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Directories statted.
    pub fn dirs_statted(&self) -> u64 {
        self.statted.load(Ordering::Relaxed)
    }

    /// Directories listed (cold path).
    pub fn dirs_listed(&self) -> u64 {
        self.listed.load(Ordering::Relaxed)
    }

    /// Directories reused from the prior tree without listing (warm path).
    pub fn dirs_reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    /// Directories recorded as unreadable leaves.
    pub fn dirs_unreadable(&self) -> u64 {
        self.unreadable.load(Ordering::Relaxed)
    }

    /// Directories dropped because they no longer exist.
    pub fn dirs_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
