//! Size progress reporting.

use std::time::{Duration, Instant};

use crate::cache::{DirSize, SizeCache};

/// Partial progress of a size computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeProgress {
    /// Bytes counted so far.
    pub bytes: u64,
    /// Number of files counted so far.
    pub files_scanned: u64,
    /// Number of directories entered so far.
    pub dirs_scanned: u64,
    /// Entries that could not be read.
    pub skipped: u64,
    /// Directories answered from the size cache instead of walked.
    pub cache_hits: u64,
    /// Time elapsed since the computation started.
    pub elapsed: Duration,
}

impl SizeProgress {
    /// Get total items visited (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }

    /// Calculate walk rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Final result of a completed size computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeTotal {
    /// Total bytes of every file covered by the selection.
    pub bytes: u64,
    /// Number of files counted.
    pub files: u64,
    /// Number of directories walked.
    pub dirs: u64,
    /// Entries that could not be read.
    pub skipped: u64,
    /// Directories answered from the size cache.
    pub cache_hits: u64,
    /// Wall time of the computation.
    pub elapsed: Duration,
    /// Directories fully walked by this computation.
    pub walked: SizeCache,
}

impl From<SizeProgress> for SizeTotal {
    fn from(progress: SizeProgress) -> Self {
        Self {
            bytes: progress.bytes,
            files: progress.files_scanned,
            dirs: progress.dirs_scanned,
            skipped: progress.skipped,
            cache_hits: progress.cache_hits,
            elapsed: progress.elapsed,
            walked: SizeCache::default(),
        }
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    bytes: u64,
    files_scanned: u64,
    dirs_scanned: u64,
    skipped: u64,
    cache_hits: u64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            bytes: 0,
            files_scanned: 0,
            dirs_scanned: 0,
            skipped: 0,
            cache_hits: 0,
        }
    }

    pub fn record_file(&mut self, size: u64) {
        self.files_scanned += 1;
        self.bytes += size;
    }

    /// Record an entered directory, returning the new directory count.
    pub fn record_dir(&mut self) -> u64 {
        self.dirs_scanned += 1;
        self.dirs_scanned
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Count a directory whose size came from the cache.
    pub fn record_cached(&mut self, size: DirSize) {
        self.cache_hits += 1;
        self.bytes += size.bytes;
    }

    pub fn snapshot(&self) -> SizeProgress {
        SizeProgress {
            bytes: self.bytes,
            files_scanned: self.files_scanned,
            dirs_scanned: self.dirs_scanned,
            skipped: self.skipped,
            cache_hits: self.cache_hits,
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_snapshot() {
        let mut tracker = ProgressTracker::new();
        tracker.record_file(10);
        tracker.record_file(20);
        assert_eq!(tracker.record_dir(), 1);
        tracker.record_skip();
        tracker.record_cached(DirSize { bytes: 5, files: 2 });

        let progress = tracker.snapshot();
        assert_eq!(progress.bytes, 35);
        assert_eq!(progress.files_scanned, 2);
        assert_eq!(progress.cache_hits, 1);
        assert_eq!(progress.total_items(), 3);
        assert_eq!(progress.skipped, 1);

        let total = SizeTotal::from(progress);
        assert_eq!(total.bytes, 35);
        assert_eq!(total.dirs, 1);
        assert!(total.walked.is_empty());
    }
}
