//! Cancellable size aggregation over a selection.

use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jwalk::{Parallelism, WalkDir};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use mansel_core::{SelectConfig, SelectionSet};

use crate::cache::{DirSize, DirSizeAccumulator, SizeCache};
use crate::error::SizeError;
use crate::progress::{ProgressTracker, SizeProgress, SizeTotal};

/// Capacity of the per-computation event channel.
pub const SIZE_CHANNEL_SIZE: usize = 100;

/// Identifies one selection snapshot; newer snapshots have larger values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event streamed from a running computation.
#[derive(Debug)]
pub enum SizeEvent {
    /// Partial total while the walk is running.
    Progress {
        generation: Generation,
        progress: SizeProgress,
    },
    /// The walk finished. Sent at most once, never after cancellation.
    Done {
        generation: Generation,
        total: SizeTotal,
    },
    /// The walk could not run.
    Failed {
        generation: Generation,
        error: SizeError,
    },
}

impl SizeEvent {
    /// Generation this event belongs to.
    pub fn generation(&self) -> Generation {
        match self {
            Self::Progress { generation, .. }
            | Self::Done { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Result of [`SizeAggregator::walk_total`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every selected path was visited.
    Completed(SizeTotal),
    /// The cancel token fired; carries the partial progress.
    Cancelled(SizeProgress),
}

/// Sums file sizes beneath a selection using jwalk.
#[derive(Debug, Clone)]
pub struct SizeAggregator {
    config: SelectConfig,
}

impl SizeAggregator {
    /// Create an aggregator for the given root and walk settings.
    pub fn new(config: SelectConfig) -> Self {
        Self { config }
    }

    /// Configuration this aggregator walks with.
    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    /// Start a background computation for `selection`.
    ///
    /// Events arrive on the returned receiver. Directories found in `cache`
    /// are not walked again, and the `Done` total carries the directories
    /// this computation walked. The walk runs on tokio's blocking pool, so
    /// this must be called from within a runtime. Dropping the receiver
    /// stops the walk at its next progress report.
    pub fn compute_total(
        &self,
        selection: SelectionSet,
        generation: Generation,
        cache: SizeCache,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<SizeEvent> {
        let (tx, rx) = mpsc::channel(SIZE_CHANNEL_SIZE);
        let aggregator = self.clone();
        let worker_tx = tx.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let walk_cancel = cancel.child_token();
            let progress_cancel = walk_cancel.clone();
            let outcome = aggregator.walk_total(&selection, &cache, &walk_cancel, |progress| {
                let event = SizeEvent::Progress {
                    generation,
                    progress: progress.clone(),
                };
                if worker_tx.blocking_send(event).is_err() {
                    progress_cancel.cancel();
                }
            });

            match outcome {
                Ok(WalkOutcome::Completed(total)) => {
                    debug!(
                        %generation,
                        bytes = total.bytes,
                        skipped = total.skipped,
                        cache_hits = total.cache_hits,
                        "size walk done"
                    );
                    let _ = worker_tx.blocking_send(SizeEvent::Done { generation, total });
                }
                Ok(WalkOutcome::Cancelled(progress)) => {
                    debug!(%generation, dirs = progress.dirs_scanned, "size walk cancelled");
                }
                Err(error) => {
                    debug!(%generation, %error, "size walk failed");
                    let _ = worker_tx.blocking_send(SizeEvent::Failed { generation, error });
                }
            }
        });

        tokio::spawn(async move {
            if let Err(err) = handle.await {
                let error = SizeError::Worker {
                    message: err.to_string(),
                };
                let _ = tx.send(SizeEvent::Failed { generation, error }).await;
            }
        });

        rx
    }

    /// Walk every path in `selection` and sum file sizes.
    ///
    /// `cancel` is checked before each selected path and at every entry the
    /// walk yields; once it fires, directories that are read afterwards are
    /// pruned. Entries that cannot be read are counted as skipped. Selected
    /// directories and subdirectories present in `cache` contribute their
    /// cached size without being read.
    pub fn walk_total<P>(
        &self,
        selection: &SelectionSet,
        cache: &SizeCache,
        cancel: &CancellationToken,
        mut on_progress: P,
    ) -> Result<WalkOutcome, SizeError>
    where
        P: FnMut(&SizeProgress),
    {
        let root = &self.config.root;
        std::fs::metadata(root).map_err(|e| SizeError::io(root, e))?;

        let mut tracker = ProgressTracker::new();
        let mut walked = SizeCache::new();
        for relative in selection.iter() {
            if cancel.is_cancelled() {
                return Ok(WalkOutcome::Cancelled(tracker.snapshot()));
            }

            let path = resolve(root, relative);
            let metadata = match self.stat(&path) {
                Ok(m) => m,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Err(SizeError::RootMissing { path });
                }
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping unreadable selection");
                    tracker.record_skip();
                    continue;
                }
            };

            if metadata.is_dir() {
                if let Some(size) = cache.get(relative) {
                    tracker.record_cached(size);
                    continue;
                }
                let mut sizes = DirSizeAccumulator::default();
                if !self.walk_dir(&path, cache, cancel, &mut tracker, &mut sizes, &mut on_progress) {
                    return Ok(WalkOutcome::Cancelled(tracker.snapshot()));
                }
                sizes.commit(&mut walked);
            } else if metadata.is_file() {
                tracker.record_file(metadata.len());
            }
        }

        let mut total = SizeTotal::from(tracker.snapshot());
        total.walked = walked;
        Ok(WalkOutcome::Completed(total))
    }

    fn stat(&self, path: &Path) -> std::io::Result<Metadata> {
        if self.config.follow_symlinks {
            std::fs::metadata(path)
        } else {
            std::fs::symlink_metadata(path)
        }
    }

    /// Walk one selected directory. Returns false if cancelled.
    fn walk_dir<P>(
        &self,
        dir: &Path,
        cache: &SizeCache,
        cancel: &CancellationToken,
        tracker: &mut ProgressTracker,
        sizes: &mut DirSizeAccumulator,
        on_progress: &mut P,
    ) -> bool
    where
        P: FnMut(&SizeProgress),
    {
        let parallelism = match self.config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let root = self.config.root.clone();
        let top = relative_to(&root, dir);
        let prune = cancel.clone();
        let cached = cache.clone();
        let walker = WalkDir::new(dir)
            .parallelism(parallelism)
            .skip_hidden(!self.config.include_hidden)
            .follow_links(self.config.follow_symlinks)
            .process_read_dir(move |_, _, _, children| {
                if prune.is_cancelled() {
                    children.clear();
                    return;
                }
                // Cached subdirectories are yielded but not read
                for entry in children.iter_mut().flatten() {
                    if entry.file_type().is_dir()
                        && cached.contains(relative_to(&root, &entry.path()))
                    {
                        entry.read_children_path = None;
                    }
                }
            });

        let interval = self.config.progress_interval.max(1);
        for entry_result in walker {
            if cancel.is_cancelled() {
                return false;
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry");
                    tracker.record_skip();
                    sizes.mark_incomplete();
                    continue;
                }
            };
            if entry.read_children_error.is_some() {
                sizes.mark_incomplete();
            }

            let path = entry.path();
            let relative = relative_to(&self.config.root, &path);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                let cached_size = match entry.depth() {
                    0 => None,
                    _ => cache.get(&relative),
                };
                if let Some(size) = cached_size {
                    tracker.record_cached(size);
                    sizes.credit(&relative, &top, size);
                    continue;
                }
                sizes.enter(&relative);
                if tracker.record_dir() % interval == 0 {
                    on_progress(&tracker.snapshot());
                }
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(metadata) => {
                        tracker.record_file(metadata.len());
                        sizes.credit(&relative, &top, DirSize::file(metadata.len()));
                    }
                    Err(err) => {
                        debug!(path = %path.display(), error = %err, "skipping file");
                        tracker.record_skip();
                        sizes.mark_incomplete();
                    }
                }
            }
        }

        !cancel.is_cancelled()
    }
}

/// Path of `path` relative to `root`, `""` for the root itself.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Join a root-relative selection path onto the root.
fn resolve(root: &Path, relative: &Path) -> PathBuf {
    if relative == Path::new(".") {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir_all(root.join("a/nested")).unwrap();
        fs::write(root.join("a/x"), vec![0u8; 10]).unwrap();
        fs::write(root.join("a/nested/y"), vec![0u8; 20]).unwrap();
        fs::write(root.join("b"), vec![0u8; 5]).unwrap();
        fs::write(root.join(".hidden"), vec![0u8; 100]).unwrap();

        temp
    }

    fn selection(paths: &[&str]) -> SelectionSet {
        SelectionSet::from_paths(paths.iter().map(PathBuf::from).collect())
    }

    fn total(outcome: WalkOutcome) -> SizeTotal {
        match outcome {
            WalkOutcome::Completed(total) => total,
            WalkOutcome::Cancelled(_) => panic!("walk was cancelled"),
        }
    }

    #[test]
    fn test_walk_files_and_dirs() {
        let temp = create_test_tree();
        let aggregator = SizeAggregator::new(SelectConfig::new(temp.path()));
        let cancel = CancellationToken::new();

        let outcome = aggregator
            .walk_total(&selection(&["a", "b"]), &SizeCache::new(), &cancel, |_| {})
            .unwrap();
        let total = total(outcome);
        assert_eq!(total.bytes, 35);
        assert_eq!(total.files, 3);
        assert_eq!(total.skipped, 0);
    }

    #[test]
    fn test_walk_empty_selection() {
        let temp = create_test_tree();
        let aggregator = SizeAggregator::new(SelectConfig::new(temp.path()));
        let outcome = aggregator
            .walk_total(&SelectionSet::new(), &SizeCache::new(), &CancellationToken::new(), |_| {})
            .unwrap();
        assert_eq!(total(outcome).bytes, 0);
    }

    #[test]
    fn test_walk_root_respects_hidden() {
        let temp = create_test_tree();
        let mut config = SelectConfig::new(temp.path());
        let cancel = CancellationToken::new();

        let all = SizeAggregator::new(config.clone())
            .walk_total(&selection(&["."]), &SizeCache::new(), &cancel, |_| {})
            .unwrap();
        assert_eq!(total(all).bytes, 135);

        config.include_hidden = false;
        let visible = SizeAggregator::new(config)
            .walk_total(&selection(&["."]), &SizeCache::new(), &cancel, |_| {})
            .unwrap();
        assert_eq!(total(visible).bytes, 35);
    }

    #[test]
    fn test_missing_selection_is_terminal() {
        let temp = create_test_tree();
        let aggregator = SizeAggregator::new(SelectConfig::new(temp.path()));
        let result = aggregator.walk_total(
            &selection(&["gone"]),
            &SizeCache::new(),
            &CancellationToken::new(),
            |_| {},
        );
        assert!(matches!(result, Err(SizeError::RootMissing { .. })));
    }

    #[test]
    fn test_pre_cancelled_walk() {
        let temp = create_test_tree();
        let aggregator = SizeAggregator::new(SelectConfig::new(temp.path()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = aggregator
            .walk_total(&selection(&["a"]), &SizeCache::new(), &cancel, |_| {})
            .unwrap();
        assert!(matches!(
            outcome,
            WalkOutcome::Cancelled(ref p) if p.bytes == 0 && p.dirs_scanned == 0
        ));
    }

    #[test]
    fn test_generation_ordering() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next(), Generation(2));
        assert_eq!(Generation(3).to_string(), "#3");
    }
}
