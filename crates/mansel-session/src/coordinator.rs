//! Generation-based coordination of tree mutations and size computations.

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mansel_core::{
    FileSystem, LocalFileSystem, NodeId, PreselectReport, SelectError, SelectionSet,
    SelectionTree,
};
use mansel_scan::{Generation, SizeAggregator, SizeCache, SizeEvent};

use crate::status::{StatusEvent, TotalDisplay};

/// Capacity of the status broadcast channel.
pub const STATUS_CHANNEL_SIZE: usize = 100;

/// Lifecycle of the selection total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Nothing has been computed yet.
    Idle,
    /// A computation for this generation is running.
    Calculating(Generation),
    /// The total for this generation is final.
    Settled {
        generation: Generation,
        total: u64,
        skipped: u64,
    },
    /// The computation for this generation failed.
    Unavailable {
        generation: Generation,
        /// Last settled total, if any, shown as stale.
        stale_total: Option<u64>,
        message: String,
    },
    /// The session is over; no further results are applied.
    Closed,
}

impl CoordinatorState {
    /// Whether the total on screen is final.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

/// Phase of an in-flight computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationPhase {
    /// Computing the current generation.
    Calculating,
    /// Superseded and cancelled, waiting for its stream to end.
    Stale,
}

/// Message relayed from a computation's forwarding task.
#[derive(Debug)]
pub enum WorkerMessage {
    /// An event from the computation.
    Event(SizeEvent),
    /// The computation's stream ended.
    Ended(Generation),
}

#[derive(Debug)]
struct Computation {
    generation: Generation,
    cancel: CancellationToken,
    phase: ComputationPhase,
}

/// Owns the selection tree and keeps the selection total up to date.
///
/// All tree mutations go through the coordinator. Whenever one changes the
/// [`SelectionSet`], the running computation is cancelled and a new one is
/// started under the next [`Generation`]. Worker results are relayed through
/// [`recv_update`](Self::recv_update) and applied by
/// [`handle_update`](Self::handle_update) only if they carry the current
/// generation.
pub struct Coordinator<F: FileSystem = LocalFileSystem> {
    tree: SelectionTree<F>,
    aggregator: SizeAggregator,
    state: CoordinatorState,
    generation: Generation,
    selection: SelectionSet,
    in_flight: Vec<Computation>,
    display: TotalDisplay,
    last_settled: Option<u64>,
    cache: SizeCache,
    updates_tx: mpsc::UnboundedSender<WorkerMessage>,
    updates_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    status_tx: broadcast::Sender<StatusEvent>,
}

impl<F: FileSystem> Coordinator<F> {
    /// Take ownership of `tree` and compute its current selection.
    ///
    /// The first computation runs as generation 0. Must be called from
    /// within a tokio runtime.
    pub fn start(tree: SelectionTree<F>) -> Self {
        let aggregator = SizeAggregator::new(tree.config().clone());
        let selection = tree.selection_set();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_SIZE);

        let mut coordinator = Self {
            tree,
            aggregator,
            state: CoordinatorState::Idle,
            generation: Generation::default(),
            selection,
            in_flight: Vec::new(),
            display: TotalDisplay {
                calculating: true,
                ..TotalDisplay::default()
            },
            last_settled: None,
            cache: SizeCache::new(),
            updates_tx,
            updates_rx,
            status_tx,
        };
        coordinator.launch();
        coordinator
    }

    /// Subscribe to status events.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// The selection tree.
    pub fn tree(&self) -> &SelectionTree<F> {
        &self.tree
    }

    /// Current state.
    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    /// Current generation.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Selection the current generation is computing.
    pub fn selection_set(&self) -> &SelectionSet {
        &self.selection
    }

    /// Total to show on the status line.
    pub fn display_total(&self) -> TotalDisplay {
        self.display
    }

    /// Directory sizes collected by settled computations.
    pub fn size_cache(&self) -> &SizeCache {
        &self.cache
    }

    /// Computations that have not finished draining.
    pub fn in_flight(&self) -> Vec<(Generation, ComputationPhase)> {
        self.in_flight
            .iter()
            .map(|c| (c.generation, c.phase))
            .collect()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state == CoordinatorState::Closed
    }

    /// Materialize a directory's children.
    ///
    /// Expansion never changes which files are covered, so no computation is
    /// started. The selection is refreshed because a checked root is written
    /// as its children once they are listed.
    pub fn expand(&mut self, id: NodeId) -> Result<(), SelectError> {
        let result = self.tree.expand(id);
        self.selection = self.tree.selection_set();
        result
    }

    /// Size of a file node.
    pub fn file_size(&mut self, id: NodeId) -> Option<u64> {
        self.tree.file_size(id)
    }

    /// Check or uncheck a node.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), SelectError> {
        let selection = self.tree.set_checked(id, checked)?;
        self.publish(StatusEvent::CheckStateChanged(id));
        self.apply_selection(selection);
        Ok(())
    }

    /// Flip a node's checkbox.
    pub fn toggle(&mut self, id: NodeId) -> Result<(), SelectError> {
        let selection = self.tree.toggle(id)?;
        self.publish(StatusEvent::CheckStateChanged(id));
        self.apply_selection(selection);
        Ok(())
    }

    /// Check every named path; see [`SelectionTree::preselect`].
    pub fn preselect<I, S>(&mut self, paths: I) -> PreselectReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let report = self.tree.preselect(paths);
        for &id in &report.applied {
            self.publish(StatusEvent::CheckStateChanged(id));
        }
        let selection = self.tree.selection_set();
        self.apply_selection(selection);
        report
    }

    fn apply_selection(&mut self, selection: SelectionSet) {
        if self.is_closed() || selection == self.selection {
            return;
        }
        self.selection = selection;

        for computation in &mut self.in_flight {
            if computation.phase == ComputationPhase::Calculating {
                computation.cancel.cancel();
                computation.phase = ComputationPhase::Stale;
            }
        }
        self.generation = self.generation.next();
        self.launch();
    }

    fn launch(&mut self) {
        let generation = self.generation;
        let cancel = CancellationToken::new();
        let mut events = self.aggregator.compute_total(
            self.selection.clone(),
            generation,
            self.cache.clone(),
            cancel.clone(),
        );

        let tx = self.updates_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if tx.send(WorkerMessage::Event(event)).is_err() {
                    return;
                }
            }
            let _ = tx.send(WorkerMessage::Ended(generation));
        });

        info!(%generation, paths = self.selection.len(), "computing selection size");
        self.in_flight.push(Computation {
            generation,
            cancel,
            phase: ComputationPhase::Calculating,
        });
        self.state = CoordinatorState::Calculating(generation);
        self.display.calculating = true;
        self.display.unavailable = false;
    }

    /// Wait for the next message from a running computation.
    ///
    /// Returns `None` once nothing is in flight and no messages are queued.
    pub async fn recv_update(&mut self) -> Option<WorkerMessage> {
        if self.in_flight.is_empty() {
            return self.updates_rx.try_recv().ok();
        }
        self.updates_rx.recv().await
    }

    /// Apply a worker message if it belongs to the current generation.
    pub fn handle_update(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Ended(generation) => {
                self.in_flight.retain(|c| c.generation != generation);
            }
            WorkerMessage::Event(event) => {
                let generation = event.generation();
                if self.is_closed() || generation != self.generation {
                    debug!(%generation, current = %self.generation, "ignoring stale size event");
                    return;
                }
                self.apply_event(event);
            }
        }
    }

    fn apply_event(&mut self, event: SizeEvent) {
        match event {
            SizeEvent::Progress {
                generation,
                progress,
            } => {
                if !matches!(self.state, CoordinatorState::Calculating(_)) {
                    return;
                }
                self.display.bytes = progress.bytes;
                self.publish(StatusEvent::TotalUpdated {
                    generation,
                    bytes: progress.bytes,
                    is_final: false,
                });
            }
            SizeEvent::Done { generation, total } => {
                info!(
                    %generation,
                    bytes = total.bytes,
                    skipped = total.skipped,
                    cache_hits = total.cache_hits,
                    "selection size settled"
                );
                self.cache.merge(&total.walked);
                self.state = CoordinatorState::Settled {
                    generation,
                    total: total.bytes,
                    skipped: total.skipped,
                };
                self.last_settled = Some(total.bytes);
                self.display = TotalDisplay {
                    bytes: total.bytes,
                    calculating: false,
                    unavailable: false,
                    skipped: total.skipped,
                };
                self.publish(StatusEvent::TotalUpdated {
                    generation,
                    bytes: total.bytes,
                    is_final: true,
                });
            }
            SizeEvent::Failed { generation, error } => {
                let message = error.to_string();
                warn!(%generation, error = %message, "selection size unavailable");
                self.state = CoordinatorState::Unavailable {
                    generation,
                    stale_total: self.last_settled,
                    message: message.clone(),
                };
                self.display.bytes = self.last_settled.unwrap_or(0);
                self.display.calculating = false;
                self.display.unavailable = true;
                self.publish(StatusEvent::TotalUnavailable {
                    generation,
                    message,
                });
            }
        }
    }

    /// Pump worker messages until the current generation settles or fails.
    pub async fn settle(&mut self) -> &CoordinatorState {
        while matches!(self.state, CoordinatorState::Calculating(_)) {
            match self.recv_update().await {
                Some(message) => self.handle_update(message),
                None => break,
            }
        }
        &self.state
    }

    /// Pump worker messages until every computation, stale or not, has ended.
    pub async fn drain(&mut self) {
        while let Some(message) = self.recv_update().await {
            self.handle_update(message);
        }
    }

    /// Cancel everything. No later result is applied.
    pub fn close(&mut self) {
        for computation in &mut self.in_flight {
            computation.cancel.cancel();
            computation.phase = ComputationPhase::Stale;
        }
        if !self.is_closed() {
            info!(generation = %self.generation, "closing selection session");
        }
        self.state = CoordinatorState::Closed;
    }

    fn publish(&self, event: StatusEvent) {
        // No subscribers is fine.
        let _ = self.status_tx.send(event);
    }
}

impl<F: FileSystem> Drop for Coordinator<F> {
    fn drop(&mut self) {
        for computation in &self.in_flight {
            computation.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use mansel_core::SelectConfig;
    use mansel_scan::{SizeProgress, SizeTotal};
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a/x"), vec![0u8; 10]).unwrap();
        fs::write(temp.path().join("b"), vec![0u8; 5]).unwrap();
        temp
    }

    fn total(bytes: u64) -> SizeTotal {
        SizeTotal {
            bytes,
            ..SizeTotal::default()
        }
    }

    #[tokio::test]
    async fn test_start_is_generation_zero() {
        let temp = create_test_tree();
        let tree = SelectionTree::open(SelectConfig::new(temp.path())).unwrap();
        let mut coordinator = Coordinator::start(tree);

        assert_eq!(coordinator.generation(), Generation(0));
        assert_eq!(
            coordinator.state(),
            &CoordinatorState::Calculating(Generation(0))
        );
        assert!(coordinator.display_total().calculating);

        coordinator.settle().await;
        assert!(coordinator.state().is_settled());
        assert_eq!(coordinator.display_total().bytes, 0);
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let temp = create_test_tree();
        let tree = SelectionTree::open(SelectConfig::new(temp.path())).unwrap();
        let mut coordinator = Coordinator::start(tree);
        coordinator.settle().await;
        let settled = coordinator.state().clone();

        coordinator.handle_update(WorkerMessage::Event(SizeEvent::Progress {
            generation: Generation(7),
            progress: SizeProgress::default(),
        }));
        coordinator.handle_update(WorkerMessage::Event(SizeEvent::Done {
            generation: Generation(7),
            total: total(999),
        }));
        assert_eq!(coordinator.state(), &settled);
    }

    #[tokio::test]
    async fn test_failure_keeps_stale_total() {
        let temp = create_test_tree();
        let tree = SelectionTree::open(SelectConfig::new(temp.path())).unwrap();
        let mut coordinator = Coordinator::start(tree);
        coordinator.handle_update(WorkerMessage::Event(SizeEvent::Done {
            generation: Generation(0),
            total: total(42),
        }));

        coordinator.handle_update(WorkerMessage::Event(SizeEvent::Failed {
            generation: Generation(0),
            error: mansel_scan::SizeError::Worker {
                message: "boom".into(),
            },
        }));
        match coordinator.state() {
            CoordinatorState::Unavailable { stale_total, .. } => {
                assert_eq!(*stale_total, Some(42));
            }
            other => panic!("unexpected state: {other:?}"),
        }
        let display = coordinator.display_total();
        assert!(display.unavailable);
        assert!(!display.calculating);
        assert_eq!(display.bytes, 42);
    }

    #[tokio::test]
    async fn test_expand_does_not_restart() {
        let temp = create_test_tree();
        let tree = SelectionTree::open(SelectConfig::new(temp.path())).unwrap();
        let mut coordinator = Coordinator::start(tree);
        let root = coordinator.tree().root();

        coordinator.expand(root).unwrap();
        assert_eq!(coordinator.generation(), Generation(0));
    }
}
