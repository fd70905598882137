//! Status notifications published by the coordinator.

use mansel_core::NodeId;
use mansel_scan::Generation;

/// Event broadcast to status subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A node's checkbox was changed by a mutation.
    CheckStateChanged(NodeId),
    /// A new total is available. `is_final` is set once a generation settles.
    TotalUpdated {
        generation: Generation,
        bytes: u64,
        is_final: bool,
    },
    /// The current generation could not be computed.
    TotalUnavailable {
        generation: Generation,
        message: String,
    },
}

/// What the status line should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalDisplay {
    /// Last known total in bytes.
    pub bytes: u64,
    /// Whether `bytes` may still change.
    pub calculating: bool,
    /// The current generation failed; `bytes` is the last settled total.
    pub unavailable: bool,
    /// Entries skipped by the last settled computation.
    pub skipped: u64,
}
