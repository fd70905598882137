//! Selection session for mansel.
//!
//! The [`Coordinator`] owns the [`SelectionTree`](mansel_core::SelectionTree)
//! and restarts a background size computation whenever the selection
//! changes. Results are tagged with a [`Generation`](mansel_scan::Generation)
//! and only the newest one is ever applied.

mod coordinator;
mod status;

pub use coordinator::{
    ComputationPhase, Coordinator, CoordinatorState, WorkerMessage, STATUS_CHANNEL_SIZE,
};
pub use status::{StatusEvent, TotalDisplay};
