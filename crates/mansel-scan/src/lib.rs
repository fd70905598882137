//! Selection size aggregation for mansel.
//!
//! # Overview
//!
//! `mansel-scan` sums the bytes covered by a [`SelectionSet`]. Key features:
//!
//! - **Parallel traversal** via jwalk/rayon for selected directories
//! - **Cancellation** through a per-generation `CancellationToken`, checked
//!   at directory granularity
//! - **Progress updates** streamed over a bounded channel
//! - **Error tolerance**: unreadable entries are skipped and counted
//! - **Size cache**: directories walked by an earlier computation are not
//!   walked again
//!
//! # Example
//!
//! ```rust,no_run
//! use mansel_core::{SelectConfig, SelectionSet};
//! use mansel_scan::{Generation, SizeAggregator, SizeCache, SizeEvent};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(selection: SelectionSet) {
//! let aggregator = SizeAggregator::new(SelectConfig::new("/data"));
//! let mut events = aggregator.compute_total(
//!     selection,
//!     Generation::default(),
//!     SizeCache::new(),
//!     CancellationToken::new(),
//! );
//!
//! while let Some(event) = events.recv().await {
//!     if let SizeEvent::Done { total, .. } = event {
//!         println!("Total size: {} bytes", total.bytes);
//!     }
//! }
//! # }
//! ```

mod aggregator;
mod cache;
mod error;
mod progress;

pub use aggregator::{Generation, SizeAggregator, SizeEvent, WalkOutcome, SIZE_CHANNEL_SIZE};
pub use cache::{DirSize, SizeCache};
pub use error::SizeError;
pub use progress::{SizeProgress, SizeTotal};

// Re-export core types for convenience
pub use mansel_core::{SelectConfig, SelectionSet};
