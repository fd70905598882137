//! Core types and the selection tree for mansel.
//!
//! This crate provides the lazily-materialized directory tree that backs the
//! checkbox picker, the tri-state propagation rules that keep it consistent,
//! and the minimal [`SelectionSet`] derived from it.
//!
//! # Example
//!
//! ```rust,no_run
//! use mansel_core::{SelectConfig, SelectionTree};
//!
//! let mut tree = SelectionTree::open(SelectConfig::new("/data")).unwrap();
//! let report = tree.preselect(["photos", "notes/todo.txt"]);
//! for warning in &report.warnings {
//!     eprintln!("{warning}");
//! }
//! for path in tree.selection_set().to_strings() {
//!     println!("{path}");
//! }
//! ```

mod config;
mod error;
mod fs;
mod node;
mod selection;
mod tree;

pub use config::{SelectConfig, SelectConfigBuilder};
pub use error::{PreselectIssue, PreselectWarning, SelectError};
pub use fs::{DirEntryInfo, EntryKind, FileSystem, LocalFileSystem};
pub use node::{CheckState, ListingState, NodeId, NodeKind, PathNode};
pub use selection::SelectionSet;
pub use tree::{PreselectReport, SelectionTree};
