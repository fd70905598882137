//! Terminal user interface for mansel.
//!
//! This crate provides the interactive checkbox tree, built with ratatui.
//! Directories are listed only when opened, and the status line tracks the
//! size of the current selection while it is recomputed in the background.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mansel_core::{SelectConfig, SelectionTree};
//!
//! let tree = SelectionTree::open(SelectConfig::new("/path/to/pick/from")).unwrap();
//! if let Some(selection) = mansel_tui::run(tree).unwrap() {
//!     for path in selection.to_strings() {
//!         println!("{path}");
//!     }
//! }
//! ```
//!
//! # Keyboard Navigation
//!
//! - `j`/`k` - Move down/up
//! - `h`/`l` - Collapse/expand directories
//! - `Space` - Toggle checkbox
//! - `Enter` - Confirm selection
//! - `?` - Help
//! - `q` - Cancel

pub mod app;
mod event;
mod theme;
mod ui;

pub use app::{App, AppResult};
pub use theme::Theme;

use mansel_core::{SelectionSet, SelectionTree};
use mansel_session::Coordinator;

/// Run the picker over `tree`.
///
/// Returns the confirmed selection, or `None` if the user cancelled.
pub fn run(tree: SelectionTree) -> AppResult<Option<SelectionSet>> {
    // Create tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;

    let terminal = ratatui::init();
    let result = rt.block_on(async {
        let coordinator = Coordinator::start(tree);
        App::new(coordinator).run(terminal).await
    });
    ratatui::restore();

    // Shutdown runtime immediately to cancel background tasks
    rt.shutdown_timeout(std::time::Duration::from_millis(100));

    result
}
