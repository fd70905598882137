//! UI components and widgets.

mod help;
mod tree;

pub use help::HelpOverlay;
pub use tree::{flatten, TreeState, TreeView, VisibleItem, VisibleNodeKind};

use ratatui::layout::{Constraint, Layout, Rect};

use mansel_session::TotalDisplay;

/// Layout areas for the application.
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    pub main: Rect,
    pub status: Rect,
    pub footer: Rect,
}

impl AppLayout {
    /// Compute layout from terminal area.
    pub fn new(area: Rect) -> Self {
        let [header, main, status, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        Self {
            header,
            main,
            status,
            footer,
        }
    }
}

/// Format a byte size in human-readable SI units.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::DECIMAL)
}

/// Text of the selection size status line.
pub fn size_status(display: TotalDisplay) -> String {
    let mut text = format!("Selection size: {}", format_size(display.bytes));
    if display.unavailable {
        text.push_str(" (stale, total unavailable)");
    } else if display.calculating {
        text.push_str("...(Calculating)");
    } else if display.skipped > 0 {
        text.push_str(&format!(" ({} unreadable entries skipped)", display.skipped));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_status() {
        let settled = TotalDisplay {
            bytes: 30,
            calculating: false,
            unavailable: false,
            skipped: 0,
        };
        assert_eq!(size_status(settled), "Selection size: 30 B");

        let calculating = TotalDisplay {
            calculating: true,
            ..settled
        };
        assert_eq!(size_status(calculating), "Selection size: 30 B...(Calculating)");

        let skipped = TotalDisplay {
            skipped: 2,
            ..settled
        };
        assert!(size_status(skipped).ends_with("(2 unreadable entries skipped)"));

        let unavailable = TotalDisplay {
            bytes: 5,
            unavailable: true,
            ..settled
        };
        assert_eq!(
            size_status(unavailable),
            "Selection size: 5 B (stale, total unavailable)"
        );
    }
}
