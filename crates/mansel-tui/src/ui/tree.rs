//! Checkbox tree widget.

use std::collections::HashSet;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, StatefulWidget, Widget};

use mansel_core::{CheckState, FileSystem, NodeId, SelectionTree};

use crate::theme::Theme;
use crate::ui::format_size;

/// State for the tree view.
#[derive(Debug, Clone)]
pub struct TreeState {
    /// Currently selected index in the flattened view.
    pub selected: usize,
    /// Scroll offset.
    pub offset: usize,
    /// Directories currently shown open.
    pub open: HashSet<NodeId>,
}

impl Default for TreeState {
    fn default() -> Self {
        let mut open = HashSet::new();
        // Root is open by default
        open.insert(NodeId::ROOT);
        Self {
            selected: 0,
            offset: 0,
            open,
        }
    }
}

impl TreeState {
    /// Mark a directory as open.
    pub fn open(&mut self, id: NodeId) {
        self.open.insert(id);
    }

    /// Close a directory. Its children stay materialized.
    pub fn close(&mut self, id: NodeId) {
        self.open.remove(&id);
    }

    /// Check if a directory is open.
    pub fn is_open(&self, id: NodeId) -> bool {
        self.open.contains(&id)
    }

    /// Move selection up.
    pub fn move_up(&mut self, count: usize) {
        self.selected = self.selected.saturating_sub(count);
    }

    /// Move selection down.
    pub fn move_down(&mut self, count: usize, max: usize) {
        self.selected = (self.selected + count).min(max.saturating_sub(1));
    }

    /// Jump to top.
    pub fn jump_to_top(&mut self) {
        self.selected = 0;
    }

    /// Jump to bottom.
    pub fn jump_to_bottom(&mut self, max: usize) {
        self.selected = max.saturating_sub(1);
    }

    /// Ensure selected item is visible, adjusting offset if needed.
    pub fn ensure_visible(&mut self, viewport_height: usize) {
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + viewport_height {
            self.offset = self.selected - viewport_height + 1;
        }
    }
}

/// A flattened visible row in the tree.
#[derive(Debug, Clone)]
pub struct VisibleItem {
    pub id: NodeId,
    pub name: String,
    pub kind: VisibleNodeKind,
    pub check: CheckState,
    /// File size, filled in by the app for file rows.
    pub size: Option<u64>,
    pub depth: usize,
    pub is_last_sibling: bool,
    pub parent_last_siblings: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleNodeKind {
    Directory { open: bool, failed: bool },
    File,
}

/// Flatten the materialized tree to the rows currently shown.
///
/// The root is always the first row, labelled `root_label`.
pub fn flatten<F: FileSystem>(
    tree: &SelectionTree<F>,
    state: &TreeState,
    root_label: &str,
) -> Vec<VisibleItem> {
    let mut items = Vec::new();
    flatten_node(tree, tree.root(), root_label, 0, true, Vec::new(), state, &mut items);
    items
}

#[allow(clippy::too_many_arguments)]
fn flatten_node<F: FileSystem>(
    tree: &SelectionTree<F>,
    id: NodeId,
    name: &str,
    depth: usize,
    is_last: bool,
    parent_last_siblings: Vec<bool>,
    state: &TreeState,
    items: &mut Vec<VisibleItem>,
) {
    let Some(node) = tree.node(id) else { return };
    let is_open = node.is_dir() && state.is_open(id);

    let kind = if node.is_dir() {
        VisibleNodeKind::Directory {
            open: is_open,
            failed: node.listing().is_some_and(|l| l.is_failed()),
        }
    } else {
        VisibleNodeKind::File
    };

    items.push(VisibleItem {
        id,
        name: name.to_string(),
        kind,
        check: node.check_state,
        size: node.size_hint(),
        depth,
        is_last_sibling: is_last,
        parent_last_siblings: parent_last_siblings.clone(),
    });

    if is_open {
        let children = tree.children(id);
        let child_count = children.len();
        for (i, &child) in children.iter().enumerate() {
            let Some(child_node) = tree.node(child) else { continue };
            let mut child_parent_lasts = parent_last_siblings.clone();
            child_parent_lasts.push(is_last);

            flatten_node(
                tree,
                child,
                child_node.name.as_str(),
                depth + 1,
                i == child_count - 1,
                child_parent_lasts,
                state,
                items,
            );
        }
    }
}

/// Tree view widget.
pub struct TreeView<'a> {
    items: &'a [VisibleItem],
    theme: &'a Theme,
    block: Option<Block<'a>>,
}

impl<'a> TreeView<'a> {
    /// Create a new tree view over pre-flattened rows.
    pub fn new(items: &'a [VisibleItem], theme: &'a Theme) -> Self {
        Self {
            items,
            theme,
            block: None,
        }
    }

    /// Set the block (border) for the widget.
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl StatefulWidget for TreeView<'_> {
    type State = TreeState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        // Handle block/border
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner_area.height == 0 || inner_area.width == 0 {
            return;
        }

        let viewport_height = inner_area.height as usize;
        state.ensure_visible(viewport_height);

        let start = state.offset;
        let end = (start + viewport_height).min(self.items.len());
        let size_text_width: u16 = 10;

        for (row_idx, item_idx) in (start..end).enumerate() {
            let item = &self.items[item_idx];
            let y = inner_area.y + row_idx as u16;
            let is_selected = item_idx == state.selected;

            // Build tree prefix
            let mut prefix = String::new();
            for &parent_is_last in item.parent_last_siblings.iter().skip(1) {
                prefix.push_str(if parent_is_last { "  " } else { "│ " });
            }
            if item.depth > 0 {
                prefix.push_str(if item.is_last_sibling { "└─" } else { "├─" });
            }

            let expand_indicator = match item.kind {
                VisibleNodeKind::Directory { failed: true, .. } => "! ",
                VisibleNodeKind::Directory { open: true, .. } => "▼ ",
                VisibleNodeKind::Directory { open: false, .. } => "▶ ",
                VisibleNodeKind::File => "  ",
            };
            let indicator_style = match item.kind {
                VisibleNodeKind::Directory { failed: true, .. } => Style::default().fg(self.theme.error),
                _ => Style::default().fg(self.theme.muted),
            };

            let base_style = match item.kind {
                VisibleNodeKind::Directory { failed: true, .. } => {
                    self.theme.directory.add_modifier(Modifier::DIM)
                }
                VisibleNodeKind::Directory { .. } => self.theme.directory,
                VisibleNodeKind::File => self.theme.file,
            };

            let checkbox = format!("{} ", item.check.marker());
            let prefix_width = prefix.chars().count() + checkbox.len() + 2;
            let available_for_name = inner_area
                .width
                .saturating_sub(prefix_width as u16)
                .saturating_sub(size_text_width + 1) as usize;

            // Truncate name if needed
            let name = if item.name.chars().count() > available_for_name {
                let truncated: String = item
                    .name
                    .chars()
                    .take(available_for_name.saturating_sub(1))
                    .collect();
                format!("{truncated}…")
            } else {
                item.name.clone()
            };
            let name_padding =
                " ".repeat(available_for_name.saturating_sub(name.chars().count()));

            let size_text = match item.size {
                Some(size) => format!("{:>10}", format_size(size)),
                None => " ".repeat(size_text_width as usize),
            };

            let line = Line::from(vec![
                Span::styled(prefix, self.theme.tree_lines),
                Span::styled(checkbox, self.theme.check_style(item.check)),
                Span::styled(expand_indicator, indicator_style),
                Span::styled(name, base_style),
                Span::raw(name_padding),
                Span::raw(" "),
                Span::styled(size_text, Style::default().fg(self.theme.muted)),
            ]);

            let line = if is_selected {
                line.style(self.theme.selected)
            } else {
                line
            };

            let line_area = Rect::new(inner_area.x, y, inner_area.width, 1);
            Widget::render(line, line_area, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use mansel_core::SelectConfig;
    use tempfile::TempDir;

    fn create_tree() -> (TempDir, SelectionTree) {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a/x"), "x").unwrap();
        fs::write(temp.path().join("b"), "b").unwrap();
        let mut tree = SelectionTree::open(SelectConfig::new(temp.path())).unwrap();
        tree.expand(tree.root()).unwrap();
        (temp, tree)
    }

    #[test]
    fn test_flatten_respects_open_set() {
        let (_temp, mut tree) = create_tree();
        let mut state = TreeState::default();

        let items = flatten(&tree, &state, ".");
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec![".", "a", "b"]);
        assert_eq!(items[1].depth, 1);
        assert!(items[2].is_last_sibling);

        let a = tree.find("a").unwrap();
        tree.expand(a).unwrap();
        state.open(a);
        let items = flatten(&tree, &state, ".");
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec![".", "a", "x", "b"]);
        assert_eq!(items[2].depth, 2);

        state.close(a);
        assert_eq!(flatten(&tree, &state, ".").len(), 3);
    }

    #[test]
    fn test_flatten_marks_failed_listing() {
        let (temp, mut tree) = create_tree();
        let a = tree.find("a").unwrap();
        fs::remove_dir_all(temp.path().join("a")).unwrap();
        assert!(tree.expand(a).is_err());

        let mut state = TreeState::default();
        state.open(a);
        let items = flatten(&tree, &state, ".");
        assert_eq!(
            items[1].kind,
            VisibleNodeKind::Directory {
                open: true,
                failed: true
            }
        );
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_tree_state_navigation() {
        let mut state = TreeState::default();
        state.move_down(5, 3);
        assert_eq!(state.selected, 2);
        state.move_up(1);
        assert_eq!(state.selected, 1);
        state.jump_to_top();
        assert_eq!(state.selected, 0);
        state.jump_to_bottom(10);
        assert_eq!(state.selected, 9);
        state.ensure_visible(4);
        assert_eq!(state.offset, 6);
    }
}
