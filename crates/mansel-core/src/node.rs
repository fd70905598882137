//! Tree node types.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Index of a node within a [`SelectionTree`](crate::SelectionTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Create a new NodeId from an arena index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tri-state checkbox value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CheckState {
    #[default]
    Unchecked,
    Checked,
    PartiallyChecked,
}

impl CheckState {
    /// Map a boolean check decision to a state.
    pub fn from_checked(checked: bool) -> Self {
        if checked { Self::Checked } else { Self::Unchecked }
    }

    /// Whether this is `Checked`.
    pub fn is_checked(self) -> bool {
        self == Self::Checked
    }

    /// Whether any part of the subtree is selected.
    pub fn is_selected(self) -> bool {
        self != Self::Unchecked
    }

    /// Short marker used when rendering a checkbox.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Unchecked => "[ ]",
            Self::Checked => "[x]",
            Self::PartiallyChecked => "[~]",
        }
    }
}

/// Materialization state of a directory's children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListingState {
    /// Children have not been listed yet.
    #[default]
    Unlisted,
    /// Children are materialized.
    Listed,
    /// Listing failed; the directory is treated as having no children.
    Failed { message: String },
}

impl ListingState {
    /// Whether an expansion has been attempted, successful or not.
    pub fn is_expanded(&self) -> bool {
        !matches!(self, Self::Unlisted)
    }

    /// Whether the last listing attempt failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Type of node and the data that only makes sense for that type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file (or anything that is not walked into).
    File {
        /// Cached size in bytes, filled on demand.
        size_hint: Option<u64>,
    },
    /// Directory.
    Directory {
        /// Materialized children in listing order.
        children: Vec<NodeId>,
        /// Whether children have been listed.
        listing: ListingState,
        /// Check decision to seed children with when they are materialized.
        pending_intent: Option<bool>,
    },
}

impl NodeKind {
    /// A file node with no cached size.
    pub fn file() -> Self {
        Self::File { size_hint: None }
    }

    /// An unexpanded directory node.
    pub fn directory(pending_intent: Option<bool>) -> Self {
        Self::Directory {
            children: Vec::new(),
            listing: ListingState::Unlisted,
            pending_intent,
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }
}

/// A single file or directory in the selection tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    /// Entry name (not full path). Empty for the root.
    pub name: CompactString,

    /// Owning directory (`None` for the root).
    pub parent: Option<NodeId>,

    /// Node type and associated data.
    pub kind: NodeKind,

    /// Current checkbox state.
    pub check_state: CheckState,
}

impl PathNode {
    /// Create a new file node.
    pub fn new_file(name: impl Into<CompactString>, parent: NodeId, checked: bool) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            kind: NodeKind::file(),
            check_state: CheckState::from_checked(checked),
        }
    }

    /// Create a new unexpanded directory node.
    pub fn new_directory(
        name: impl Into<CompactString>,
        parent: Option<NodeId>,
        checked: bool,
    ) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: NodeKind::directory(Some(checked)),
            check_state: CheckState::from_checked(checked),
        }
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this node is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Materialized children (empty for files and unexpanded directories).
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { children, .. } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Listing state for directories.
    pub fn listing(&self) -> Option<&ListingState> {
        match &self.kind {
            NodeKind::Directory { listing, .. } => Some(listing),
            NodeKind::File { .. } => None,
        }
    }

    /// Whether this directory has been expanded (files never are).
    pub fn is_expanded(&self) -> bool {
        self.listing().is_some_and(ListingState::is_expanded)
    }

    /// Cached size for files.
    pub fn size_hint(&self) -> Option<u64> {
        match self.kind {
            NodeKind::File { size_hint } => size_hint,
            NodeKind::Directory { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::ROOT.index(), 0);
    }

    #[test]
    fn test_check_state_helpers() {
        assert_eq!(CheckState::from_checked(true), CheckState::Checked);
        assert_eq!(CheckState::from_checked(false), CheckState::Unchecked);
        assert!(CheckState::PartiallyChecked.is_selected());
        assert!(!CheckState::PartiallyChecked.is_checked());
        assert_eq!(CheckState::Checked.marker(), "[x]");
    }

    #[test]
    fn test_file_node_creation() {
        let node = PathNode::new_file("notes.txt", NodeId::ROOT, true);
        assert!(node.is_file());
        assert!(!node.is_expanded());
        assert!(node.children().is_empty());
        assert_eq!(node.check_state, CheckState::Checked);
        assert_eq!(node.size_hint(), None);
    }

    #[test]
    fn test_directory_node_creation() {
        let node = PathNode::new_directory("photos", Some(NodeId::ROOT), false);
        assert!(node.is_dir());
        assert!(!node.is_expanded());
        assert_eq!(node.listing(), Some(&ListingState::Unlisted));
        match node.kind {
            NodeKind::Directory { pending_intent, .. } => assert_eq!(pending_intent, Some(false)),
            NodeKind::File { .. } => panic!("Expected Directory node kind"),
        }
    }
}
