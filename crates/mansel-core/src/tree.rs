//! Lazily-materialized selection tree with tri-state propagation.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SelectConfig;
use crate::error::{PreselectIssue, PreselectWarning, SelectError};
use crate::fs::{EntryKind, FileSystem, LocalFileSystem};
use crate::node::{CheckState, ListingState, NodeId, NodeKind, PathNode};
use crate::selection::SelectionSet;

/// Outcome of [`SelectionTree::preselect`].
#[derive(Debug, Clone, Default)]
pub struct PreselectReport {
    /// Nodes that were checked.
    pub applied: Vec<NodeId>,
    /// Paths that were ignored, with the reason.
    pub warnings: Vec<PreselectWarning>,
}

impl PreselectReport {
    /// Check if every supplied path was applied.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Arena of [`PathNode`]s rooted at the configured path.
///
/// Only the root exists after [`open`](Self::open); directories gain children
/// when they are expanded. Checking an unexpanded directory records a pending
/// intent instead of walking the filesystem, so every mutation costs
/// O(depth + touched subtree).
#[derive(Debug)]
pub struct SelectionTree<F: FileSystem = LocalFileSystem> {
    config: SelectConfig,
    fs: F,
    nodes: Vec<PathNode>,
}

impl SelectionTree<LocalFileSystem> {
    /// Open a tree over the local filesystem.
    pub fn open(config: SelectConfig) -> Result<Self, SelectError> {
        let fs = LocalFileSystem::new().with_follow_symlinks(config.follow_symlinks);
        Self::with_filesystem(config, fs)
    }
}

impl<F: FileSystem> SelectionTree<F> {
    /// Open a tree using a custom filesystem.
    pub fn with_filesystem(config: SelectConfig, fs: F) -> Result<Self, SelectError> {
        let kind = fs
            .entry_kind(&config.root)
            .map_err(|e| SelectError::io(&config.root, e))?;
        if kind != EntryKind::Directory {
            return Err(SelectError::NotADirectory {
                path: config.root.clone(),
            });
        }

        Ok(Self {
            config,
            fs,
            nodes: vec![PathNode::new_directory("", None, false)],
        })
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The configured root path.
    pub fn root_path(&self) -> &Path {
        &self.config.root
    }

    /// Configuration this tree was opened with.
    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    /// Number of materialized nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is always present.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&PathNode> {
        self.nodes.get(id.index())
    }

    fn get(&self, id: NodeId) -> Result<&PathNode, SelectError> {
        self.node(id).ok_or(SelectError::UnknownNode(id))
    }

    /// Current check state of a node.
    pub fn check_state(&self, id: NodeId) -> Option<CheckState> {
        self.node(id).map(|n| n.check_state)
    }

    /// Materialized children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(PathNode::children).unwrap_or(&[])
    }

    /// Root-relative path of a node; the root itself is `"."`.
    pub fn path_of(&self, id: NodeId) -> PathBuf {
        let names = self.names_to(id);
        if names.is_empty() {
            PathBuf::from(".")
        } else {
            names.iter().collect()
        }
    }

    /// Absolute (root-joined) path of a node.
    pub fn absolute_path(&self, id: NodeId) -> PathBuf {
        let mut path = self.config.root.clone();
        path.extend(self.names_to(id));
        path
    }

    fn names_to(&self, id: NodeId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            let Some(parent) = node.parent else { break };
            names.push(node.name.as_str());
            current = self.node(parent);
        }
        names.reverse();
        names
    }

    /// Find a materialized node by root-relative path without expanding.
    pub fn find(&self, path: impl AsRef<Path>) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::Normal(name) => {
                    current = self.child_named(current, &name.to_string_lossy())?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.nodes[child.index()].name == name)
    }

    /// Materialize a directory's children.
    ///
    /// New children are seeded from the directory's pending intent. A
    /// directory that was already expanded (successfully or not) is left
    /// untouched. On a listing failure the directory is marked as failed and
    /// keeps zero children.
    pub fn expand(&mut self, id: NodeId) -> Result<(), SelectError> {
        let node = self.get(id)?;
        let seed = match &node.kind {
            NodeKind::File { .. } => {
                return Err(SelectError::NotADirectory {
                    path: self.absolute_path(id),
                });
            }
            NodeKind::Directory {
                listing,
                pending_intent,
                ..
            } => {
                if listing.is_expanded() {
                    return Ok(());
                }
                pending_intent.unwrap_or(node.check_state.is_checked())
            }
        };

        let path = self.absolute_path(id);
        let entries = match self.fs.list_children(&path) {
            Ok(entries) => entries,
            Err(source) => {
                warn!(path = %path.display(), error = %source, "failed to list directory");
                if let NodeKind::Directory { listing, .. } = &mut self.nodes[id.index()].kind {
                    *listing = ListingState::Failed {
                        message: source.to_string(),
                    };
                }
                return Err(SelectError::Listing { path, source });
            }
        };

        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.config.should_skip_hidden(&entry.name) {
                continue;
            }
            let child = match entry.kind {
                EntryKind::File => PathNode::new_file(entry.name, id, seed),
                EntryKind::Directory => PathNode::new_directory(entry.name, Some(id), seed),
            };
            children.push(NodeId::new(self.nodes.len()));
            self.nodes.push(child);
        }

        debug!(path = %path.display(), children = children.len(), "expanded directory");

        if let NodeKind::Directory {
            children: slot,
            listing,
            pending_intent,
        } = &mut self.nodes[id.index()].kind
        {
            *slot = children;
            *listing = ListingState::Listed;
            *pending_intent = None;
        }
        Ok(())
    }

    /// Check or uncheck a node, cascading down and up.
    ///
    /// Returns the resulting [`SelectionSet`].
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<SelectionSet, SelectError> {
        self.get(id)?;
        self.apply_checked(id, checked);
        Ok(self.selection_set())
    }

    /// Flip a node: `Checked` becomes unchecked, anything else becomes checked.
    pub fn toggle(&mut self, id: NodeId) -> Result<SelectionSet, SelectError> {
        let checked = !self.get(id)?.check_state.is_checked();
        self.set_checked(id, checked)
    }

    fn apply_checked(&mut self, id: NodeId, checked: bool) {
        let state = CheckState::from_checked(checked);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.index()];
            node.check_state = state;
            if let NodeKind::Directory {
                children,
                listing,
                pending_intent,
            } = &mut node.kind
            {
                if *listing != ListingState::Listed {
                    *pending_intent = Some(checked);
                }
                stack.extend(children.iter().copied());
            }
        }

        let mut current = self.nodes[id.index()].parent;
        while let Some(parent) = current {
            let derived = self.derived_state(parent);
            let node = &mut self.nodes[parent.index()];
            if node.check_state == derived {
                break;
            }
            node.check_state = derived;
            current = node.parent;
        }
    }

    /// State a directory must have given its materialized children.
    ///
    /// Nodes without materialized children keep their own state.
    fn derived_state(&self, id: NodeId) -> CheckState {
        let node = &self.nodes[id.index()];
        let children = node.children();
        if children.is_empty() {
            return node.check_state;
        }

        let mut all_checked = true;
        let mut any_selected = false;
        for &child in children {
            match self.nodes[child.index()].check_state {
                CheckState::Checked => any_selected = true,
                CheckState::PartiallyChecked => {
                    any_selected = true;
                    all_checked = false;
                }
                CheckState::Unchecked => all_checked = false,
            }
        }

        if all_checked {
            CheckState::Checked
        } else if any_selected {
            CheckState::PartiallyChecked
        } else {
            CheckState::Unchecked
        }
    }

    /// Check the tri-state invariant on every node.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().enumerate().all(|(index, node)| match node.kind {
            NodeKind::File { .. } => node.check_state != CheckState::PartiallyChecked,
            NodeKind::Directory { .. } => self.derived_state(NodeId::new(index)) == node.check_state,
        })
    }

    /// Check every named path, expanding only the ancestors each one needs.
    ///
    /// Paths that cannot be resolved are reported, not fatal. So is a path
    /// nested under an earlier entry, or containing one, or repeating one.
    /// `"."` names the root and blank entries are skipped.
    pub fn preselect<I, S>(&mut self, paths: I) -> PreselectReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = PreselectReport::default();
        for raw in paths {
            let raw = raw.as_ref().trim_end_matches(['\r', '\n']);
            if raw.trim().is_empty() {
                continue;
            }
            let resolved = self.resolve_preselection(raw).and_then(|id| {
                if report.applied.iter().any(|&earlier| self.overlaps(earlier, id)) {
                    Err(PreselectIssue::Conflict)
                } else {
                    Ok(id)
                }
            });
            match resolved {
                Ok(id) => {
                    self.apply_checked(id, true);
                    report.applied.push(id);
                }
                Err(issue) => {
                    let warning = PreselectWarning::new(raw, issue);
                    warn!("{warning}");
                    report.warnings.push(warning);
                }
            }
        }
        report
    }

    /// Whether one node is the other or one of its ancestors.
    fn overlaps(&self, a: NodeId, b: NodeId) -> bool {
        self.is_ancestor_or_self(a, b) || self.is_ancestor_or_self(b, a)
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.index()].parent;
        }
        false
    }

    fn resolve_preselection(&mut self, raw: &str) -> Result<NodeId, PreselectIssue> {
        let mut current = NodeId::ROOT;
        for component in Path::new(raw).components() {
            let name = match component {
                Component::CurDir => continue,
                Component::Normal(name) => name.to_string_lossy().into_owned(),
                _ => return Err(PreselectIssue::Invalid),
            };

            let node = &self.nodes[current.index()];
            if node.is_file() {
                return Err(PreselectIssue::ThroughFile);
            }
            if self.expand(current).is_err()
                || self.nodes[current.index()]
                    .listing()
                    .is_some_and(ListingState::is_failed)
            {
                return Err(PreselectIssue::Unlistable);
            }
            current = self
                .child_named(current, &name)
                .ok_or(PreselectIssue::NotFound)?;
        }
        Ok(current)
    }

    /// Derive the minimal [`SelectionSet`].
    ///
    /// A checked root contributes its top-level children rather than `"."`
    /// unless nothing under it is materialized. The walk only descends
    /// through `PartiallyChecked` directories, so its cost is bounded by the
    /// frontier of mixed states.
    pub fn selection_set(&self) -> SelectionSet {
        let mut paths = Vec::new();
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            // Top-level entries are listed individually once materialized.
            if id == NodeId::ROOT && node.check_state.is_selected() && !node.children().is_empty() {
                stack.extend(node.children().iter().rev().copied());
                continue;
            }
            match node.check_state {
                CheckState::Checked => paths.push(self.path_of(id)),
                CheckState::Unchecked => {}
                CheckState::PartiallyChecked => {
                    stack.extend(node.children().iter().rev().copied());
                }
            }
        }
        SelectionSet::from_paths(paths)
    }

    /// Size of a file node, looked up once and cached.
    ///
    /// Returns `None` for directories and for files that cannot be stat'ed.
    pub fn file_size(&mut self, id: NodeId) -> Option<u64> {
        match self.node(id)?.kind {
            NodeKind::Directory { .. } => return None,
            NodeKind::File {
                size_hint: Some(size),
            } => return Some(size),
            NodeKind::File { size_hint: None } => {}
        }

        let path = self.absolute_path(id);
        match self.fs.stat_size(&path) {
            Ok(size) => {
                if let NodeKind::File { size_hint } = &mut self.nodes[id.index()].kind {
                    *size_hint = Some(size);
                }
                Some(size)
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cannot stat file");
                None
            }
        }
    }
}
