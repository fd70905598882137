//! Main application state and logic.

mod constants;
mod render;

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};
use ratatui::{DefaultTerminal, Frame};
use tracing::debug;

use mansel_core::{FileSystem, LocalFileSystem, SelectionSet};
use mansel_session::{Coordinator, CoordinatorState};

use crate::event::KeyAction;
use crate::theme::Theme;
use crate::ui::{flatten, AppLayout, HelpOverlay, TreeState, TreeView, VisibleItem, VisibleNodeKind};

use self::constants::{PAGE_SIZE, TICK_INTERVAL_MS};
use self::render::{render_footer, render_header, render_status, RenderContext};

/// Application result type.
pub type AppResult<T> = color_eyre::Result<T>;

/// Application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Help,
    /// The user accepted the selection.
    Confirmed,
    /// The user backed out.
    Cancelled,
}

impl AppMode {
    fn is_finished(self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }
}

/// Main application state.
pub struct App<F: FileSystem = LocalFileSystem> {
    /// Selection session.
    coordinator: Coordinator<F>,
    /// Current mode.
    mode: AppMode,
    /// Color theme.
    theme: Theme,
    /// Tree view state.
    tree_state: TreeState,
    /// Rows currently shown.
    items: Vec<VisibleItem>,
    /// Label of the root row.
    root_label: String,
    /// Last error to display.
    error: Option<String>,
    /// Whether the screen needs to be redrawn.
    needs_redraw: bool,
}

impl<F: FileSystem> App<F> {
    /// Create the app and list the root directory.
    pub fn new(mut coordinator: Coordinator<F>) -> Self {
        let root_label = coordinator.tree().root_path().display().to_string();
        let root = coordinator.tree().root();
        let error = coordinator.expand(root).err().map(|e| e.to_string());

        let mut app = Self {
            coordinator,
            mode: AppMode::Normal,
            theme: Theme::default(),
            tree_state: TreeState::default(),
            items: Vec::new(),
            root_label,
            error,
            needs_redraw: true,
        };
        app.refresh_items();
        app
    }

    /// Run the application with async event loop.
    ///
    /// Returns the selection if the user confirmed it.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> AppResult<Option<SelectionSet>> {
        let period = Duration::from_millis(TICK_INTERVAL_MS);
        let mut interval = tokio::time::interval(period);
        let mut events = EventStream::new();

        while !self.mode.is_finished() {
            if self.needs_redraw {
                terminal.draw(|frame| self.render(frame))?;
                self.needs_redraw = false;
            }

            tokio::select! {
                biased;

                Some(Ok(event)) = events.next() => {
                    match event {
                        Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                            self.handle_action(KeyAction::from_key_event(key_event));
                        }
                        _ => {}
                    }
                    self.needs_redraw = true;
                }

                Some(message) = self.coordinator.recv_update() => {
                    self.coordinator.handle_update(message);
                    if let CoordinatorState::Unavailable { message, .. } = self.coordinator.state() {
                        self.error = Some(message.clone());
                    }
                    self.needs_redraw = true;
                }

                _ = interval.tick() => {
                    // Periodic tick for background updates
                }
            }
        }

        let selection = match self.mode {
            AppMode::Confirmed => Some(self.coordinator.selection_set().clone()),
            _ => None,
        };
        self.coordinator.close();
        Ok(selection)
    }

    /// Current mode.
    pub fn mode(&self) -> AppMode {
        self.mode
    }

    fn selected_item(&self) -> Option<&VisibleItem> {
        self.items.get(self.tree_state.selected)
    }

    /// Apply a key action.
    pub(crate) fn handle_action(&mut self, action: KeyAction) {
        if self.mode == AppMode::Help {
            if matches!(action, KeyAction::ToggleHelp | KeyAction::Cancel) {
                self.mode = AppMode::Normal;
            }
            return;
        }

        let len = self.items.len();
        match action {
            KeyAction::MoveUp => self.tree_state.move_up(1),
            KeyAction::MoveDown => self.tree_state.move_down(1, len),
            KeyAction::PageUp => self.tree_state.move_up(PAGE_SIZE),
            KeyAction::PageDown => self.tree_state.move_down(PAGE_SIZE, len),
            KeyAction::JumpToTop => self.tree_state.jump_to_top(),
            KeyAction::JumpToBottom => self.tree_state.jump_to_bottom(len),
            KeyAction::Expand => self.expand_selected(),
            KeyAction::Collapse => self.collapse_selected(),
            KeyAction::ToggleCheck => self.toggle_selected(),
            KeyAction::ToggleHelp => self.mode = AppMode::Help,
            KeyAction::Confirm => self.mode = AppMode::Confirmed,
            KeyAction::Cancel => self.mode = AppMode::Cancelled,
            KeyAction::None => {}
        }

        self.refresh_items();
    }

    fn expand_selected(&mut self) {
        let Some(item) = self.selected_item() else { return };
        let (id, kind) = (item.id, item.kind);
        match kind {
            VisibleNodeKind::Directory { open: false, .. } => {
                if let Err(err) = self.coordinator.expand(id) {
                    self.error = Some(err.to_string());
                }
                self.tree_state.open(id);
            }
            VisibleNodeKind::Directory { open: true, .. } => {
                // Step into the first child
                if !self.coordinator.tree().children(id).is_empty() {
                    self.tree_state.move_down(1, self.items.len());
                }
            }
            VisibleNodeKind::File => {}
        }
    }

    fn collapse_selected(&mut self) {
        let Some(item) = self.selected_item() else { return };
        let (id, kind) = (item.id, item.kind);
        if matches!(kind, VisibleNodeKind::Directory { open: true, .. })
            && id != self.coordinator.tree().root()
        {
            self.tree_state.close(id);
            return;
        }

        // Otherwise jump to the parent row
        let parent = self.coordinator.tree().node(id).and_then(|n| n.parent);
        if let Some(index) = parent.and_then(|p| self.items.iter().position(|i| i.id == p)) {
            self.tree_state.selected = index;
        }
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_item().map(|i| i.id) else { return };
        match self.coordinator.toggle(id) {
            Ok(()) => self.error = None,
            Err(err) => self.error = Some(err.to_string()),
        }
        debug!(selection = self.coordinator.selection_set().len(), "toggled checkbox");
    }

    /// Rebuild the visible rows and look up sizes of newly shown files.
    fn refresh_items(&mut self) {
        let mut items = flatten(self.coordinator.tree(), &self.tree_state, &self.root_label);
        for item in &mut items {
            if item.kind == VisibleNodeKind::File && item.size.is_none() {
                item.size = self.coordinator.file_size(item.id);
            }
        }
        self.items = items;

        if self.tree_state.selected >= self.items.len() {
            self.tree_state.jump_to_bottom(self.items.len());
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let base_style = Style::default()
            .bg(self.theme.background)
            .fg(self.theme.foreground);
        frame.buffer_mut().set_style(area, base_style);
        let layout = AppLayout::new(area);

        let tree_view = TreeView::new(&self.items, &self.theme).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.theme.border),
        );
        frame.render_stateful_widget(tree_view, layout.main, &mut self.tree_state);

        let ctx = RenderContext {
            theme: &self.theme,
            root_label: &self.root_label,
            selected_count: self.coordinator.selection_set().len(),
            total: self.coordinator.display_total(),
            error: self.error.as_deref(),
        };
        let buf = frame.buffer_mut();
        render_header(&ctx, layout.header, buf);
        render_status(&ctx, layout.status, buf);
        render_footer(&ctx, layout.footer, buf);

        if self.mode == AppMode::Help {
            frame.render_widget(HelpOverlay::new(&self.theme), area);
        }
    }
}
