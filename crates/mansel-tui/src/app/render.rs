//! Application rendering.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use mansel_session::TotalDisplay;

use crate::theme::Theme;
use crate::ui::size_status;

/// Render context for the chrome around the tree.
pub struct RenderContext<'a> {
    pub theme: &'a Theme,
    pub root_label: &'a str,
    pub selected_count: usize,
    pub total: TotalDisplay,
    pub error: Option<&'a str>,
}

/// Title bar with the root path and selection count.
pub fn render_header(ctx: &RenderContext, area: Rect, buf: &mut Buffer) {
    let title = Span::styled(" mansel ", ctx.theme.title);
    let root = Span::raw(ctx.root_label.to_string());
    let count = Span::styled(
        format!("  {} selected", ctx.selected_count),
        Style::default().fg(ctx.theme.muted),
    );

    Paragraph::new(Line::from(vec![title, root, count]))
        .style(ctx.theme.header)
        .render(area, buf);
}

/// Selection size line, or the last error if there is one.
pub fn render_status(ctx: &RenderContext, area: Rect, buf: &mut Buffer) {
    let mut spans = vec![Span::raw(format!(" {}", size_status(ctx.total)))];
    if let Some(error) = ctx.error {
        spans.push(Span::styled(
            format!("  {error}"),
            Style::default().fg(ctx.theme.error),
        ));
    }
    Paragraph::new(Line::from(spans)).render(area, buf);
}

/// Key hints.
pub fn render_footer(ctx: &RenderContext, area: Rect, buf: &mut Buffer) {
    let keys = [
        ("j/k", "Nav"),
        ("l/h", "Open/Close"),
        ("Spc", "Check"),
        ("Enter", "Done"),
        ("?", "Help"),
        ("q", "Cancel"),
    ];

    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(format!(" {} ", key), ctx.theme.help_key),
                Span::styled(format!("{} ", desc), ctx.theme.help_desc),
            ]
        })
        .collect();

    Paragraph::new(Line::from(spans))
        .style(ctx.theme.footer)
        .render(area, buf);
}
