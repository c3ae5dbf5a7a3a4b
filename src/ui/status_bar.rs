//! Status bar UI component.

use crate::ui::ThemeColors;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Draw the status bar, with the hover readout after the message.
pub(crate) fn draw_status(f: &mut Frame<'_>, area: Rect, status: &str, hover: Option<&str>, colors: &ThemeColors) {
    let mut spans = vec![Span::raw(format!(" {}", status))];
    if let Some(hover) = hover {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(hover.to_string(), Style::default().fg(colors.hover)));
    }

    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().fg(colors.status_fg).bg(colors.status_bg));

    f.render_widget(paragraph, area);
}
