//! User interface rendering.

pub mod formatters;
mod keymap_bar;
mod status_bar;
mod theme;
mod viewer;

use crate::app::App;
use crate::tiles::TileSource;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::Paragraph,
    Frame,
};

pub use theme::ThemeColors;

/// Draw the UI.
pub fn draw<S: TileSource>(f: &mut Frame<'_>, app: &mut App<S>) {
    let colors = ThemeColors::from_theme(&app.theme);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let header = Paragraph::new(app.header_text()).style(
        Style::default()
            .fg(colors.heading)
            .bg(colors.bg)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(header, chunks[0]);

    viewer::draw_viewer(f, chunks[1], app, &colors);

    let hover = app.hover_text();
    status_bar::draw_status(f, chunks[2], &app.status, hover.as_deref(), &colors);
    keymap_bar::draw_keymap(f, chunks[3], app.view, &colors);
}
