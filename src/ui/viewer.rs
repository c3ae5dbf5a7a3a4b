//! Heatmap panels and legend.

use image::{Rgba, RgbaImage};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::tiles::TileSource;
use crate::ui::formatters::format_stat_value;
use crate::ui::ThemeColors;
use crate::viewport::InteractionMode;

const LEGEND_WIDTH: u16 = 14;

/// Draw one bordered panel per dimension plus the optional legend.
///
/// Records the inner panel areas on the app so mouse events and the next
/// surface size agree with what was drawn.
pub(crate) fn draw_viewer<S: TileSource>(f: &mut Frame<'_>, area: Rect, app: &mut App<S>, colors: &ThemeColors) {
    let (panel_area, legend_area) = if app.show_legend() {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(LEGEND_WIDTH)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let dims = app.surfaces().len().max(1) as u32;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints((0..dims).map(|_| Constraint::Ratio(1, dims)))
        .split(panel_area);

    let panning = app.mode() == InteractionMode::Pan;
    let mut panels = Vec::with_capacity(chunks.len());
    for (d, chunk) in chunks.iter().enumerate() {
        let border = if panning { colors.border_active } else { colors.border };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" dim {} ", d))
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg));
        panels.push(block.inner(*chunk));
        f.render_widget(block, *chunk);
    }

    for (surface, inner) in app.surfaces().iter().zip(&panels) {
        blit(f.buffer_mut(), *inner, surface);
    }
    app.panels = panels;

    if let Some(legend_area) = legend_area {
        draw_legend(f, legend_area, app, colors);
    }
}

/// Copy a surface into the buffer with upper half blocks: the foreground is
/// the upper pixel and the background the lower one.
fn blit(buf: &mut Buffer, area: Rect, img: &RgbaImage) {
    for cy in 0..area.height {
        for cx in 0..area.width {
            let x = u32::from(cx);
            let y = u32::from(cy) * 2;
            let upper = img.get_pixel_checked(x, y).copied();
            let lower = img.get_pixel_checked(x, y + 1).copied();
            if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                cell.set_char('▀').set_fg(to_color(upper)).set_bg(to_color(lower));
            }
        }
    }
}

fn to_color(pixel: Option<Rgba<u8>>) -> Color {
    match pixel {
        Some(Rgba([r, g, b, a])) if a > 0 => Color::Rgb(r, g, b),
        _ => Color::Reset,
    }
}

/// Vertical color bar with the maximum at the top.
fn draw_legend<S: TileSource>(f: &mut Frame<'_>, area: Rect, app: &App<S>, colors: &ThemeColors) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" legend ")
        .border_style(Style::default().fg(colors.border))
        .style(Style::default().bg(colors.bg));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let stops = app.gradient();
    if inner.height == 0 || inner.width < 2 || stops.is_empty() {
        return;
    }

    let last_row = inner.height.saturating_sub(1).max(1);
    let buf = f.buffer_mut();
    for row in 0..inner.height {
        let t = 1.0 - f64::from(row) / f64::from(last_row);
        let Some(stop) = stops
            .iter()
            .min_by(|a, b| (a.offset - t).abs().total_cmp(&(b.offset - t).abs()))
        else {
            continue;
        };

        let swatch = to_color(Some(stop.color));
        for dx in 0..2 {
            if let Some(cell) = buf.cell_mut((inner.x + dx, inner.y + row)) {
                cell.set_char(' ').set_bg(swatch);
            }
        }

        let show_label = row == 0 || row == inner.height - 1 || row == inner.height / 2;
        if show_label {
            let label = format_stat_value(stop.value);
            let style = Style::default().fg(colors.label).bg(colors.bg);
            buf.set_stringn(inner.x + 3, inner.y + row, label, usize::from(inner.width.saturating_sub(3)), style);
        }
    }
}
