//! Keymap help bar UI component.

use crate::app::ViewKind;
use crate::ui::ThemeColors;
use ratatui::{layout::Rect, style::Style, widgets::Paragraph, Frame};

/// Draw the keymap help bar.
pub(crate) fn draw_keymap(f: &mut Frame<'_>, area: Rect, view: ViewKind, colors: &ThemeColors) {
    let keymap_text = match view {
        ViewKind::Timeline => {
            " q:quit | Tab:frame view | m:mode | wasd/←↑↓→:pan | +-0:zoom | c/v/i:color | t:tips | L:legend | e:export | T:theme"
        },
        ViewKind::Frame => {
            " q:quit | Tab:timeline | []:frame | p:play | m:mode | +-0:zoom | c/v/i:color | t:tips | L:legend | e:export"
        },
    };

    let paragraph = Paragraph::new(keymap_text).style(Style::default().fg(colors.keymap_fg).bg(colors.bg));

    f.render_widget(paragraph, area);
}
