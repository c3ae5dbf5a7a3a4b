//! Color themes for the UI.

use crate::app::Theme;
use ratatui::style::Color;

/// Theme color palette.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Background color.
    pub bg: Color,
    /// Header text color.
    pub heading: Color,
    /// Legend label color.
    pub label: Color,
    /// Panel border color.
    pub border: Color,
    /// Panel border color while in pan mode.
    pub border_active: Color,
    /// Status bar foreground color.
    pub status_fg: Color,
    /// Status bar background color.
    pub status_bg: Color,
    /// Keymap bar foreground color.
    pub keymap_fg: Color,
    /// Hover readout color.
    pub hover: Color,
}

impl ThemeColors {
    /// Create color palette from theme.
    pub fn from_theme(theme: &Theme) -> Self {
        match theme {
            Theme::GruvboxDark => Self {
                bg: Color::Rgb(40, 40, 40),
                heading: Color::Rgb(251, 184, 108),
                label: Color::Rgb(184, 187, 38),
                border: Color::Rgb(102, 92, 84),
                border_active: Color::Rgb(142, 192, 124),
                status_fg: Color::Rgb(235, 219, 178),
                status_bg: Color::Rgb(60, 56, 54),
                keymap_fg: Color::Rgb(146, 131, 116),
                hover: Color::Rgb(250, 189, 47),
            },
            Theme::GruvboxLight => Self {
                bg: Color::Rgb(251, 245, 234),
                heading: Color::Rgb(175, 58, 3),
                label: Color::Rgb(121, 116, 14),
                border: Color::Rgb(213, 196, 161),
                border_active: Color::Rgb(102, 123, 3),
                status_fg: Color::Rgb(60, 56, 54),
                status_bg: Color::Rgb(235, 219, 178),
                keymap_fg: Color::Rgb(124, 111, 100),
                hover: Color::Rgb(181, 118, 20),
            },
        }
    }
}
