use finnbar_core::Probability;
use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub fg: Color,
    pub primary: Color,   // Blue
    pub secondary: Color, // Orange
    pub muted: Color,     // Grey
    pub success: Color,   // Green
    pub warning: Color,   // Yellow
    pub error: Color,     // Red
    pub border_focused: Color,
    pub border_normal: Color,
    pub bar_bg: Color,
    pub zebra_bg: Color,
    pub selected_bg: Color,
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),
    secondary: Color::Rgb(250, 179, 135),
    muted: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    warning: Color::Rgb(249, 226, 175),
    error: Color::Rgb(243, 139, 168),
    border_focused: Color::Rgb(249, 226, 175), // Yellow border for focus
    border_normal: Color::Rgb(108, 112, 134),
    bar_bg: Color::Rgb(50, 50, 70),
    zebra_bg: Color::Rgb(40, 40, 58),
    selected_bg: Color::Rgb(69, 71, 90),
};

impl Theme {
    pub fn border(&self, focused: bool) -> Style {
        Style::default().fg(if focused { self.border_focused } else { self.border_normal })
    }

    pub fn probability(&self, probability: Probability) -> Style {
        match probability {
            Probability::HighInStock => {
                Style::default().fg(self.success).add_modifier(Modifier::BOLD)
            }
            Probability::LowInStock => {
                Style::default().fg(self.warning).add_modifier(Modifier::BOLD)
            }
            Probability::OutOfStock => Style::default().fg(self.error).add_modifier(Modifier::BOLD),
            Probability::Unknown => Style::default().fg(self.muted),
        }
    }
}
