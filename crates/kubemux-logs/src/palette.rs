use crossterm::style::{Color, Stylize};
use kubemux_types::ColorSupport;

/// Prefix colors, assigned to targets by position (deterministic assignment)
pub const PALETTE: [Color; 10] = [
    Color::DarkCyan,
    Color::DarkYellow,
    Color::DarkGreen,
    Color::DarkMagenta,
    Color::DarkBlue,
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Blue,
];

/// Paints a prefix token in one palette color, or leaves it untouched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colorizer(Option<Color>);

impl Colorizer {
    /// Colorizer for the target at `index` in filtered order
    pub fn for_target(index: usize, support: ColorSupport) -> Self {
        if support.is_enabled() {
            Self(Some(PALETTE[index % PALETTE.len()]))
        } else {
            Self::plain()
        }
    }

    /// No-op formatter
    pub fn plain() -> Self {
        Self(None)
    }

    pub fn color(&self) -> Option<Color> {
        self.0
    }

    pub fn paint(&self, text: &str) -> String {
        match self.0 {
            Some(color) => text.with(color).to_string(),
            None => text.to_string(),
        }
    }
}
