use std::io::IsTerminal;

use kubemux_types::ColorSupport;

use crate::cli::ColorChoice;

/// What the environment says about a stream's color capability
#[derive(Clone, Debug, Default)]
struct Probe {
    is_terminal: bool,
    no_color: bool,
    term: Option<String>,
    colorterm: Option<String>,
    /// As reported by crossterm, derived from `TERM`
    color_count: u16,
}

impl Probe {
    fn from_env(is_terminal: bool) -> Self {
        Self {
            is_terminal,
            no_color: std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
            term: std::env::var("TERM").ok(),
            colorterm: std::env::var("COLORTERM").ok(),
            color_count: crossterm::style::available_color_count(),
        }
    }

    /// Best depth the terminal advertises, ignoring whether color is wanted
    fn depth(&self) -> ColorSupport {
        let truecolor = self
            .colorterm
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("truecolor") || v.eq_ignore_ascii_case("24bit"));

        if truecolor {
            ColorSupport::TrueColor
        } else if self.color_count >= 256 {
            ColorSupport::Ansi256
        } else {
            ColorSupport::Basic
        }
    }

    fn resolve(&self, choice: ColorChoice) -> ColorSupport {
        match choice {
            ColorChoice::Never => ColorSupport::None,
            ColorChoice::Always => self.depth(),
            ColorChoice::Auto => {
                if !self.is_terminal || self.no_color || self.term.as_deref() == Some("dumb") {
                    ColorSupport::None
                } else {
                    self.depth()
                }
            }
        }
    }
}

/// Color capability of stdout under the user's color choice
pub fn stdout_color(choice: ColorChoice) -> ColorSupport {
    let support = Probe::from_env(std::io::stdout().is_terminal()).resolve(choice);
    if choice == ColorChoice::Always {
        // crossterm honours NO_COLOR on its own; an explicit request wins
        crossterm::style::force_color_output(true);
    }
    support
}

/// Whether diagnostics on stderr should be colored
pub fn stderr_is_color() -> bool {
    Probe::from_env(std::io::stderr().is_terminal())
        .resolve(ColorChoice::Auto)
        .is_enabled()
}
