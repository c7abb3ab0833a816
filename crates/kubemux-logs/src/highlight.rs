//! JSON syntax highlighting for log bodies.
//!
//! The body is validated with `serde_json` and then re-emitted token by
//! token with ANSI colors, preserving the original layout exactly.

use crossterm::style::{Color, Stylize};
use kubemux_types::{ColorSupport, DEFAULT_THEME};
use thiserror::Error;

type Rgb = (u8, u8, u8);

/// Token colors of one highlighting theme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub key: Rgb,
    pub string: Rgb,
    pub number: Rgb,
    /// `true`, `false` and `null`
    pub literal: Rgb,
    pub punctuation: Rgb,
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "nord",
        key: (136, 192, 208),
        string: (163, 190, 140),
        number: (180, 142, 173),
        literal: (129, 161, 193),
        punctuation: (236, 239, 244),
    },
    Theme {
        name: "monokai",
        key: (249, 38, 114),
        string: (230, 219, 116),
        number: (174, 129, 255),
        literal: (102, 217, 239),
        punctuation: (248, 248, 242),
    },
    Theme {
        name: "dracula",
        key: (139, 233, 253),
        string: (241, 250, 140),
        number: (189, 147, 249),
        literal: (255, 121, 198),
        punctuation: (248, 248, 242),
    },
    Theme {
        name: "github",
        key: (0, 0, 128),
        string: (221, 17, 68),
        number: (0, 153, 153),
        literal: (68, 85, 136),
        punctuation: (51, 51, 51),
    },
    Theme {
        name: "solarized-dark",
        key: (38, 139, 210),
        string: (42, 161, 152),
        number: (211, 54, 130),
        literal: (203, 75, 22),
        punctuation: (147, 161, 161),
    },
    Theme {
        name: "solarized-light",
        key: (38, 139, 210),
        string: (42, 161, 152),
        number: (211, 54, 130),
        literal: (203, 75, 22),
        punctuation: (88, 110, 117),
    },
    Theme {
        name: "gruvbox",
        key: (131, 165, 152),
        string: (184, 187, 38),
        number: (211, 134, 155),
        literal: (254, 128, 25),
        punctuation: (235, 219, 178),
    },
    Theme {
        name: "onedark",
        key: (224, 108, 117),
        string: (152, 195, 121),
        number: (209, 154, 102),
        literal: (86, 182, 194),
        punctuation: (171, 178, 191),
    },
];

impl Theme {
    pub fn by_name(name: &str) -> Option<&'static Theme> {
        THEMES.iter().find(|t| t.name == name)
    }

    pub fn fallback() -> &'static Theme {
        Self::by_name(DEFAULT_THEME).unwrap_or(&THEMES[0])
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        THEMES.iter().map(|t| t.name)
    }
}

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("unknown theme {0:?}")]
    UnknownTheme(String),

    #[error("destination does not support color")]
    NoColor,

    #[error("log body is not a JSON object or array")]
    NotJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Key,
    String,
    Number,
    Literal,
    Punctuation,
}

/// Renders JSON text with one theme at one color depth
#[derive(Clone, Debug)]
pub struct JsonHighlighter {
    theme: &'static Theme,
    support: ColorSupport,
}

impl JsonHighlighter {
    pub fn new(theme: &str, support: ColorSupport) -> Result<Self, HighlightError> {
        let theme =
            Theme::by_name(theme).ok_or_else(|| HighlightError::UnknownTheme(theme.to_string()))?;
        Self::with_theme(theme, support)
    }

    pub fn with_theme(theme: &'static Theme, support: ColorSupport) -> Result<Self, HighlightError> {
        if !support.is_enabled() {
            return Err(HighlightError::NoColor);
        }
        Ok(Self { theme, support })
    }

    pub fn theme(&self) -> &'static Theme {
        self.theme
    }

    /// Highlight `text` if it is a JSON object or array
    pub fn highlight(&self, text: &str) -> Result<String, HighlightError> {
        let trimmed = text.trim();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return Err(HighlightError::NotJson);
        }
        serde_json::from_str::<serde_json::Value>(trimmed)?;

        // Surrounding whitespace may be non-ASCII and is copied through as is
        let lead = text.len() - text.trim_start().len();
        let mut out = String::with_capacity(text.len() * 2);
        out.push_str(&text[..lead]);
        self.push_tokens(&mut out, trimmed);
        out.push_str(&text[lead + trimmed.len()..]);

        Ok(out)
    }

    /// Color every token of validated JSON text
    fn push_tokens(&self, out: &mut String, text: &str) {
        let bytes = text.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            let end = match bytes[i] {
                b'"' => {
                    let end = string_end(bytes, i);
                    let token = if next_significant(bytes, end) == Some(b':') {
                        Token::Key
                    } else {
                        Token::String
                    };
                    self.push(out, &text[i..end], token);
                    end
                }
                b'{' | b'}' | b'[' | b']' | b':' | b',' => {
                    self.push(out, &text[i..i + 1], Token::Punctuation);
                    i + 1
                }
                b'-' | b'0'..=b'9' => {
                    let end = scan(bytes, i, |b| b.is_ascii_digit() || b"+-.eE".contains(&b));
                    self.push(out, &text[i..end], Token::Number);
                    end
                }
                b't' | b'f' | b'n' => {
                    let end = scan(bytes, i, |b| b.is_ascii_alphabetic());
                    self.push(out, &text[i..end], Token::Literal);
                    end
                }
                _ => {
                    // Only whitespace can appear between tokens of valid JSON
                    let end = scan(bytes, i, |b| b.is_ascii_whitespace());
                    let end = if end > i { end } else { next_char_boundary(text, i) };
                    out.push_str(&text[i..end]);
                    end
                }
            };
            i = end;
        }
    }

    fn push(&self, out: &mut String, lexeme: &str, token: Token) {
        let rgb = match token {
            Token::Key => self.theme.key,
            Token::String => self.theme.string,
            Token::Number => self.theme.number,
            Token::Literal => self.theme.literal,
            Token::Punctuation => self.theme.punctuation,
        };
        out.push_str(&lexeme.with(to_color(rgb, self.support)).to_string());
    }
}

/// Index just past the closing quote of the string starting at `start`
fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the char starting at `i`
fn next_char_boundary(text: &str, i: usize) -> usize {
    text[i..].chars().next().map_or(text.len(), |c| i + c.len_utf8())
}

fn next_significant(bytes: &[u8], from: usize) -> Option<u8> {
    bytes[from.min(bytes.len())..]
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

fn scan(bytes: &[u8], start: usize, keep: impl Fn(u8) -> bool) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| !keep(b))
        .map_or(bytes.len(), |n| start + n)
}

/// Map a theme color onto what the destination can display
fn to_color((r, g, b): Rgb, support: ColorSupport) -> Color {
    match support {
        ColorSupport::TrueColor => Color::Rgb { r, g, b },
        ColorSupport::Ansi256 => Color::AnsiValue(rgb_to_ansi256(r, g, b)),
        ColorSupport::Basic | ColorSupport::None => nearest_basic(r, g, b),
    }
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        return match r {
            0..=7 => 16,
            249..=255 => 231,
            _ => 232 + ((r as u16 - 8) * 24 / 247) as u8,
        };
    }
    let level = |c: u8| ((c as u16 * 5 + 127) / 255) as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

const BASIC_COLORS: [(Color, Rgb); 16] = [
    (Color::Black, (0, 0, 0)),
    (Color::DarkRed, (128, 0, 0)),
    (Color::DarkGreen, (0, 128, 0)),
    (Color::DarkYellow, (128, 128, 0)),
    (Color::DarkBlue, (0, 0, 128)),
    (Color::DarkMagenta, (128, 0, 128)),
    (Color::DarkCyan, (0, 128, 128)),
    (Color::Grey, (192, 192, 192)),
    (Color::DarkGrey, (128, 128, 128)),
    (Color::Red, (255, 0, 0)),
    (Color::Green, (0, 255, 0)),
    (Color::Yellow, (255, 255, 0)),
    (Color::Blue, (0, 0, 255)),
    (Color::Magenta, (255, 0, 255)),
    (Color::Cyan, (0, 255, 255)),
    (Color::White, (255, 255, 255)),
];

fn nearest_basic(r: u8, g: u8, b: u8) -> Color {
    let distance = |(cr, cg, cb): Rgb| {
        let d = |x: u8, y: u8| (x as i32 - y as i32).pow(2);
        d(r, cr) + d(g, cg) + d(b, cb)
    };
    BASIC_COLORS
        .iter()
        .min_by_key(|(_, rgb)| distance(*rgb))
        .map_or(Color::White, |(color, _)| *color)
}
