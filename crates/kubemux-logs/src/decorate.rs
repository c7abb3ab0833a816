use kubemux_types::AggregationConfig;
use tracing::warn;

use crate::highlight::{JsonHighlighter, Theme};
use crate::palette::Colorizer;

/// Re-segments and re-colors lines as emitted by `kubectl logs`.
///
/// kubectl puts the `--prefix` token and then the `--timestamps` token in
/// front of the log body, each followed by a single space. The decorator
/// never invents these tokens, it only colors what is already there.
#[derive(Clone, Debug)]
pub struct LineDecorator {
    prefix: bool,
    timestamps: bool,
    /// Present only when JSON highlighting is requested and possible
    highlighter: Option<JsonHighlighter>,
}

impl LineDecorator {
    pub fn new(prefix: bool, timestamps: bool, highlighter: Option<JsonHighlighter>) -> Self {
        Self {
            prefix,
            timestamps,
            highlighter,
        }
    }

    /// Decorator for a run; highlighting needs both the JSON flag and color
    pub fn from_config(config: &AggregationConfig) -> Self {
        let highlighter = if config.json && config.color.is_enabled() {
            let theme = Theme::by_name(&config.theme).unwrap_or_else(|| {
                warn!(
                    theme = %config.theme,
                    fallback = Theme::fallback().name,
                    "unknown highlight theme"
                );
                Theme::fallback()
            });
            JsonHighlighter::with_theme(theme, config.color).ok()
        } else {
            None
        };

        Self::new(config.logs.prefix, config.logs.timestamps, highlighter)
    }

    /// Number of space separated fields a line is split into
    fn num_parts(&self) -> usize {
        1 + usize::from(self.prefix) + usize::from(self.timestamps)
    }

    pub fn decorate(&self, line: &str, colorizer: &Colorizer) -> String {
        let num_parts = self.num_parts();
        let parts: Vec<&str> = line.splitn(num_parts, ' ').collect();

        // Upstream tokens missing: nothing to re-segment
        if parts.len() < num_parts {
            return line.to_string();
        }

        let mut out = String::with_capacity(line.len() + 16);
        let mut fields = parts.into_iter();

        if self.prefix {
            out.push_str(&colorizer.paint(fields.next().unwrap_or_default()));
            out.push(' ');
        }
        if self.timestamps {
            out.push_str(fields.next().unwrap_or_default());
            out.push(' ');
        }

        let body = fields.next().unwrap_or_default();
        match &self.highlighter {
            Some(highlighter) => match highlighter.highlight(body) {
                Ok(highlighted) => out.push_str(&highlighted),
                Err(_) => out.push_str(body),
            },
            None => out.push_str(body),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubemux_types::{ColorSupport, LogOptions};

    #[test]
    fn test_plain_line_is_untouched() {
        let decorator = LineDecorator::new(false, false, None);
        assert_eq!(decorator.decorate("hello world", &Colorizer::plain()), "hello world");
        assert_eq!(decorator.decorate("", &Colorizer::plain()), "");
    }

    #[test]
    fn test_prefix_only_keeps_timestamp_in_body() {
        let decorator = LineDecorator::new(true, false, None);
        let colorizer = Colorizer::for_target(2, ColorSupport::Basic);
        let line = "pod-x 2024-01-01T00:00:00Z log body here";

        assert_eq!(
            decorator.decorate(line, &colorizer),
            format!("{} 2024-01-01T00:00:00Z log body here", colorizer.paint("pod-x"))
        );
    }

    #[test]
    fn test_timestamp_only_is_first_field() {
        let decorator = LineDecorator::new(false, true, None);
        assert_eq!(
            decorator.decorate("2024-01-01T00:00:00Z started  ok", &Colorizer::plain()),
            "2024-01-01T00:00:00Z started  ok"
        );
    }

    #[test]
    fn test_prefix_and_timestamp() {
        let decorator = LineDecorator::new(true, true, None);
        let colorizer = Colorizer::for_target(0, ColorSupport::TrueColor);
        let out = decorator.decorate(
            "[pod/api-0/app] 2024-01-01T00:00:00Z GET /health 200",
            &colorizer,
        );
        assert_eq!(
            out,
            format!(
                "{} 2024-01-01T00:00:00Z GET /health 200",
                colorizer.paint("[pod/api-0/app]")
            )
        );
    }

    #[test]
    fn test_short_line_passes_through() {
        let decorator = LineDecorator::new(true, true, None);
        let colorizer = Colorizer::for_target(0, ColorSupport::Basic);
        assert_eq!(decorator.decorate("[pod/api-0/app]", &colorizer), "[pod/api-0/app]");
    }

    #[test]
    fn test_json_body_highlighting_and_fallback() {
        let highlighter = JsonHighlighter::new("nord", ColorSupport::TrueColor).unwrap();
        let decorator = LineDecorator::new(true, false, Some(highlighter.clone()));
        let colorizer = Colorizer::plain();

        let out = decorator.decorate(r#"[pod/a/b] {"level":"info"}"#, &colorizer);
        assert_eq!(
            out,
            format!("[pod/a/b] {}", highlighter.highlight(r#"{"level":"info"}"#).unwrap())
        );

        // Not JSON: the body comes back untouched
        assert_eq!(
            decorator.decorate("[pod/a/b] {broken", &colorizer),
            "[pod/a/b] {broken"
        );
    }

    #[test]
    fn test_json_body_with_unicode_whitespace() {
        let highlighter = JsonHighlighter::new("nord", ColorSupport::Ansi256).unwrap();
        let decorator = LineDecorator::new(true, false, Some(highlighter.clone()));
        let body = "{\"level\":\"info\"}\u{00a0}";

        let out = decorator.decorate(&format!("[pod/a/b] {}", body), &Colorizer::plain());
        assert_eq!(out, format!("[pod/a/b] {}", highlighter.highlight(body).unwrap()));
        assert!(out.ends_with('\u{00a0}'));
    }

    #[test]
    fn test_from_config_requires_color_for_json() {
        let mut config = AggregationConfig {
            json: true,
            logs: LogOptions {
                prefix: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(LineDecorator::from_config(&config).highlighter.is_none());

        config.color = ColorSupport::Ansi256;
        config.theme = "not-a-theme".into();
        let decorator = LineDecorator::from_config(&config);
        let highlighter = decorator.highlighter.as_ref().unwrap();
        assert_eq!(highlighter.theme().name, Theme::fallback().name);
        assert_eq!(decorator.num_parts(), 2);
    }
}
