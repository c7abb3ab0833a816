//! Config file loading and resolution of the run configuration.
//!
//! Precedence for every option: command line, then environment (both
//! handled by clap), then the config file, then the built-in default.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::DateTime;
use clap::ValueEnum;
use serde::Deserialize;

use kubemux_types::{
    AggregationConfig, ClusterOptions, ColorSupport, DEFAULT_THEME, LogOptions, MatchMode,
    NamespaceScope,
};

use crate::cli::{Args, ColorChoice};

/// Contents of `config.toml`; every key is optional
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub kubectl: Option<String>,
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
    pub namespace: Option<String>,
    /// Require every query term to match
    pub all: bool,
    pub prefix: bool,
    pub json: bool,
    pub theme: Option<String>,
    /// `auto`, `always` or `never`
    pub color: Option<String>,
}

impl FileConfig {
    /// Load an explicitly requested config file; it must exist
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file at {:?}", path))?;

        toml::from_str(&contents).with_context(|| format!("parsing TOML config from {:?}", path))
    }

    /// Load the explicit file if given, otherwise the default one if present
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load_from_path(path),
            _ => Ok(Self::default()),
        }
    }

    /// Color choice from the file, if set to a known value
    pub fn color_choice(&self) -> Result<Option<ColorChoice>> {
        self.color
            .as_deref()
            .map(|value| {
                ColorChoice::from_str(value, true)
                    .map_err(|_| anyhow::anyhow!("invalid color {:?} in config file", value))
            })
            .transpose()
    }
}

/// `$XDG_CONFIG_HOME/kubemux/config.toml`, falling back to `~/.config`
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("kubemux").join("config.toml"))
}

/// Replace a lone `-` query with the whitespace separated terms read from `input`
pub fn expand_query(query: Vec<String>, input: impl Read) -> Result<Vec<String>> {
    if query.len() != 1 || query[0] != "-" {
        return Ok(query);
    }

    let mut input = input;
    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .context("reading query terms from stdin")?;
    Ok(text.split_whitespace().map(String::from).collect())
}

/// Color choice after layering the file under the command line and environment
pub fn color_choice(args: &Args, file: &FileConfig) -> Result<ColorChoice> {
    match args.color {
        Some(choice) => Ok(choice),
        None => Ok(file.color_choice()?.unwrap_or_default()),
    }
}

/// Build the fully resolved run configuration.
///
/// `args.query` must already be expanded. Fails on option combinations
/// kubectl would reject so nothing is started for a doomed run.
pub fn resolve(args: &Args, file: &FileConfig, color: ColorSupport) -> Result<AggregationConfig> {
    if args.query.is_empty() && args.labels.is_empty() {
        bail!("either pod name query or pod labels must be supplied");
    }
    if args.since.is_some() && args.since_time.is_some() {
        bail!("only one of --since or --since-time may be used");
    }
    if let Some(since_time) = &args.since_time {
        DateTime::parse_from_rfc3339(since_time)
            .with_context(|| format!("--since-time {:?} is not an RFC 3339 timestamp", since_time))?;
    }
    if args.all_namespaces && args.namespace.is_some() {
        bail!("--namespace and --all-namespaces cannot be used together");
    }

    // A namespace from the config file yields to --all-namespaces
    let namespace = if args.all_namespaces {
        NamespaceScope::All
    } else {
        match args.namespace.clone().or_else(|| file.namespace.clone()) {
            Some(ns) if !ns.is_empty() => NamespaceScope::Named(ns),
            _ => NamespaceScope::Current,
        }
    };

    let cluster = ClusterOptions {
        kubectl: args
            .kubectl
            .clone()
            .or_else(|| file.kubectl.clone())
            .unwrap_or_else(|| ClusterOptions::default().kubectl),
        kubeconfig: non_empty(args.kubeconfig.clone().or_else(|| file.kubeconfig.clone())),
        context: non_empty(args.context.clone().or_else(|| file.context.clone())),
    };

    let logs = LogOptions {
        follow: args.follow,
        previous: args.previous,
        all_containers: args.all_containers,
        timestamps: args.timestamps,
        prefix: args.prefix || file.prefix,
        container: args.container.clone(),
        limit_bytes: args.limit_bytes.clone(),
        tail: args.tail.clone(),
        since: args.since.clone(),
        since_time: args.since_time.clone(),
    };

    Ok(AggregationConfig {
        query: args.query.clone(),
        match_mode: MatchMode::from_all_flag(args.all || file.all),
        labels: args.labels.clone(),
        namespace,
        cluster,
        logs,
        json: args.json || file.json,
        theme: args
            .theme
            .clone()
            .or_else(|| file.theme.clone())
            .unwrap_or_else(|| DEFAULT_THEME.to_string()),
        color,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(query: &[&str]) -> Args {
        Args {
            query: query.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
kubectl = "/opt/bin/kubectl"
context = "staging"
namespace = "payments"
prefix = true
theme = "dracula"
color = "never"
"#
        )
        .unwrap();

        let config = FileConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.kubectl.as_deref(), Some("/opt/bin/kubectl"));
        assert_eq!(config.context.as_deref(), Some("staging"));
        assert!(config.prefix);
        assert!(!config.json);
        assert_eq!(config.color_choice().unwrap(), Some(ColorChoice::Never));
    }

    #[test]
    fn test_load_rejects_bad_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "colour = \"always\"").unwrap();
        assert!(FileConfig::load(Some(file.path())).is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(FileConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_invalid_color_value() {
        let config = FileConfig {
            color: Some("sometimes".into()),
            ..Default::default()
        };
        assert!(config.color_choice().is_err());
    }

    #[test]
    fn test_file_layers_under_args() {
        let file = FileConfig {
            kubectl: Some("/opt/bin/kubectl".into()),
            context: Some("file-ctx".into()),
            namespace: Some("file-ns".into()),
            all: true,
            json: true,
            theme: Some("gruvbox".into()),
            ..Default::default()
        };
        let mut cli = args(&["api"]);
        cli.context = Some("cli-ctx".into());
        cli.theme = Some("onedark".into());

        let config = resolve(&cli, &file, ColorSupport::Basic).unwrap();
        assert_eq!(config.cluster.kubectl, "/opt/bin/kubectl");
        assert_eq!(config.cluster.context.as_deref(), Some("cli-ctx"));
        assert_eq!(config.namespace, NamespaceScope::Named("file-ns".into()));
        assert_eq!(config.match_mode, MatchMode::All);
        assert!(config.json);
        assert_eq!(config.theme, "onedark");
        assert_eq!(config.color, ColorSupport::Basic);
    }

    #[test]
    fn test_defaults() {
        let config = resolve(&args(&["api"]), &FileConfig::default(), ColorSupport::None).unwrap();
        assert_eq!(config.cluster, ClusterOptions::default());
        assert_eq!(config.namespace, NamespaceScope::Current);
        assert_eq!(config.match_mode, MatchMode::Any);
        assert_eq!(config.theme, DEFAULT_THEME);
        assert!(!config.logs.prefix);
    }

    #[test]
    fn test_all_namespaces_overrides_file_namespace() {
        let file = FileConfig {
            namespace: Some("file-ns".into()),
            ..Default::default()
        };
        let mut cli = args(&["api"]);
        cli.all_namespaces = true;
        let config = resolve(&cli, &file, ColorSupport::None).unwrap();
        assert_eq!(config.namespace, NamespaceScope::All);

        cli.namespace = Some("prod".into());
        assert!(resolve(&cli, &file, ColorSupport::None).is_err());
    }

    #[test]
    fn test_requires_query_or_label() {
        let file = FileConfig::default();
        assert!(resolve(&args(&[]), &file, ColorSupport::None).is_err());

        let mut cli = args(&[]);
        cli.labels = vec!["app=api".into()];
        assert!(resolve(&cli, &file, ColorSupport::None).is_ok());
    }

    #[test]
    fn test_since_validation() {
        let file = FileConfig::default();
        let mut cli = args(&["api"]);
        cli.since = Some("5m".into());
        cli.since_time = Some("2024-01-01T00:00:00Z".into());
        assert!(resolve(&cli, &file, ColorSupport::None).is_err());

        cli.since = None;
        let config = resolve(&cli, &file, ColorSupport::None).unwrap();
        assert_eq!(config.logs.since_time.as_deref(), Some("2024-01-01T00:00:00Z"));

        cli.since_time = Some("yesterday".into());
        assert!(resolve(&cli, &file, ColorSupport::None).is_err());
    }

    #[test]
    fn test_expand_query_from_input() {
        let terms = expand_query(vec!["-".into()], "api  web\nworker\n".as_bytes()).unwrap();
        assert_eq!(terms, ["api", "web", "worker"]);

        let terms = expand_query(vec!["api".into()], "ignored".as_bytes()).unwrap();
        assert_eq!(terms, ["api"]);

        let terms = expand_query(vec!["-".into(), "api".into()], "ignored".as_bytes()).unwrap();
        assert_eq!(terms, ["-", "api"]);
    }
}
