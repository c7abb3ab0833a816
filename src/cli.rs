use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{Parser, ValueEnum};

/// kubemux - Tail logs from every Kubernetes pod matching a query
///
/// Pods are selected by name query terms, label selectors, or both. One
/// `kubectl logs` process is started per pod and their lines are merged
/// onto stdout.
#[derive(Parser, Debug, Default)]
#[command(name = "kubemux")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Example: kubemux -f service-one service-two")]
pub struct Args {
    /// Case-sensitive pod name search terms. Pass "-" to read terms from stdin
    #[arg(value_name = "QUERY")]
    pub query: Vec<String>,

    /// All query terms must match. Default is any term
    #[arg(short = 'a', long, env = "KUBEMUX_ALL", value_parser = FalseyValueParser::new())]
    pub all: bool,

    /// Filter pods by label, repeat to add selectors
    #[arg(short = 'l', long = "label", value_name = "SELECTOR")]
    pub labels: Vec<String>,

    /// Namespace pods must be in. Default is the context's namespace
    #[arg(short = 'n', long, env = "KUBEMUX_NAMESPACE")]
    pub namespace: Option<String>,

    /// Query for pods in all namespaces
    #[arg(long)]
    pub all_namespaces: bool,

    /// Follow log output
    #[arg(short = 'f', long)]
    pub follow: bool,

    /// Print the logs of the previous container instance
    #[arg(long)]
    pub previous: bool,

    /// Get all containers' logs in the pods
    #[arg(long)]
    pub all_containers: bool,

    /// Include timestamps on each line
    #[arg(long)]
    pub timestamps: bool,

    /// Prefix each line with its pod and container name
    #[arg(short = 'p', long, env = "KUBEMUX_PREFIX", value_parser = FalseyValueParser::new())]
    pub prefix: bool,

    /// Print the logs of this container
    #[arg(short = 'c', long)]
    pub container: Option<String>,

    /// Maximum bytes of logs to return per pod
    #[arg(long, value_name = "BYTES")]
    pub limit_bytes: Option<String>,

    /// Lines of recent log file to display per pod
    #[arg(long, value_name = "LINES")]
    pub tail: Option<String>,

    /// Only return logs newer than a relative duration like 5s, 2m or 3h
    #[arg(short = 's', long, value_name = "DURATION")]
    pub since: Option<String>,

    /// Only return logs after a specific date (RFC 3339)
    #[arg(long, value_name = "TIME")]
    pub since_time: Option<String>,

    /// Highlight JSON log bodies (color output only)
    #[arg(short = 'j', long, env = "KUBEMUX_JSON", value_parser = FalseyValueParser::new())]
    pub json: bool,

    /// Theme for JSON highlighting, see --list-themes
    #[arg(short = 't', long, env = "KUBEMUX_THEME")]
    pub theme: Option<String>,

    /// List the JSON highlighting themes and exit
    #[arg(long)]
    pub list_themes: bool,

    /// When to color output
    #[arg(long, env = "KUBEMUX_COLOR", value_enum)]
    pub color: Option<ColorChoice>,

    /// Path to the kubeconfig file
    #[arg(short = 'k', long, env = "KUBECONFIG", value_name = "PATH")]
    pub kubeconfig: Option<String>,

    /// The name of the kubeconfig context to use
    #[arg(short = 'C', long, env = "KUBEMUX_CONTEXT")]
    pub context: Option<String>,

    /// kubectl program to run
    #[arg(long, env = "KUBEMUX_KUBECTL", value_name = "PROGRAM")]
    pub kubectl: Option<String>,

    /// Config file. Default is $XDG_CONFIG_HOME/kubemux/config.toml
    #[arg(long, env = "KUBEMUX_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when stdout is a color capable terminal
    #[default]
    Auto,
    Always,
    Never,
}
