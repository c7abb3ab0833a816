//! Shared types for kubemux
//!
//! This crate contains data structures used across multiple kubemux crates.

use serde::Serialize;
use std::fmt;

// ============================================================================
// Kubernetes Resource Types
// ============================================================================

/// One addressable log source selected for aggregation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub name: String,
    pub namespace: String,
}

impl Target {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Which namespaces pod discovery looks at
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "name")]
pub enum NamespaceScope {
    /// Whatever namespace the kubeconfig context defaults to
    #[default]
    Current,
    /// A single named namespace
    Named(String),
    /// Every namespace in the cluster
    All,
}

// ============================================================================
// Selection
// ============================================================================

/// How query terms are combined when matching pod names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// At least one term must be a substring of the pod name
    #[default]
    Any,
    /// Every term must be a substring of the pod name
    All,
}

impl MatchMode {
    pub fn from_all_flag(all: bool) -> Self {
        if all { Self::All } else { Self::Any }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::All => "all",
        }
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// Color capability of the output destination
///
/// Ordered from least to most capable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum ColorSupport {
    /// Not a terminal, or color explicitly disabled
    #[default]
    None,
    /// The basic 16 ANSI colors
    Basic,
    /// The 256 color xterm palette
    Ansi256,
    /// 24-bit RGB
    TrueColor,
}

impl ColorSupport {
    /// Formatter token for this capability, empty when color is unsupported
    pub fn token(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Basic => "terminal",
            Self::Ansi256 => "terminal256",
            Self::TrueColor => "terminal16m",
        }
    }

    /// Parse a formatter token back into a capability
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "" => Some(Self::None),
            "terminal" | "terminal16" => Some(Self::Basic),
            "terminal256" => Some(Self::Ansi256),
            "terminal16m" => Some(Self::TrueColor),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != Self::None
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Options prepended to every kubectl invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClusterOptions {
    /// Program used as argv[0]
    pub kubectl: String,
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            kubeconfig: None,
            context: None,
        }
    }
}

/// Per-target flags passed through to `kubectl logs`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogOptions {
    pub follow: bool,
    pub previous: bool,
    pub all_containers: bool,
    /// Upstream prepends an RFC 3339 timestamp token to each line
    pub timestamps: bool,
    /// Upstream prepends a `[pod/name/container]` token to each line
    pub prefix: bool,
    pub container: Option<String>,
    pub limit_bytes: Option<String>,
    pub tail: Option<String>,
    pub since: Option<String>,
    pub since_time: Option<String>,
}

/// Fully resolved description of one aggregation run
///
/// Built once by the CLI layer with every default and override applied,
/// then only read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AggregationConfig {
    /// Pod name query terms, case-sensitive substrings
    pub query: Vec<String>,
    pub match_mode: MatchMode,
    /// Label selectors, each passed as its own `-l`
    pub labels: Vec<String>,
    pub namespace: NamespaceScope,
    pub cluster: ClusterOptions,
    pub logs: LogOptions,
    /// Highlight JSON log bodies (only honoured on color destinations)
    pub json: bool,
    pub theme: String,
    pub color: ColorSupport,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            query: Vec::new(),
            match_mode: MatchMode::Any,
            labels: Vec::new(),
            namespace: NamespaceScope::Current,
            cluster: ClusterOptions::default(),
            logs: LogOptions::default(),
            json: false,
            theme: DEFAULT_THEME.to_string(),
            color: ColorSupport::None,
        }
    }
}

/// Highlight theme used when none is configured
pub const DEFAULT_THEME: &str = "nord";
