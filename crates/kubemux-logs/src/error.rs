use kubemux_k8s::{DiscoveryError, LaunchError, ProcessError};
use kubemux_types::{MatchMode, NamespaceScope, Target};
use serde_json::{Value, json};
use thiserror::Error;

/// Discovery and filtering left nothing to stream
#[derive(Debug, Error)]
#[error("no available pods match query terms")]
pub struct NoTargetsError {
    pub query: Vec<String>,
    pub labels: Vec<String>,
    pub match_mode: MatchMode,
    pub namespace: NamespaceScope,
}

/// Fatal failure of an aggregation run
///
/// All variants stop the run before (or instead of) streaming.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("listing pods failed: {source}")]
    Discovery {
        command: Vec<String>,
        #[source]
        source: ProcessError,
    },

    #[error("unexpected pod listing line {line:?}")]
    MalformedOutput { command: Vec<String>, line: String },

    #[error(transparent)]
    NoTargets(#[from] NoTargetsError),

    #[error("failed to stream logs of {target}: {source}")]
    StreamLaunch {
        command: Vec<String>,
        target: Target,
        #[source]
        source: LaunchError,
    },

    #[error("aggregation cancelled")]
    Cancelled,
}

impl From<DiscoveryError> for AggregateError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::Process { command, source } => Self::Discovery { command, source },
            DiscoveryError::MalformedOutput { command, line } => {
                Self::MalformedOutput { command, line }
            }
        }
    }
}

impl AggregateError {
    /// Machine readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "get_pods_error",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::NoTargets(_) => "no_pods_found",
            Self::StreamLaunch { .. } => "logs_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// The command that was being attempted, if any
    pub fn command(&self) -> &[String] {
        match self {
            Self::Discovery { command, .. }
            | Self::MalformedOutput { command, .. }
            | Self::StreamLaunch { command, .. } => command,
            Self::NoTargets(_) | Self::Cancelled => &[],
        }
    }

    /// Structured payload for reporting the failure to the user
    pub fn diagnostic(&self) -> Value {
        let mut payload = json!({
            "code": self.code(),
            "command": self.command(),
        });

        match self {
            Self::Discovery { source, .. } => {
                payload["error"] = json!(source.to_string());
            }
            Self::MalformedOutput { line, .. } => {
                payload["error"] = json!(self.to_string());
                payload["line"] = json!(line);
            }
            Self::NoTargets(err) => {
                payload["error"] = json!(err.to_string());
                payload["query"] = json!(err.query);
                payload["labels"] = json!(err.labels);
                payload["match_mode"] = json!(err.match_mode);
                payload["namespace"] = json!(err.namespace);
            }
            Self::StreamLaunch { target, source, .. } => {
                payload["error"] = json!(source.to_string());
                payload["pod"] = json!(target);
            }
            Self::Cancelled => {
                payload["error"] = json!(self.to_string());
            }
        }
        payload
    }
}

/// Structured payload for a stream that failed after it started
pub fn stream_diagnostic(err: &ProcessError) -> Value {
    json!({
        "code": "logs_error",
        "command": err.command().unwrap_or_default(),
        "error": err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_diagnostic() {
        let err = AggregateError::from(DiscoveryError::Process {
            command: vec!["kubectl".into(), "get".into(), "pods".into()],
            source: ProcessError::Exit {
                command: vec!["kubectl".into()],
                code: Some(1),
                stderr: "Unable to connect to the server".into(),
            },
        });
        let payload = err.diagnostic();
        assert_eq!(payload["code"], "get_pods_error");
        assert_eq!(payload["command"], json!(["kubectl", "get", "pods"]));
        assert_eq!(payload["error"], "Unable to connect to the server");
    }

    #[test]
    fn test_no_targets_diagnostic_carries_inputs() {
        let err = AggregateError::from(NoTargetsError {
            query: vec!["api".into()],
            labels: vec!["tier=web".into()],
            match_mode: MatchMode::All,
            namespace: NamespaceScope::Named("prod".into()),
        });
        let payload = err.diagnostic();
        assert_eq!(payload["code"], "no_pods_found");
        assert_eq!(payload["query"], json!(["api"]));
        assert_eq!(payload["labels"], json!(["tier=web"]));
        assert_eq!(payload["match_mode"], "all");
        assert_eq!(payload["namespace"], json!({"scope": "named", "name": "prod"}));
        assert_eq!(payload["command"], json!([]));
    }

    #[test]
    fn test_stream_launch_diagnostic_names_pod() {
        let err = AggregateError::StreamLaunch {
            command: vec!["kubectl".into(), "logs".into()],
            target: Target::new("api-0", "prod"),
            source: LaunchError::NoStdout {
                program: "kubectl".into(),
            },
        };
        let payload = err.diagnostic();
        assert_eq!(payload["code"], "logs_error");
        assert_eq!(payload["pod"], json!({"name": "api-0", "namespace": "prod"}));
    }

    #[test]
    fn test_stream_diagnostic() {
        let payload = stream_diagnostic(&ProcessError::Exit {
            command: vec!["kubectl".into(), "logs".into(), "api-0".into()],
            code: Some(1),
            stderr: String::new(),
        });
        assert_eq!(payload["code"], "logs_error");
        assert_eq!(payload["command"], json!(["kubectl", "logs", "api-0"]));
        assert_eq!(payload["error"], "exit status 1");
    }
}
