use std::io;

use thiserror::Error;

/// A subprocess could not be started
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("cannot run an empty command")]
    EmptyCommand,

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to attach to stdout of `{program}`")]
    NoStdout { program: String },
}

/// A subprocess ran but did not finish cleanly
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Non-zero or signal exit; `stderr` holds whatever the process wrote there
    #[error("{}", exit_message(.code, .stderr))]
    Exit {
        command: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed reading output of `{}`: {source}", .command.join(" "))]
    Read {
        command: Vec<String>,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for `{}`: {source}", .command.join(" "))]
    Wait {
        command: Vec<String>,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// The argv of the failed command, when known
    pub fn command(&self) -> Option<&[String]> {
        match self {
            Self::Launch(_) => None,
            Self::Exit { command, .. } | Self::Read { command, .. } | Self::Wait { command, .. } => {
                Some(command)
            }
        }
    }
}

fn exit_message(code: &Option<i32>, stderr: &str) -> String {
    match (code, stderr.is_empty()) {
        (_, false) => stderr.to_string(),
        (Some(code), true) => format!("exit status {}", code),
        (None, true) => "terminated by signal".to_string(),
    }
}

/// Pod discovery failed
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("listing pods failed: {source}")]
    Process {
        command: Vec<String>,
        #[source]
        source: ProcessError,
    },

    #[error("unexpected pod listing line {line:?}: expected name and namespace")]
    MalformedOutput { command: Vec<String>, line: String },
}

impl DiscoveryError {
    /// The listing command that was attempted
    pub fn command(&self) -> &[String] {
        match self {
            Self::Process { command, .. } | Self::MalformedOutput { command, .. } => command,
        }
    }
}
