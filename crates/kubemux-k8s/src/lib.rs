//! kubectl integration for kubemux
//!
//! This crate runs external commands (one-shot or as continuous line
//! streams), builds the kubectl invocations kubemux needs, and discovers
//! the pods to tail.

mod discovery;
mod error;
mod exec;
mod kubectl;

pub use discovery::{discover_targets, parse_target_line};
pub use error::{DiscoveryError, LaunchError, ProcessError};
pub use exec::{
    Completion, CompletionReceiver, CompletionSender, Executor, LineReceiver, ProcessExecutor,
};
pub use kubectl::Kubectl;

// Re-export types that are used in our public API
pub use kubemux_types::{AggregationConfig, ClusterOptions, LogOptions, NamespaceScope, Target};
