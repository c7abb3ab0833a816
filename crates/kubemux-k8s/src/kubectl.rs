//! kubectl invocations
//!
//! Flag spellings are kubectl's own and must stay byte-for-byte identical.

use kubemux_types::{AggregationConfig, ClusterOptions, LogOptions, NamespaceScope, Target};

/// Columns requested from `kubectl get pods`: name, then namespace
const POD_COLUMNS: &str = "custom-columns=:metadata.name,:metadata.namespace";

/// Builds kubectl argv vectors sharing one set of cluster options
#[derive(Clone, Debug)]
pub struct Kubectl {
    base: Vec<String>,
}

impl Kubectl {
    pub fn new(cluster: &ClusterOptions) -> Self {
        let mut base = vec![cluster.kubectl.clone()];
        push_opt(&mut base, "--kubeconfig", &cluster.kubeconfig);
        push_opt(&mut base, "--context", &cluster.context);
        Self { base }
    }

    /// `get pods` listing name and namespace, scoped by namespace and labels
    pub fn get_pods(&self, namespace: &NamespaceScope, labels: &[String]) -> Vec<String> {
        let mut cmd = self.base.clone();
        cmd.extend(["get", "pods", "-o", POD_COLUMNS].map(String::from));

        match namespace {
            NamespaceScope::Current => {}
            NamespaceScope::Named(ns) => {
                cmd.push("--namespace".to_string());
                cmd.push(ns.clone());
            }
            NamespaceScope::All => cmd.push("--all-namespaces".to_string()),
        }

        for label in labels {
            cmd.push("-l".to_string());
            cmd.push(label.clone());
        }
        cmd
    }

    /// `logs` for one pod with the per-target flags applied
    pub fn logs(&self, options: &LogOptions, target: &Target) -> Vec<String> {
        let mut cmd = self.base.clone();
        cmd.push("logs".to_string());

        let flags = [
            ("--all-containers", options.all_containers),
            ("--follow", options.follow),
            ("--prefix", options.prefix),
            ("--previous", options.previous),
            ("--timestamps", options.timestamps),
        ];
        for (flag, enabled) in flags {
            if enabled {
                cmd.push(flag.to_string());
            }
        }

        push_opt(&mut cmd, "--container", &options.container);
        push_opt(&mut cmd, "--limit-bytes", &options.limit_bytes);
        push_opt(&mut cmd, "--since", &options.since);
        push_opt(&mut cmd, "--since-time", &options.since_time);
        push_opt(&mut cmd, "--tail", &options.tail);

        cmd.push("-n".to_string());
        cmd.push(target.namespace.clone());
        cmd.push(target.name.clone());
        cmd
    }
}

impl From<&AggregationConfig> for Kubectl {
    fn from(config: &AggregationConfig) -> Self {
        Self::new(&config.cluster)
    }
}

fn push_opt(cmd: &mut Vec<String>, flag: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        cmd.push(flag.to_string());
        cmd.push(value.to_string());
    }
}
