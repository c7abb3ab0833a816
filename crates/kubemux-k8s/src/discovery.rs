use kubemux_types::{AggregationConfig, Target};
use tracing::debug;

use crate::error::DiscoveryError;
use crate::exec::Executor;
use crate::kubectl::Kubectl;

/// List candidate pods, with namespace scope and label selectors applied
/// by the control plane.
pub async fn discover_targets<E>(
    executor: &E,
    kubectl: &Kubectl,
    config: &AggregationConfig,
) -> Result<Vec<Target>, DiscoveryError>
where
    E: Executor + ?Sized,
{
    let command = kubectl.get_pods(&config.namespace, &config.labels);
    debug!(command = %command.join(" "), "discovering pods");

    let output = match executor.run_captured(&command).await {
        Ok(output) => output,
        Err(source) => return Err(DiscoveryError::Process { command, source }),
    };

    let mut targets = Vec::with_capacity(output.len());
    for line in output.iter().filter(|l| !l.trim().is_empty()) {
        match parse_target_line(line) {
            Some(target) => targets.push(target),
            None => {
                return Err(DiscoveryError::MalformedOutput {
                    command,
                    line: line.clone(),
                });
            }
        }
    }

    debug!(count = targets.len(), "discovered pods");
    Ok(targets)
}

/// Parse one `NAME NAMESPACE` listing line; extra columns are ignored
pub fn parse_target_line(line: &str) -> Option<Target> {
    let mut fields = line.split_whitespace();
    let name = fields.next()?;
    let namespace = fields.next()?;
    Some(Target::new(name, namespace))
}
