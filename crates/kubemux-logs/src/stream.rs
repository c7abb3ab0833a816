use std::sync::Arc;

use futures::future::join_all;
use kubemux_k8s::{CompletionReceiver, Executor, Kubectl, LineReceiver, discover_targets};
use kubemux_types::{AggregationConfig, Target};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::decorate::LineDecorator;
use crate::error::AggregateError;
use crate::filter::TargetFilter;
use crate::palette::Colorizer;

/// Capacity of the merged output channel
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle of one aggregation run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Discovering,
    Filtering,
    Streaming,
    /// Every stream has ended, output is being closed
    Draining,
    /// Output channel closed
    Done,
    Failed,
}

/// Consumer side of a running aggregation
pub struct AggregatedLogs {
    /// Decorated lines from every target, closed once every stream has ended
    pub lines: mpsc::Receiver<String>,

    /// Terminal conditions of the underlying streams. A stream may report
    /// `Ok(())` at end of output and then an error if its process failed,
    /// so keep draining this after `lines` closes if late failures matter.
    pub errors: CompletionReceiver,

    /// Targets being streamed, in color assignment order
    pub targets: Vec<Target>,
}

/// Per-target state, owned by the task servicing that target
struct StreamSession {
    target: Target,
    colorizer: Colorizer,
    lines: LineReceiver,
}

impl StreamSession {
    async fn run(
        mut self,
        decorator: Arc<LineDecorator>,
        output: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) {
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                line = self.lines.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };

            let decorated = decorator.decorate(&line, &self.colorizer);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = output.send(decorated) => {
                    if sent.is_err() {
                        // Output receiver dropped
                        break;
                    }
                }
            }
        }
        trace!(pod = %self.target.name, namespace = %self.target.namespace, "stream session ended");
    }
}

/// Discovers pods and merges their log streams into one channel
pub struct LogAggregator<E> {
    executor: Arc<E>,

    /// Cancellation token for stopping streams
    cancel: CancellationToken,

    /// Coordinating task handles, one per run
    tasks: Vec<JoinHandle<()>>,

    phase_tx: Arc<watch::Sender<Phase>>,
}

impl<E> LogAggregator<E>
where
    E: Executor + 'static,
{
    pub fn new(executor: Arc<E>) -> Self {
        let (phase_tx, _) = watch::channel(Phase::Idle);
        Self {
            executor,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            phase_tx: Arc::new(phase_tx),
        }
    }

    /// Token that cancels every run started by this aggregator
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Watch the phase of the most recent run
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        *self.phase_tx.borrow()
    }

    /// Discover, filter and start streaming every matching pod.
    ///
    /// Returns once all streams are launched. Any failure up to that point
    /// is fatal and no stream of this run survives it.
    pub async fn start(
        &mut self,
        config: &AggregationConfig,
    ) -> Result<AggregatedLogs, AggregateError> {
        let run = self.cancel.child_token();
        let result = self.launch(config, &run).await;
        if result.is_err() {
            run.cancel();
            self.phase_tx.send_replace(Phase::Failed);
        }
        result
    }

    async fn launch(
        &mut self,
        config: &AggregationConfig,
        run: &CancellationToken,
    ) -> Result<AggregatedLogs, AggregateError> {
        let kubectl = Kubectl::from(config);

        self.phase_tx.send_replace(Phase::Discovering);
        let discovered = tokio::select! {
            biased;
            _ = run.cancelled() => return Err(AggregateError::Cancelled),
            discovered = discover_targets(self.executor.as_ref(), &kubectl, config) => discovered?,
        };

        self.phase_tx.send_replace(Phase::Filtering);
        let targets = TargetFilter::from_config(config).apply(discovered)?;
        debug!(count = targets.len(), "streaming pods");

        self.phase_tx.send_replace(Phase::Streaming);
        let decorator = Arc::new(LineDecorator::from_config(config));
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        // Launch everything before spawning any servicing task so a launch
        // failure leaves nothing behind but cancelled processes
        let mut sessions = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            let command = kubectl.logs(&config.logs, target);
            let lines = self
                .executor
                .stream(&command, errors_tx.clone(), run.clone())
                .map_err(|source| AggregateError::StreamLaunch {
                    command: command.clone(),
                    target: target.clone(),
                    source,
                })?;

            debug!(pod = %target.name, namespace = %target.namespace, "log stream started");
            sessions.push(StreamSession {
                target: target.clone(),
                colorizer: Colorizer::for_target(index, config.color),
                lines,
            });
        }
        drop(errors_tx);

        let handles: Vec<JoinHandle<()>> = sessions
            .into_iter()
            .map(|session| {
                tokio::spawn(session.run(
                    Arc::clone(&decorator),
                    output_tx.clone(),
                    run.clone(),
                ))
            })
            .collect();

        // Coordinator: the output closes when the last session ends
        let phase_tx = Arc::clone(&self.phase_tx);
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(tokio::spawn(async move {
            join_all(handles).await;
            phase_tx.send_replace(Phase::Draining);
            drop(output_tx);
            phase_tx.send_replace(Phase::Done);
            debug!("all log streams finished");
        }));

        Ok(AggregatedLogs {
            lines: output_rx,
            errors: errors_rx,
            targets,
        })
    }

    /// Stop all streams and terminate their processes
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.tasks.clear();
        // Create a fresh cancellation token for future runs
        self.cancel = CancellationToken::new();
    }

    /// Check if any run is still streaming
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }
}

impl<E> Drop for LogAggregator<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
