#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use kubemux_k8s::{CompletionSender, Executor, LaunchError, LineReceiver, ProcessError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The test's end of one fake `kubectl logs` process
pub struct FakeStream {
    pub command: Vec<String>,
    pub lines: mpsc::Sender<String>,
    pub completion: CompletionSender,
    pub cancel: CancellationToken,
}

impl FakeStream {
    /// Pod name, the last argument of the logs command
    pub fn pod(&self) -> &str {
        self.command.last().map(String::as_str).unwrap_or_default()
    }

    pub async fn emit(&self, line: &str) {
        self.lines.send(line.to_string()).await.unwrap();
    }
}

#[derive(Default)]
struct Recorded {
    captured: Vec<Vec<String>>,
    streams: Vec<FakeStream>,
}

/// A fake executor that:
/// - answers the pod listing with canned output (or a failure)
/// - hands every started stream to the test instead of spawning a process
pub struct FakeExecutor {
    listing: Result<Vec<String>, String>,
    fail_launch_for: Option<String>,
    recorded: Mutex<Recorded>,
}

impl FakeExecutor {
    pub fn with_pods(lines: &[&str]) -> Self {
        Self {
            listing: Ok(lines.iter().map(|s| s.to_string()).collect()),
            fail_launch_for: None,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn failing_discovery(stderr: &str) -> Self {
        Self {
            listing: Err(stderr.to_string()),
            fail_launch_for: None,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Make the stream for `pod` fail to launch
    pub fn fail_launch_for(mut self, pod: &str) -> Self {
        self.fail_launch_for = Some(pod.to_string());
        self
    }

    pub fn captured_commands(&self) -> Vec<Vec<String>> {
        self.recorded.lock().unwrap().captured.clone()
    }

    pub fn stream_count(&self) -> usize {
        self.recorded.lock().unwrap().streams.len()
    }

    /// Take ownership of every stream started so far, in start order
    pub fn take_streams(&self) -> Vec<FakeStream> {
        std::mem::take(&mut self.recorded.lock().unwrap().streams)
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn run_captured(&self, command: &[String]) -> Result<Vec<String>, ProcessError> {
        self.recorded.lock().unwrap().captured.push(command.to_vec());
        self.listing.clone().map_err(|stderr| ProcessError::Exit {
            command: command.to_vec(),
            code: Some(1),
            stderr,
        })
    }

    fn stream(
        &self,
        command: &[String],
        completion: CompletionSender,
        cancel: CancellationToken,
    ) -> Result<LineReceiver, LaunchError> {
        if let Some(pod) = &self.fail_launch_for {
            if command.last() == Some(pod) {
                return Err(LaunchError::Spawn {
                    program: command[0].clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
        }

        let (tx, rx) = mpsc::channel(16);
        self.recorded.lock().unwrap().streams.push(FakeStream {
            command: command.to_vec(),
            lines: tx,
            completion,
            cancel,
        });
        Ok(rx)
    }
}
