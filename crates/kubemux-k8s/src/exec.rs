//! External command execution.
//!
//! Two shapes are supported: run a command to completion and collect its
//! stdout lines, or start it and receive stdout line by line on a channel
//! while it keeps running.
//!
//! A streaming command reports how it ended on a separate completion
//! channel, and may report twice:
//! - once when stdout reaches end of stream (`Ok(())`, or the read error),
//! - again, only if the process then exits unsuccessfully, with an error
//!   built from everything it wrote to stderr.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{LaunchError, ProcessError};

/// Capacity of each per-process line channel
const LINE_CHANNEL_CAPACITY: usize = 16;

/// Lines of a streaming command's stdout, in production order
pub type LineReceiver = mpsc::Receiver<String>;

/// Terminal condition of a streaming command
pub type Completion = Result<(), ProcessError>;
pub type CompletionSender = mpsc::UnboundedSender<Completion>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

/// Runs external commands.
///
/// Production code uses [`ProcessExecutor`]; tests can provide their own
/// implementation that doesn't spawn real processes.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `command` to completion and return its stdout split into lines,
    /// with trailing whitespace trimmed.
    async fn run_captured(&self, command: &[String]) -> Result<Vec<String>, ProcessError>;

    /// Start `command` and deliver its stdout line by line.
    ///
    /// Terminal conditions are written to `completion`, which may be shared
    /// by many streams. Cancelling `cancel` stops delivery and terminates
    /// the process. Launch failures are returned here, never on the
    /// channels.
    fn stream(
        &self,
        command: &[String],
        completion: CompletionSender,
        cancel: CancellationToken,
    ) -> Result<LineReceiver, LaunchError>;

    /// Like [`Executor::stream`], with a completion channel of its own.
    fn run_streaming(
        &self,
        command: &[String],
        cancel: CancellationToken,
    ) -> Result<(LineReceiver, CompletionReceiver), LaunchError> {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let lines = self.stream(command, completion_tx, cancel)?;
        Ok((lines, completion_rx))
    }
}

/// Executor backed by real OS processes
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn run_captured(&self, command: &[String]) -> Result<Vec<String>, ProcessError> {
        let mut cmd = build_command(command)?;
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        debug!(command = %command.join(" "), "running command");
        let output = cmd.output().await.map_err(|source| LaunchError::Spawn {
            program: command[0].clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ProcessError::Exit {
                command: command.to_vec(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end().lines().map(str::to_string).collect())
    }

    fn stream(
        &self,
        command: &[String],
        completion: CompletionSender,
        cancel: CancellationToken,
    ) -> Result<LineReceiver, LaunchError> {
        let mut cmd = build_command(command)?;
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let program = command[0].clone();
        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: program.clone(),
            source,
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or(LaunchError::NoStdout { program })?;

        // Stderr is collected on the side and only surfaces if the exit fails
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            match stderr {
                Some(stderr) => read_to_string_lossy(stderr).await,
                None => String::new(),
            }
        });

        debug!(command = %command.join(" "), pid = ?child.id(), "started streaming command");

        let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        tokio::spawn(pump_lines(
            StreamingChild {
                command: command.to_vec(),
                child,
                stderr_task,
            },
            stdout,
            line_tx,
            completion,
            cancel,
        ));

        Ok(line_rx)
    }
}

/// A running streaming process and what is needed to report its exit
struct StreamingChild {
    command: Vec<String>,
    child: Child,
    stderr_task: JoinHandle<String>,
}

impl StreamingChild {
    fn kill(&mut self, reason: &str) {
        if let Err(e) = self.child.start_kill() {
            // Already exited is fine
            trace!(command = %self.command.join(" "), error = %e, "kill after {}", reason);
        } else {
            debug!(command = %self.command.join(" "), "killed process after {}", reason);
        }
    }
}

async fn pump_lines(
    mut process: StreamingChild,
    stdout: ChildStdout,
    lines: mpsc::Sender<String>,
    completion: CompletionSender,
    cancel: CancellationToken,
) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    let read_result = loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                process.kill("cancellation");
                return;
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => break Ok(()),
            Ok(_) => {
                let line = decode_line(&buf);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        process.kill("cancellation");
                        return;
                    }
                    sent = lines.send(line) => {
                        if sent.is_err() {
                            // Nobody is listening any more
                            process.kill("receiver dropped");
                            return;
                        }
                    }
                }
            }
            Err(source) => break Err(source),
        }
    };

    // End of stdout: close the line channel before reporting
    drop(lines);
    let _ = completion.send(read_result.map_err(|source| ProcessError::Read {
        command: process.command.clone(),
        source,
    }));

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            process.kill("cancellation");
            return;
        }
        status = process.child.wait() => status,
    };

    match status {
        Ok(status) if status.success() => {
            debug!(command = %process.command.join(" "), "command exited cleanly");
        }
        Ok(status) => {
            // Stderr can outlive the process when a descendant inherits it
            let stderr = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    process.stderr_task.abort();
                    trace!(command = %process.command.join(" "), "stderr collection cancelled");
                    return;
                }
                stderr = &mut process.stderr_task => stderr.unwrap_or_default(),
            };
            warn!(
                command = %process.command.join(" "),
                code = ?status.code(),
                "command exited unsuccessfully"
            );
            let _ = completion.send(Err(ProcessError::Exit {
                command: process.command,
                code: status.code(),
                stderr: stderr.trim_end().to_string(),
            }));
        }
        Err(source) => {
            let _ = completion.send(Err(ProcessError::Wait {
                command: process.command,
                source,
            }));
        }
    }
}

fn build_command(command: &[String]) -> Result<Command, LaunchError> {
    let (program, args) = command.split_first().ok_or(LaunchError::EmptyCommand)?;
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
    Ok(cmd)
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

async fn read_to_string_lossy(mut reader: impl AsyncRead + Unpin) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}
