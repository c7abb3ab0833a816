mod cli;
mod config;
mod terminal;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use kubemux_k8s::{ProcessError, ProcessExecutor};
use kubemux_logs::{
    AggregateError, AggregatedLogs, AggregationConfig, ColorSupport, JsonHighlighter,
    LogAggregator, THEMES, Theme, stream_diagnostic,
};

use crate::cli::Args;
use crate::config::FileConfig;

/// Environment variable holding the tracing filter
const LOG_ENV: &str = "KUBEMUX_LOG";

/// Sample document rendered by `--list-themes`
const THEME_SAMPLE: &str =
    r#"{"string":"test","number":123,"array":["1",2],"obj":{"foo":"bar"},"null":null,"bool":true}"#;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Diagnostics go to stderr so stdout only carries log lines
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            report(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(mut args: Args) -> Result<ExitCode> {
    let file = FileConfig::load(args.config.as_deref())?;
    let color = terminal::stdout_color(config::color_choice(&args, &file)?);

    if args.list_themes {
        list_themes(color)?;
        return Ok(ExitCode::SUCCESS);
    }

    args.query = config::expand_query(std::mem::take(&mut args.query), io::stdin().lock())?;
    let config = config::resolve(&args, &file, color)?;
    debug!(?config, "resolved configuration");

    stream_logs(config).await
}

async fn stream_logs(config: AggregationConfig) -> Result<ExitCode> {
    let mut aggregator = LogAggregator::new(Arc::new(ProcessExecutor::new()));

    let cancel = aggregator.cancellation_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        debug!("shutdown signal received");
        cancel.cancel();
    });

    let mut logs = match aggregator.start(&config).await {
        Ok(logs) => logs,
        Err(AggregateError::Cancelled) => return Ok(ExitCode::SUCCESS),
        Err(err) => {
            report_diagnostic(&err.diagnostic());
            return Ok(ExitCode::FAILURE);
        }
    };

    match forward_output(&mut logs, &mut io::stdout()).await {
        Ok(Outcome::Finished | Outcome::BrokenPipe) => Ok(ExitCode::SUCCESS),
        Ok(Outcome::StreamFailed(err)) => {
            aggregator.stop();
            report_diagnostic(&stream_diagnostic(&err));
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            aggregator.stop();
            Err(err).context("writing to stdout")
        }
    }
}

/// How the output loop ended
#[derive(Debug)]
enum Outcome {
    /// Every stream ended and none of them failed
    Finished,
    StreamFailed(ProcessError),
    /// The reader of our output went away
    BrokenPipe,
}

/// Print lines until every stream has ended, or stop at the first stream failure.
///
/// A process can fail after its output has closed, so the error channel is
/// drained to its end even once `lines` is closed.
async fn forward_output(logs: &mut AggregatedLogs, out: &mut impl Write) -> io::Result<Outcome> {
    let mut lines_open = true;
    let mut errors_open = true;

    while lines_open || errors_open {
        tokio::select! {
            line = logs.lines.recv(), if lines_open => match line {
                Some(line) => {
                    if let Err(err) = writeln!(out, "{}", line) {
                        if err.kind() == io::ErrorKind::BrokenPipe {
                            return Ok(Outcome::BrokenPipe);
                        }
                        return Err(err);
                    }
                }
                None => lines_open = false,
            },
            completion = logs.errors.recv(), if errors_open => match completion {
                Some(Ok(())) => {}
                Some(Err(err)) => return Ok(Outcome::StreamFailed(err)),
                None => errors_open = false,
            },
        }
    }

    Ok(Outcome::Finished)
}

fn list_themes(color: ColorSupport) -> Result<()> {
    let mut stdout = io::stdout().lock();

    if !color.is_enabled() {
        for name in Theme::names() {
            writeln!(stdout, "{}", name)?;
        }
        return Ok(());
    }

    let width = Theme::names().map(str::len).max().unwrap_or_default();
    for theme in THEMES {
        let sample = JsonHighlighter::with_theme(theme, color)
            .and_then(|h| h.highlight(THEME_SAMPLE))
            .unwrap_or_else(|_| THEME_SAMPLE.to_string());
        writeln!(stdout, "{:<width$}  {}", theme.name, sample, width = width)?;
    }
    Ok(())
}

fn report_diagnostic(payload: &Value) {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    report(&text);
}

/// Write a fatal message to stderr, red on a color terminal
fn report(message: &str) {
    if terminal::stderr_is_color() {
        eprintln!("{}", message.red());
    } else {
        eprintln!("{}", message);
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut terminate), Ok(mut quit)) =
        (signal(SignalKind::terminate()), signal(SignalKind::quit()))
    else {
        let _ = tokio::signal::ctrl_c().await;
        return;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
