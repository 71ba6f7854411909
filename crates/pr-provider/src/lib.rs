//! Provider adapter: spawns an external review tool, streams its stdout as
//! suggestion events, and tears it down on exit or cancel.
//!
//! A provider is an external process invoked once per voice. The adapter
//! does not know which provider it is talking to beyond the argv/env it was
//! handed; it only assumes the boundary protocol described in [`parse`].

mod lib_output_helpers;
mod parse;

use anyhow::Context;
use pr_core::AppError;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

pub use parse::{RawSuggestion, SuggestionEvent};

use lib_output_helpers::{
    DEFAULT_HEARTBEAT_SECS, HEARTBEAT_INTERVAL_ENV, maybe_emit_heartbeat, resolve_heartbeat_interval,
};

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_STDIN_WRITE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CANCEL_GRACE_SECS: u64 = 5;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);
const STDERR_TAIL_MAX_BYTES: usize = 4096;

/// Spawn-time process control options.
#[derive(Debug, Clone, Copy)]
pub struct SpawnOptions {
    pub stdin_write_timeout: Duration,
    pub idle_timeout: Duration,
    pub cancel_grace: Duration,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            stdin_write_timeout: Duration::from_secs(DEFAULT_STDIN_WRITE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            cancel_grace: Duration::from_secs(DEFAULT_CANCEL_GRACE_SECS),
        }
    }
}

/// Outcome of a provider process after it has fully exited.
#[derive(Debug, Clone)]
pub enum ExitOutcome {
    Completed,
    Failed { stderr_tail: String },
    Cancelled,
}

/// A handle to a running provider process: a live event stream plus a
/// cancel trigger. Dropping this without calling [`ProviderHandle::exit`]
/// still reaps the child (`kill_on_drop`), but callers should always await
/// `exit` to learn the outcome.
pub struct ProviderHandle {
    pub pid: Option<u32>,
    events: mpsc::Receiver<SuggestionEvent>,
    cancel_tx: watch::Sender<bool>,
    join: tokio::task::JoinHandle<Result<ExitOutcome, AppError>>,
}

impl ProviderHandle {
    /// Pull the next suggestion event. Returns `None` once the stream ends
    /// (the caller should then call [`Self::exit`]).
    pub async fn next_event(&mut self) -> Option<SuggestionEvent> {
        self.events.recv().await
    }

    /// Request cancellation: `SIGTERM` the process group, escalate to
    /// `SIGKILL` after the configured grace period if it hasn't exited.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Await process termination and surface the outcome.
    pub async fn exit(self) -> Result<ExitOutcome, AppError> {
        self.join
            .await
            .map_err(|e| AppError::External(format!("provider task panicked: {e}")))?
    }
}

/// Spawn a provider process: writes `prompt` to stdin, streams stdout through
/// the boundary parser, and captures a bounded stderr tail for diagnostics.
///
/// Isolates the child in its own process group (`setsid`) so `cancel` can
/// signal helper processes the provider CLI may have forked.
pub async fn spawn(cmd: Command, prompt: String, options: SpawnOptions) -> anyhow::Result<ProviderHandle> {
    let mut cmd = cmd;
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::piped());
    cmd.kill_on_drop(true);

    // SAFETY: setsid() is async-signal-safe and runs before exec, isolating
    // the child (and anything it forks) into its own process group.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let mut child = cmd.spawn().context("failed to spawn provider process")?;
    let pid = child.id();

    if let Some(mut stdin) = child.stdin.take() {
        let stdin_write_timeout = options.stdin_write_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(stdin_write_timeout, async {
                stdin.write_all(prompt.as_bytes()).await?;
                stdin.shutdown().await?;
                Ok::<_, std::io::Error>(())
            })
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("prompt write error: {}", e),
                Err(_) => warn!(
                    timeout_secs = stdin_write_timeout.as_secs(),
                    "prompt write timed out"
                ),
            }
        });
    }

    let (events_tx, events_rx) = mpsc::channel(64);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let join = tokio::spawn(run_child(child, events_tx, cancel_rx, options));

    Ok(ProviderHandle {
        pid,
        events: events_rx,
        cancel_tx,
        join,
    })
}

/// Drive a spawned child to completion: concurrently read stdout (parsing
/// boundary-delimited JSON into [`SuggestionEvent`]s) and stderr (tail-only),
/// honor idle timeout and cancel requests, and classify the outcome.
async fn run_child(
    mut child: tokio::process::Child,
    events_tx: mpsc::Sender<SuggestionEvent>,
    mut cancel_rx: watch::Receiver<bool>,
    options: SpawnOptions,
) -> Result<ExitOutcome, AppError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::External("provider stdout not piped".into()))?;
    let stderr = child.stderr.take();

    const READ_BUF_SIZE: usize = 4096;
    let mut stdout_reader = BufReader::new(stdout);
    let mut stdout_buf = [0u8; READ_BUF_SIZE];
    let mut parser = parse::BoundaryParser::new();

    let mut stderr_reader = stderr.map(BufReader::new);
    let mut stderr_buf = [0u8; READ_BUF_SIZE];
    let mut stderr_tail = Vec::<u8>::new();

    let execution_start = Instant::now();
    let mut last_activity = Instant::now();
    let mut last_heartbeat = Instant::now();
    let heartbeat_interval = resolve_heartbeat_interval();

    let mut stdout_done = false;
    let mut stderr_done = stderr_reader.is_none();
    let mut cancelled = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            result = stdout_reader.read(&mut stdout_buf), if !stdout_done => {
                match result {
                    Ok(0) => stdout_done = true,
                    Ok(n) => {
                        last_activity = Instant::now();
                        for event in parser.feed(&stdout_buf[..n]) {
                            let _ = events_tx.send(event).await;
                        }
                    }
                    Err(e) => {
                        warn!("provider stdout read error: {e}");
                        stdout_done = true;
                    }
                }
            }
            result = async {
                match stderr_reader.as_mut() {
                    Some(r) => r.read(&mut stderr_buf).await,
                    None => std::future::pending().await,
                }
            }, if !stderr_done => {
                match result {
                    Ok(0) => stderr_done = true,
                    Ok(n) => {
                        last_activity = Instant::now();
                        stderr_tail.extend_from_slice(&stderr_buf[..n]);
                        if stderr_tail.len() > STDERR_TAIL_MAX_BYTES {
                            let excess = stderr_tail.len() - STDERR_TAIL_MAX_BYTES;
                            stderr_tail.drain(..excess);
                        }
                    }
                    Err(_) => stderr_done = true,
                }
            }
            _ = cancel_rx.changed() => {
                if *cancel_rx.borrow() {
                    cancelled = true;
                    warn!("provider cancelled; sending SIGTERM to process group");
                    terminate_then_kill(&mut child, options.cancel_grace).await;
                    break;
                }
            }
            _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {
                maybe_emit_heartbeat(heartbeat_interval, execution_start, last_activity, &mut last_heartbeat, options.idle_timeout);
                if last_activity.elapsed() >= options.idle_timeout {
                    warn!(timeout_secs = options.idle_timeout.as_secs(), "provider idle timeout; killing process group");
                    kill_child_process_group(&mut child);
                    break;
                }
            }
        }
    }

    for event in parser.finish() {
        let _ = events_tx.send(event).await;
    }

    let status = child
        .wait()
        .await
        .map_err(|e| AppError::External(format!("failed to wait for provider: {e}")))?;

    if cancelled {
        return Ok(ExitOutcome::Cancelled);
    }

    let exit_code = status.code().unwrap_or(-1);
    if exit_code == 0 {
        Ok(ExitOutcome::Completed)
    } else {
        Ok(ExitOutcome::Failed {
            stderr_tail: String::from_utf8_lossy(&stderr_tail).into_owned(),
        })
    }
}

/// `SIGTERM` the process group, wait up to `grace`, then `SIGKILL` if still alive.
async fn terminate_then_kill(child: &mut tokio::process::Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: kill() is async-signal-safe; negative PID targets the process group.
        unsafe {
            libc::kill(-(pid as i32), libc::SIGTERM);
        }
        if tokio::time::timeout(grace, child.wait()).await.is_ok() {
            return;
        }
        debug!("provider did not exit within grace period; escalating to SIGKILL");
    }
    kill_child_process_group(child);
}

fn kill_child_process_group(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: kill() is async-signal-safe; negative PID targets the process group.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
            return;
        }
    }
    let _ = child.start_kill();
}

/// Locate a provider's executable on `PATH`, for the startup doctor check.
pub async fn check_tool_installed(executable: &str) -> anyhow::Result<()> {
    let output = Command::new("which")
        .arg(executable)
        .output()
        .await
        .context("failed to execute 'which'")?;

    if !output.status.success() {
        anyhow::bail!("tool '{executable}' is not installed or not on PATH");
    }
    Ok(())
}

/// Result of a one-shot (non-streaming) command, used by the orchestrator
/// for ancillary subprocess calls that aren't a provider voice (e.g. `git`).
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub output: String,
    pub stderr_output: String,
    pub exit_code: i32,
}

/// Run a command to completion and capture stdout/stderr, without the
/// suggestion-event parsing machinery. Used for simple auxiliary commands.
pub async fn run_and_capture(mut cmd: Command) -> anyhow::Result<ExecutionResult> {
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::null());
    let output = cmd.output().await.context("failed to run command")?;
    Ok(ExecutionResult {
        output: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr_output: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "lib_tests_heartbeat.rs"]
mod heartbeat_tests;
