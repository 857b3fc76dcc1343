// src/exec/shell.rs

//! Runs phase commands through the system shell.

use std::collections::VecDeque;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dag::RunContext;
use crate::types::Phase;

use super::runner::{CommandFuture, CommandRequest, CommandRunner};

/// Stderr lines kept for the error of a failed command.
const STDERR_TAIL_LINES: usize = 20;

/// Production [`CommandRunner`]: `sh -c <command>` (or `cmd /C` on Windows).
///
/// Output is logged line by line. The child is killed when the run context is
/// cancelled or the request's timeout elapses.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run<'a>(&'a self, ctx: &'a RunContext, request: CommandRequest) -> CommandFuture<'a> {
        Box::pin(run_command(ctx, request))
    }
}

async fn run_command(ctx: &RunContext, request: CommandRequest) -> Result<()> {
    let CommandRequest {
        unit,
        phase,
        command,
        workdir,
        env,
        timeout,
    } = request;

    if ctx.is_cancelled() {
        bail!("{phase} of '{unit}' not started: run cancelled");
    }

    info!(unit = %unit, phase = %phase, cmd = %command, "starting command");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&command);
        c
    };

    if let Some(dir) = workdir.as_ref() {
        cmd.current_dir(dir);
    }
    cmd.envs(&env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {phase} command for unit '{unit}'"))?;

    let stdout_reader = child
        .stdout
        .take()
        .map(|stdout| forward_lines(stdout, unit.clone(), phase, false));
    let stderr_reader = child
        .stderr
        .take()
        .map(|stderr| forward_lines(stderr, unit.clone(), phase, true));

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    let status = tokio::select! {
        status = child.wait() => {
            status.with_context(|| format!("waiting for {phase} command of unit '{unit}'"))?
        }
        _ = ctx.cancelled() => {
            info!(unit = %unit, phase = %phase, "run cancelled; killing command");
            kill(&mut child, &unit).await;
            bail!("{phase} of '{unit}' cancelled");
        }
        _ = deadline => {
            warn!(unit = %unit, phase = %phase, ?timeout, "command timed out; killing it");
            kill(&mut child, &unit).await;
            bail!("{phase} of '{unit}' timed out after {timeout:?}");
        }
    };

    if let Some(reader) = stdout_reader {
        let _ = reader.await;
    }
    let stderr_tail = match stderr_reader {
        Some(reader) => reader.await.unwrap_or_default(),
        None => Vec::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        unit = %unit,
        phase = %phase,
        exit_code = code,
        success = status.success(),
        "command exited"
    );

    if !status.success() {
        if stderr_tail.is_empty() {
            bail!("{phase} command `{command}` for unit '{unit}' exited with status {code}");
        }
        bail!(
            "{phase} command `{command}` for unit '{unit}' exited with status {code}\nstderr:\n{}",
            stderr_tail.join("\n")
        );
    }

    Ok(())
}

async fn kill(child: &mut tokio::process::Child, unit: &str) {
    if let Err(err) = child.kill().await {
        warn!(unit = %unit, error = %err, "failed to kill child process");
    }
}

/// Log every line of `stream`. Stderr lines are also collected, keeping the
/// last [`STDERR_TAIL_LINES`].
fn forward_lines<R>(stream: R, unit: String, phase: Phase, is_stderr: bool) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut tail = VecDeque::new();
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                warn!(unit = %unit, phase = %phase, "stderr: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            } else {
                info!(unit = %unit, phase = %phase, "{}", line);
            }
        }
        Vec::from(tail)
    })
}
