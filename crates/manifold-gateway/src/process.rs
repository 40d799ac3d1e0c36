//! Spawning the MCP server subprocess.
//!
//! The command arrives from upstream tooling in one of several shapes: a
//! properly split argv, a single space-joined string, or an argv where
//! some arguments were over-concatenated. `normalize_command` undoes the
//! latter two before the spawn. Once running, the child's stdin/stdout
//! are handed to the writer and router; stderr is logged line by line.

use std::collections::HashMap;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::error::GatewayError;

/// A spawned MCP server with its pipes taken.
pub struct SpawnedServer {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Normalize the command parts delivered by upstream tooling.
///
/// Two shims, applied in order:
/// - a single part containing whitespace is split wholesale (the entire
///   command arrived as one string);
/// - otherwise, any part after the first that contains a space and does
///   not start with `--` is re-split on whitespace (arguments that were
///   concatenated upstream).
///
/// This is a narrow compatibility shim, not a shell parser: there is no
/// quoting, and a legitimately space-containing positional argument WILL
/// be mangled. Known fragility, kept bug-compatible with upstream.
pub fn normalize_command(parts: &[String]) -> Result<Vec<String>, GatewayError> {
    if parts.is_empty() {
        return Err(GatewayError::EmptyCommand);
    }
    tracing::debug!(received = ?parts, "command parts received");

    let normalized = if parts.len() == 1 && parts[0].contains(' ') {
        parts[0].split_whitespace().map(str::to_string).collect()
    } else {
        let mut out = Vec::with_capacity(parts.len());
        out.push(parts[0].clone());
        for arg in &parts[1..] {
            if arg.contains(' ') && !arg.starts_with("--") {
                tracing::debug!(arg, "re-splitting over-concatenated argument");
                out.extend(arg.split_whitespace().map(str::to_string));
            } else {
                out.push(arg.clone());
            }
        }
        out
    };

    if normalized.is_empty() {
        return Err(GatewayError::EmptyCommand);
    }
    tracing::debug!(normalized = ?normalized, "final command parts");
    Ok(normalized)
}

/// Spawn the MCP server with all three pipes attached.
///
/// The child inherits the gateway's environment; `extra_env` is layered
/// on top. The child is killed if the handle is dropped.
pub fn spawn_server(
    command: &[String],
    extra_env: &HashMap<String, String>,
) -> Result<SpawnedServer, GatewayError> {
    let parts = normalize_command(command)?;

    let mut cmd = Command::new(&parts[0]);
    cmd.args(&parts[1..])
        .envs(extra_env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| GatewayError::Spawn {
        command: parts[0].clone(),
        source: e,
    })?;

    let stdin = child.stdin.take().expect("stdin was piped");
    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    tracing::info!(pid = ?child.id(), command = %parts.join(" "), "started MCP server");

    Ok(SpawnedServer {
        child,
        stdin,
        stdout,
        stderr,
    })
}

/// Log the child's stderr line by line until the pipe closes.
pub async fn log_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!("server stderr: {line}");
    }
}
