//! Running the external update tool.

use crate::error::{ExecutableKind, Result as RuntimeResult, RuntimeError};

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A fully formatted update tool command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    /// Argument string, split shell-style before spawning
    pub arguments: String,
    pub working_dir: PathBuf,
}

#[async_trait]
pub trait UpdateTool: Send + Sync {
    /// Run the tool to completion and report whether it exited successfully.
    ///
    /// When `output` is given each stdout line is sent through it. Firing
    /// `cancel` terminates the tool and yields [`RuntimeError::Cancelled`].
    async fn run(
        &self,
        invocation: &ToolInvocation,
        output: Option<mpsc::UnboundedSender<String>>,
        cancel: &CancellationToken,
    ) -> RuntimeResult<bool>;
}

/// Runs SteamCMD as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SteamCmdRunner;

#[async_trait]
impl UpdateTool for SteamCmdRunner {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        output: Option<mpsc::UnboundedSender<String>>,
        cancel: &CancellationToken,
    ) -> RuntimeResult<bool> {
        let args = shell_words::split(&invocation.arguments)
            .map_err(|e| RuntimeError::update_tool(format!("malformed arguments: {e}")))?;

        let working_dir = if invocation.working_dir.is_dir() {
            invocation.working_dir.clone()
        } else {
            invocation
                .program
                .parent()
                .map(PathBuf::from)
                .unwrap_or_default()
        };

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if !working_dir.as_os_str().is_empty() {
            cmd.current_dir(&working_dir);
        }
        if output.is_some() {
            cmd.stdout(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RuntimeError::missing_executable(
                ExecutableKind::UpdateTool,
                &invocation.program,
                &invocation.working_dir,
            ),
            _ => RuntimeError::update_tool(format!(
                "failed to start {}: {e}",
                invocation.program.display()
            )),
        })?;
        info!(
            "Started {} (pid {:?})",
            invocation.program.display(),
            child.id()
        );

        let reader = match (output, child.stdout.take()) {
            (Some(tx), Some(stdout)) => Some(tokio::spawn(async move {
                let mut reader = BufReader::new(stdout);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf).await {
                        Ok(0) => break,
                        Ok(_) => {
                            // The tool's console output is not guaranteed to be UTF-8
                            let line = String::from_utf8_lossy(&buf);
                            let line = line.trim_end_matches(['\n', '\r']).to_string();
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Stopped reading update tool output: {e}");
                            break;
                        }
                    }
                }
            })),
            _ => None,
        };

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let Some(status) = waited else {
            info!("Cancelling update tool");
            if let Err(e) = child.kill().await {
                warn!("Failed to kill update tool: {e}");
            }
            if let Some(reader) = reader {
                reader.abort();
            }
            return Err(RuntimeError::cancelled());
        };
        let status = status?;

        // Drain whatever the tool printed before exiting
        if let Some(reader) = reader
            && let Err(e) = reader.await
        {
            warn!("Output reader failed: {e}");
        }

        debug!("Update tool exited with {status}");
        Ok(status.success())
    }
}
