use super::{
    CommandArg, DIRECTORIES_PER_LINE, OUTPUT_PREFIX, ToolInvocation, UpgradeOutcome,
    UpgradeRequest, branch_args, cache_folder, copy_directory, format_command_line,
    has_files_modified_since,
};
use crate::error::{ExecutableKind, Result as RuntimeResult, RuntimeError};
use crate::progress::ProgressSink;
use crate::run_state::RunState;
use crate::runtime::ServerRuntime;
use crate::snapshot::ManagedInstanceSnapshot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn report(progress: &dyn ProgressSink, message: &str) {
    progress.report(0, &format!("{OUTPUT_PREFIX} {message}"), false);
}

impl ServerRuntime {
    /// Install or upgrade the attached server.
    ///
    /// A running server is stopped first. The instance is `Updating` for the
    /// duration and always ends `Stopped`. Cancellation yields an
    /// unsuccessful outcome rather than an error.
    pub async fn upgrade(&self, request: UpgradeRequest) -> RuntimeResult<UpgradeOutcome> {
        let _operation = self.operation.lock().await;

        if request.update_server && !self.host.is_64bit_os {
            if !request.allow_32bit_host {
                error!("Refusing to update: the server requires a 64-bit operating system");
                return Err(RuntimeError::precondition(
                    "the server requires a 64-bit operating system",
                ));
            }
            warn!("Installing on a 32-bit host, the server will not start here");
        }

        let snapshot = self.require_snapshot()?;

        self.stop_locked().await?;
        let is_new_installation = self.status().run_state == RunState::Uninstalled;

        self.set_run_state(RunState::Updating);
        let result = self
            .run_upgrade(&snapshot, &request, is_new_installation)
            .await;
        self.set_run_state(RunState::Stopped);

        match result {
            Ok(outcome) => {
                info!(
                    "Upgrade of '{}' finished: success={}, new_version={}",
                    snapshot.profile_id, outcome.success, outcome.got_new_version
                );
                Ok(outcome)
            }
            Err(e) if e.is_cancelled() => {
                info!("Upgrade of '{}' cancelled", snapshot.profile_id);
                Ok(UpgradeOutcome::cancelled())
            }
            Err(e) => {
                error!("Upgrade of '{}' failed: {e}", snapshot.profile_id);
                Err(e)
            }
        }
    }

    async fn run_upgrade(
        &self,
        snapshot: &ManagedInstanceSnapshot,
        request: &UpgradeRequest,
        is_new_installation: bool,
    ) -> RuntimeResult<UpgradeOutcome> {
        let progress = request.progress.as_ref();
        let update = &self.settings.update;

        // A configuration-only run still requires the tool to be installed
        let steamcmd = self.settings.steamcmd_path();
        if update.steamcmd_path.trim().is_empty() || !steamcmd.is_file() {
            report(progress, "***********************************");
            report(
                progress,
                &format!(
                    "ERROR: SteamCMD could not be found. Expected location is {}",
                    steamcmd.display()
                ),
            );
            report(progress, "***********************************");
            return Err(RuntimeError::missing_executable(
                ExecutableKind::UpdateTool,
                steamcmd,
                &snapshot.install_directory,
            ));
        }

        if !request.update_server {
            report(progress, "Finished upgrade process.");
            return Ok(UpgradeOutcome::succeeded(
                false,
                "Finished without a server update.",
            ));
        }

        // Files newer than this count as new content when output is not captured
        let started_at = SystemTime::now();

        report(progress, "Starting server update.");
        report(
            progress,
            &format!(
                "Server branch: {}.",
                request.branch.resolved_name(&update.default_branch_name)
            ),
        );

        let branch_args = branch_args(update, &request.branch);

        if is_new_installation
            && let Some(cache) = cache_folder(&self.settings.auto_update, update, &request.branch)
            && cache.is_dir()
        {
            report(
                progress,
                "Installing server from local cache...may take a while to copy all the files.",
            );
            self.copy_from_cache(cache, snapshot.install_directory.clone(), request)
                .await?;
        }

        if request.cancel.is_cancelled() {
            return Err(RuntimeError::cancelled());
        }

        progress.report(0, "", false);
        report(progress, "Updating server from steam.");

        let install_dir = snapshot.install_directory.display().to_string();
        let validate_flag = if request.validate { "validate" } else { "" };
        let invocation = ToolInvocation {
            program: steamcmd,
            arguments: format_command_line(
                &update.install_args_format,
                &[
                    CommandArg::Value(&install_dir),
                    CommandArg::Value(&update.app_id),
                    CommandArg::Fragment(&branch_args),
                    CommandArg::Fragment(validate_flag),
                ],
            ),
            working_dir: snapshot.install_directory.clone(),
        };

        let capture = update.redirect_output;
        let mut parser = (self.parser_factory)(capture);
        let (output_tx, output_rx) = if capture {
            let (tx, rx) = mpsc::unbounded_channel::<String>();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let drain = async {
            if let Some(mut rx) = output_rx {
                while let Some(line) = rx.recv().await {
                    progress.report(0, line.as_str(), false);
                    parser.observe(&line);
                }
            }
        };
        let (tool_result, ()) = tokio::join!(
            self.update_tool
                .run(&invocation, output_tx, &request.cancel),
            drain
        );
        let tool_succeeded = tool_result?;

        if !(tool_succeeded && parser.download_successful()) {
            warn!(
                "Update tool failed (exit ok: {tool_succeeded}, success marker: {})",
                parser.download_successful()
            );
            report(progress, "****************************");
            report(progress, "ERROR: Failed server update.");
            report(progress, "****************************");
            if capture {
                report(
                    progress,
                    "If the server update keeps failing try disabling update.redirect_output in the settings.",
                );
            }
            report(progress, "Finished upgrade process.");
            return Ok(UpgradeOutcome::failed("Server update failed."));
        }

        report(progress, "Finished server update.");

        let mut got_new_version = parser.got_new_version();
        if snapshot.install_directory.is_dir() {
            if !capture {
                let dir = snapshot.install_directory.clone();
                got_new_version = tokio::task::spawn_blocking(move || {
                    has_files_modified_since(&dir, started_at)
                })
                .await
                .map_err(|e| RuntimeError::update_tool(format!("file scan failed: {e}")))?;
            }
            report(
                progress,
                &format!(
                    "New server version - {}.",
                    if got_new_version { "TRUE" } else { "FALSE" }
                ),
            );
        }

        progress.report(0, "", false);
        report(progress, "Finished upgrade process.");

        Ok(UpgradeOutcome::succeeded(
            got_new_version,
            "Server update finished.",
        ))
    }

    async fn copy_from_cache(
        &self,
        cache: PathBuf,
        install_dir: PathBuf,
        request: &UpgradeRequest,
    ) -> RuntimeResult<()> {
        let smart = self.settings.auto_update.use_smart_copy;
        let cancel = request.cancel.clone();
        let progress = Arc::clone(&request.progress);

        info!(
            "Copying server cache {} -> {}",
            cache.display(),
            install_dir.display()
        );

        let stats = tokio::task::spawn_blocking(move || {
            let heartbeat =
                |count: u64| progress.report(0, ".", count % DIRECTORIES_PER_LINE != 0);
            copy_directory(&cache, &install_dir, smart, &cancel, &heartbeat)
        })
        .await
        .map_err(|e| RuntimeError::update_tool(format!("cache copy task failed: {e}")))??;

        info!(
            "Cache copy finished: {} directories, {} files copied, {} unchanged",
            stats.directories, stats.files_copied, stats.files_skipped
        );
        Ok(())
    }
}
