//! gsm - dedicated game server manager
//!
//! Starts, stops, watches and upgrades one configured server instance.
//!
//! # Examples
//!
//! ```bash
//! # Current state of the default instance
//! gsm status --pretty
//!
//! # Upgrade a named profile on a beta branch
//! gsm --profile scorched upgrade --branch preaquatica --validate
//!
//! # Follow state changes
//! gsm watch
//! ```

mod actions;
mod cli;
mod commands;
mod error;
mod logging;


use crate::{
    actions::UpgradeArgs,
    cli::Cli,
    commands::Commands,
    error::{CliError, Result as CliResult},
};

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gsm_config::Config;
use gsm_runtime::{
    ExternallyManagedFirewall, ManagedInstanceSnapshot, OsProcessController,
    ProcessStatusWatcher, RuntimeCollaborators, RuntimeSettings, ServerRuntime, SteamCmdRunner,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            eprintln!("Hint: {}", e.recovery_hint());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<bool> {
    let config = Config::load()?;
    config.validate()?;

    logging::setup_logging(&config.logging, &config.log_dir()?)?;
    info!("Starting gsm v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let instance = match cli.profile.as_deref() {
        Some(profile_id) => config.instance(profile_id)?,
        None => config.default_instance()?,
    }
    .clone();

    let runtime = build_runtime(RuntimeSettings::from_config(&config));
    if !runtime.attach(ManagedInstanceSnapshot::from_config(&instance)) {
        return Err(CliError::from(gsm_runtime::RuntimeError::precondition(
            "instance could not be attached",
        )));
    }
    actions::await_first_sample(&runtime).await;

    let profile_id = instance.profile_id.as_str();
    let succeeded = match cli.command {
        Commands::Status => {
            actions::status(&runtime, profile_id, cli.pretty)?;
            true
        }
        Commands::Start {
            abort_on_firewall_failure,
        } => {
            actions::start(&runtime, profile_id, abort_on_firewall_failure).await?;
            true
        }
        Commands::Stop => {
            actions::stop(&runtime, profile_id).await?;
            true
        }
        Commands::Upgrade {
            branch,
            branch_password,
            validate,
            no_update,
            allow_32bit,
        } => {
            let args = UpgradeArgs {
                branch,
                branch_password,
                validate,
                no_update,
                allow_32bit,
            };
            actions::upgrade(&runtime, &instance, args, cancel_on_ctrl_c()).await?
        }
        Commands::Watch => {
            actions::watch(&runtime, cancel_on_ctrl_c()).await?;
            true
        }
    };

    runtime.detach();
    Ok(succeeded)
}

fn build_runtime(settings: RuntimeSettings) -> ServerRuntime {
    let collaborators = RuntimeCollaborators {
        watcher: Arc::new(ProcessStatusWatcher::new(settings.clone())),
        process: Arc::new(OsProcessController::new(settings.shutdown_timeout)),
        firewall: Arc::new(ExternallyManagedFirewall),
        update_tool: Arc::new(SteamCmdRunner),
    };
    ServerRuntime::new(settings, collaborators)
}

/// Token cancelled by the first Ctrl+C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, cancelling");
                trigger.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl+C: {e}"),
        }
    });

    cancel
}
