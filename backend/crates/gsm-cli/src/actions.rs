//! One function per `gsm` subcommand.

use crate::error::{CliError, Result as CliResult};

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use gsm_config::InstanceConfig;
use gsm_runtime::upgrade::BranchSelection;
use gsm_runtime::{
    FirewallFailurePolicy, ProgressSink, PublicationState, RunState, RuntimeStatus, ServerRuntime,
    ServerVersion, StartOptions, StartOutcome, UpgradeRequest,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Extra time allowed for the first watcher sample beyond one poll interval.
const FIRST_SAMPLE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub(crate) struct StatusReport<'a> {
    pub(crate) profile_id: &'a str,
    pub(crate) run_state: RunState,
    pub(crate) publication: PublicationState,
    pub(crate) label: &'a str,
    pub(crate) players: u32,
    pub(crate) max_players: u32,
    pub(crate) version: Option<String>,
    pub(crate) pid: Option<u32>,
}

impl<'a> StatusReport<'a> {
    pub(crate) fn new(profile_id: &'a str, status: &'a RuntimeStatus) -> Self {
        Self {
            profile_id,
            run_state: status.run_state,
            publication: status.publication,
            label: status.label,
            players: status.players,
            max_players: status.max_players,
            version: status.version.as_ref().map(ServerVersion::to_string),
            pid: status.process.map(|process| process.pid()),
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> CliResult<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(CliError::output)?;
    println!("{output}");
    Ok(())
}

/// Wait until the watcher has reported at least once.
pub(crate) async fn await_first_sample(runtime: &ServerRuntime) {
    let timeout = runtime.settings().poll_interval + FIRST_SAMPLE_GRACE;
    let mut status = runtime.subscribe();

    let first = tokio::time::timeout(
        timeout,
        status.wait_for(|status| status.run_state != RunState::Unknown),
    )
    .await;
    if first.is_err() {
        warn!("No status sample within {}s", timeout.as_secs());
    }
}

pub(crate) fn status(runtime: &ServerRuntime, profile_id: &str, pretty: bool) -> CliResult<()> {
    let status = runtime.status();
    print_json(&StatusReport::new(profile_id, &status), pretty)
}

pub(crate) async fn start(
    runtime: &ServerRuntime,
    profile_id: &str,
    abort_on_firewall_failure: bool,
) -> CliResult<()> {
    let options = StartOptions {
        firewall_failure: if abort_on_firewall_failure {
            FirewallFailurePolicy::Abort
        } else {
            FirewallFailurePolicy::Proceed
        },
    };

    match runtime.start(options).await? {
        StartOutcome::Launched(handle) => {
            println!("Launched '{profile_id}' (pid {})", handle.pid());
        }
        StartOutcome::AlreadyActive(state) => {
            println!("'{profile_id}' is already {state}");
        }
        StartOutcome::AbortedByFirewall => {
            println!("Start of '{profile_id}' aborted: firewall ports could not be opened");
        }
    }
    Ok(())
}

pub(crate) async fn stop(runtime: &ServerRuntime, profile_id: &str) -> CliResult<()> {
    runtime.stop().await?;
    println!("'{profile_id}' is {}", runtime.status().run_state);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpgradeArgs {
    pub(crate) branch: Option<String>,
    pub(crate) branch_password: Option<String>,
    pub(crate) validate: bool,
    pub(crate) no_update: bool,
    pub(crate) allow_32bit: bool,
}

/// Branch from the command line, else the one saved on the profile.
pub(crate) fn branch_selection(args: &UpgradeArgs, instance: &InstanceConfig) -> BranchSelection {
    match &args.branch {
        Some(name) => BranchSelection {
            name: Some(name.clone()),
            password: args.branch_password.clone(),
        },
        None => BranchSelection {
            name: instance.branch_name.clone(),
            password: instance.branch_password.clone(),
        },
    }
}

/// Returns whether the upgrade succeeded.
pub(crate) async fn upgrade(
    runtime: &ServerRuntime,
    instance: &InstanceConfig,
    args: UpgradeArgs,
    cancel: CancellationToken,
) -> CliResult<bool> {
    let progress = |_percent: u8, message: &str, suppress_newline: bool| {
        let mut stdout = std::io::stdout().lock();
        let written = if suppress_newline {
            write!(stdout, "{message}").and_then(|()| stdout.flush())
        } else {
            writeln!(stdout, "{message}")
        };
        if let Err(e) = written {
            warn!("Failed to write progress: {e}");
        }
    };
    let progress: Arc<dyn ProgressSink> = Arc::new(progress);

    let request = UpgradeRequest::new(!args.no_update)
        .with_branch(branch_selection(&args, instance))
        .with_validate(args.validate)
        .with_allow_32bit_host(args.allow_32bit)
        .with_cancellation(cancel)
        .with_progress(progress);

    let outcome = runtime.upgrade(request).await?;
    if outcome.cancelled {
        println!("Upgrade of '{}' cancelled", instance.profile_id);
    } else {
        println!("{}", outcome.message);
    }
    info!(
        "Upgrade result: success={}, new_version={}",
        outcome.success, outcome.got_new_version
    );

    Ok(outcome.success)
}

pub(crate) fn format_status_line(at: DateTime<Local>, status: &RuntimeStatus) -> String {
    let version = status
        .version
        .map_or_else(|| String::from("-"), |version| version.to_string());
    format!(
        "{} {} / {} players {}/{} version {}",
        at.format("%H:%M:%S"),
        status.label,
        status.publication,
        status.players,
        status.max_players,
        version
    )
}

/// Print each status change until `cancel` fires.
pub(crate) async fn watch(runtime: &ServerRuntime, cancel: CancellationToken) -> CliResult<()> {
    let mut status = runtime.subscribe();
    println!("{}", format_status_line(Local::now(), &status.borrow_and_update()));

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                println!("{}", format_status_line(Local::now(), &current));
            }
        }
    }

    Ok(())
}
