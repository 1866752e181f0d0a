//! Lifecycle and upgrade orchestration for dedicated game server instances.

pub mod endpoint;
mod error;
mod firewall;
mod host;
mod process;
mod process_watcher;
mod progress;
mod run_state;
mod runtime;
mod runtime_status;
mod snapshot;
mod version;
mod watcher;

pub mod upgrade;

#[cfg(test)]
mod tests;

pub use endpoint::{QueryEndpoints, resolve_endpoints};
pub use error::{ExecutableKind, Result as RuntimeResult, RuntimeError};
pub use firewall::{ExternallyManagedFirewall, FirewallGate, firewall_ports, rule_label};
pub use host::HostPlatform;
pub use process::{OsProcessController, ProcessController, ProcessHandle};
pub use process_watcher::ProcessStatusWatcher;
pub use progress::{NullProgress, ProgressSink};
pub use run_state::{PublicationState, RunState};
pub use runtime::{
    FirewallFailurePolicy, RuntimeCollaborators, ServerRuntime, StartOptions, StartOutcome,
};
pub use runtime_status::{RuntimeStatus, StateTransition};
pub use snapshot::{ManagedInstanceSnapshot, RuntimeSettings};
pub use upgrade::{
    BranchSelection, SteamCmdOutputParser, SteamCmdRunner, UpdateOutputParser, UpdateTool,
    UpgradeOutcome, UpgradeRequest,
};
pub use version::{ParseVersionError, ServerVersion};
pub use watcher::{
    SampleCallback, ServerInfo, StatusSample, StatusWatcher, SubscriptionToken, WatchRegistration,
    WatchRequest, WatcherStatus,
};
