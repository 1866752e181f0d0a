//! Lifecycle state machine for one managed server instance.

use crate::endpoint::resolve_endpoints;
use crate::error::{Result as RuntimeResult, RuntimeError};
use crate::firewall::{FirewallGate, firewall_ports, rule_label};
use crate::host::HostPlatform;
use crate::process::{ProcessController, ProcessHandle};
use crate::run_state::{PublicationState, RunState};
use crate::runtime_status::{RuntimeStatus, StateTransition};
use crate::snapshot::{ManagedInstanceSnapshot, RuntimeSettings};
use crate::upgrade::{OutputParserFactory, SteamCmdOutputParser, UpdateTool};
use crate::version::ServerVersion;
use crate::watcher::{
    SampleCallback, StatusSample, StatusWatcher, Subscription, SubscriptionToken, WatchRequest,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as OperationLock, broadcast, watch};
use tracing::{debug, error, info, warn};

const TRANSITION_CAPACITY: usize = 64;

/// External services a runtime drives.
#[derive(Clone)]
pub struct RuntimeCollaborators {
    pub watcher: Arc<dyn StatusWatcher>,
    pub process: Arc<dyn ProcessController>,
    pub firewall: Arc<dyn FirewallGate>,
    pub update_tool: Arc<dyn UpdateTool>,
}

/// What `start()` does when firewall ports could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirewallFailurePolicy {
    /// Log a warning and launch anyway
    #[default]
    Proceed,
    /// Leave the instance as it was and do not launch
    Abort,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    pub firewall_failure: FirewallFailurePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The launcher was spawned
    Launched(ProcessHandle),
    /// Nothing to do, the instance is already in this state
    AlreadyActive(RunState),
    AbortedByFirewall,
}

#[derive(Default)]
struct Attachment {
    snapshot: Option<Arc<ManagedInstanceSnapshot>>,
    subscription: Option<Subscription>,
}

/// State shared with watcher callbacks.
struct Shared {
    attachment: Mutex<Attachment>,
    status_tx: watch::Sender<RuntimeStatus>,
    transitions_tx: broadcast::Sender<StateTransition>,
}

impl Shared {
    fn attachment(&self) -> MutexGuard<'_, Attachment> {
        self.attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> RuntimeStatus {
        self.status_tx.borrow().clone()
    }

    fn update<F: FnOnce(&mut RuntimeStatus)>(&self, f: F) {
        let _attachment = self.attachment();
        self.update_locked(f);
    }

    /// Mutate the status and publish exactly one change notification.
    /// Callers hold the attachment lock, which serializes all mutations.
    fn update_locked<F: FnOnce(&mut RuntimeStatus)>(&self, f: F) {
        let mut transition = None;
        self.status_tx.send_modify(|status| {
            let from = status.run_state;
            f(status);
            if status.run_state != from {
                transition = Some(StateTransition {
                    from,
                    to: status.run_state,
                });
            }
        });

        if let Some(transition) = transition {
            debug!("Run state {} -> {}", transition.from, transition.to);
            // No receivers is fine
            let _ = self.transitions_tx.send(transition);
        }
    }

    fn set_states(&self, run_state: RunState, publication: PublicationState) {
        self.update(|status| status.set_states(run_state, publication));
    }

    fn apply_sample(&self, token: SubscriptionToken, sample: StatusSample) {
        let attachment = self.attachment();

        match attachment.subscription {
            Some(current) if current.token == token => {}
            _ => {
                debug!("Discarding sample from stale subscription {}", token.id());
                return;
            }
        }

        let configured_max = attachment
            .snapshot
            .as_ref()
            .map_or(0, |snapshot| snapshot.max_players);

        self.update_locked(|status| {
            let (run_state, publication) = sample.status.to_states(status.publication);

            // Stopping and Updating belong to an in-flight operation, which
            // finalizes them itself
            if matches!(status.run_state, RunState::Stopping | RunState::Updating) {
                let owned = status.run_state;
                status.set_states(owned, publication);
            } else {
                status.set_states(run_state, publication);
            }

            status.players = sample
                .players
                .as_ref()
                .map_or(0, |players| u32::try_from(players.len()).unwrap_or(u32::MAX));
            status.max_players = sample
                .server_info
                .as_ref()
                .map_or(configured_max, |info| info.max_players);

            if let Some(version) = sample
                .server_info
                .as_ref()
                .and_then(|info| ServerVersion::from_server_name(&info.name))
            {
                status.version = Some(version);
            }

            status.process = sample.process;
        });
    }
}

/// Owns the run and publication state of one server instance.
///
/// Responsibilities:
/// - Track the watcher subscription for the attached instance
/// - Start the server through its launcher
/// - Stop the server gracefully
/// - Upgrade the server through the update tool
///
/// `start`, `stop` and `upgrade` are serialized; watcher samples are applied
/// as they arrive, guarded by the subscription token they were issued for.
pub struct ServerRuntime {
    pub(crate) settings: RuntimeSettings,
    watcher: Arc<dyn StatusWatcher>,
    process: Arc<dyn ProcessController>,
    firewall: Arc<dyn FirewallGate>,
    pub(crate) update_tool: Arc<dyn UpdateTool>,
    pub(crate) host: HostPlatform,
    pub(crate) parser_factory: OutputParserFactory,
    shared: Arc<Shared>,
    pub(crate) operation: OperationLock<()>,
    next_token: AtomicU64,
}

impl ServerRuntime {
    pub fn new(settings: RuntimeSettings, collaborators: RuntimeCollaborators) -> Self {
        let (status_tx, _) = watch::channel(RuntimeStatus::default());
        let (transitions_tx, _) = broadcast::channel(TRANSITION_CAPACITY);

        Self {
            settings,
            watcher: collaborators.watcher,
            process: collaborators.process,
            firewall: collaborators.firewall,
            update_tool: collaborators.update_tool,
            host: HostPlatform::detect(),
            parser_factory: SteamCmdOutputParser::factory(),
            shared: Arc::new(Shared {
                attachment: Mutex::new(Attachment::default()),
                status_tx,
                transitions_tx,
            }),
            operation: OperationLock::new(()),
            next_token: AtomicU64::new(0),
        }
    }

    pub fn with_host_platform(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    /// Replace the update tool output heuristics.
    pub fn with_output_parser(mut self, factory: OutputParserFactory) -> Self {
        self.parser_factory = factory;
        self
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Current status.
    pub fn status(&self) -> RuntimeStatus {
        self.shared.status()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<RuntimeStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Subscribe to run state transitions, in order.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<StateTransition> {
        self.shared.transitions_tx.subscribe()
    }

    pub fn snapshot(&self) -> Option<Arc<ManagedInstanceSnapshot>> {
        self.shared.attachment().snapshot.clone()
    }

    /// Token of the live watcher subscription, if any.
    pub fn subscription_token(&self) -> Option<SubscriptionToken> {
        self.shared
            .attachment()
            .subscription
            .map(|subscription| subscription.token)
    }

    /// Attach (or reattach) an instance configuration.
    ///
    /// Replaces the watcher subscription and restores the last installed
    /// version. Ignored, returning `false`, while an operation is in flight or
    /// the instance is not quiescent.
    pub fn attach(&self, snapshot: ManagedInstanceSnapshot) -> bool {
        let Ok(_operation) = self.operation.try_lock() else {
            info!(
                "Ignoring reattach of '{}' while an operation is in flight",
                snapshot.profile_id
            );
            return false;
        };

        let run_state = self.status().run_state;
        if !run_state.is_quiescent() {
            info!(
                "Ignoring reattach of '{}' while {run_state}",
                snapshot.profile_id
            );
            return false;
        }

        self.unsubscribe();

        let restored = snapshot
            .last_installed_version
            .as_deref()
            .and_then(|version| version.parse::<ServerVersion>().ok());
        let max_players = snapshot.max_players;

        info!(
            "Attaching instance '{}' at {}",
            snapshot.profile_id,
            snapshot.install_directory.display()
        );
        self.shared.attachment().snapshot = Some(Arc::new(snapshot));
        self.shared.update(|status| {
            status.max_players = max_players;
            if let Some(version) = restored {
                status.version = Some(version);
            }
        });

        self.subscribe_watcher();
        true
    }

    /// Drop the watcher subscription. The runtime keeps its last state.
    pub fn detach(&self) {
        self.unsubscribe();
    }

    /// Apply a watcher sample issued for `token`.
    pub fn on_status_sample(&self, token: SubscriptionToken, sample: StatusSample) {
        self.shared.apply_sample(token, sample);
    }

    /// Start the server.
    ///
    /// A 64-bit host is required. Monitoring is re-established whether or not
    /// the launch succeeds.
    pub async fn start(&self, options: StartOptions) -> RuntimeResult<StartOutcome> {
        let _operation = self.operation.lock().await;

        if !self.host.is_64bit_os {
            error!("Refusing to start: the server requires a 64-bit operating system");
            return Err(RuntimeError::precondition(
                "the server requires a 64-bit operating system",
            ));
        }

        let previous = self.status();
        if previous.run_state.is_active() {
            info!("Start ignored, server is {}", previous.run_state);
            return Ok(StartOutcome::AlreadyActive(previous.run_state));
        }

        let snapshot = self.require_snapshot()?;

        self.unsubscribe();
        self.shared
            .set_states(RunState::Initializing, previous.publication);

        let result = self.launch(&snapshot, options).await;

        match &result {
            Ok(StartOutcome::AbortedByFirewall) => {
                warn!("Start of '{}' aborted by firewall policy", snapshot.profile_id);
                self.shared
                    .set_states(previous.run_state, previous.publication);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to start '{}': {e}", snapshot.profile_id);
                self.shared
                    .set_states(RunState::Stopped, PublicationState::Unavailable);
            }
        }

        self.subscribe_watcher();
        result
    }

    async fn launch(
        &self,
        snapshot: &ManagedInstanceSnapshot,
        options: StartOptions,
    ) -> RuntimeResult<StartOutcome> {
        let install_dir = &snapshot.install_directory;

        if self.settings.firewall.manage_automatically {
            let exe_path = self.settings.server_exe_path(install_dir);
            let ports = firewall_ports(snapshot);
            let label = rule_label(&self.settings.firewall.rule_prefix, snapshot);

            if !self
                .firewall
                .ensure_ports_open(&exe_path, &ports, &label)
                .await
            {
                warn!("Failed to open firewall ports {ports:?} for '{label}'");
                if options.firewall_failure == FirewallFailurePolicy::Abort {
                    return Ok(StartOutcome::AbortedByFirewall);
                }
            }
        }

        self.log_world_save(snapshot);

        let launcher = self.settings.launcher_path(install_dir);
        let handle = self.process.launch(&launcher, install_dir).await?;
        info!(
            "Server '{}' launching (launcher pid {})",
            snapshot.profile_id,
            handle.pid()
        );

        Ok(StartOutcome::Launched(handle))
    }

    /// Stop the server gracefully.
    ///
    /// Only acts while running or initializing, and always ends in `Stopped`.
    /// A process that is already gone is not an error; a stop that times out
    /// is reported after the state is finalized.
    pub async fn stop(&self) -> RuntimeResult<()> {
        let _operation = self.operation.lock().await;
        self.stop_locked().await
    }

    pub(crate) async fn stop_locked(&self) -> RuntimeResult<()> {
        let current = self.status();
        if !matches!(
            current.run_state,
            RunState::Running | RunState::Initializing
        ) {
            debug!("Stop ignored while {}", current.run_state);
            return Ok(());
        }

        self.shared
            .set_states(RunState::Stopping, PublicationState::Unavailable);

        let result = match current.process {
            Some(process) => {
                info!("Stopping server process {}", process.pid());
                self.process.send_stop(process).await
            }
            None => {
                warn!("No server process is tracked, marking stopped");
                Ok(())
            }
        };

        let result = match result {
            Ok(()) => {
                if let Some(snapshot) = self.snapshot() {
                    self.log_world_save(&snapshot);
                }
                Ok(())
            }
            Err(e) if e.is_swallowed_on_stop() => {
                warn!("Stop signal failed, treating process as gone: {e}");
                Ok(())
            }
            Err(e) => {
                error!("Graceful stop failed: {e}");
                Err(e)
            }
        };

        self.shared.update(|status| {
            status.set_states(RunState::Stopped, PublicationState::Unavailable);
            status.process = None;
            status.players = 0;
        });
        info!("Server stopped");

        result
    }

    pub(crate) fn set_run_state(&self, run_state: RunState) {
        self.shared
            .update(|status| status.set_states(run_state, status.publication));
    }

    pub(crate) fn require_snapshot(&self) -> RuntimeResult<Arc<ManagedInstanceSnapshot>> {
        self.snapshot()
            .ok_or_else(|| RuntimeError::precondition("no instance is attached"))
    }

    pub(crate) fn log_world_save(&self, snapshot: &ManagedInstanceSnapshot) {
        let path = self.settings.world_save_path(snapshot);
        if path.is_file() {
            info!("World save found: {}", path.display());
        } else {
            warn!("World save not found: {}", path.display());
        }
    }

    fn subscribe_watcher(&self) {
        let Some(snapshot) = self.snapshot() else {
            return;
        };

        let endpoints = resolve_endpoints(&snapshot, &self.settings.public_ip);
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::SeqCst) + 1);

        let shared = Arc::downgrade(&self.shared);
        let callback: SampleCallback = Arc::new(move |sample| {
            if let Some(shared) = shared.upgrade() {
                shared.apply_sample(token, sample);
            }
        });

        // Samples may arrive before `register` returns
        let previous = self
            .shared
            .attachment()
            .subscription
            .replace(Subscription {
                token,
                registration: None,
            });
        if let Some(registration) = previous.and_then(|previous| previous.registration) {
            self.watcher.deregister(registration);
        }

        let registration = self.watcher.register(
            WatchRequest {
                install_dir: snapshot.install_directory.clone(),
                instance_id: snapshot.profile_id.clone(),
                endpoints,
            },
            callback,
        );

        let superseded = {
            let mut attachment = self.shared.attachment();
            match attachment.subscription.as_mut() {
                Some(current) if current.token == token => {
                    current.registration = Some(registration);
                    false
                }
                _ => true,
            }
        };
        if superseded {
            debug!("Subscription {} superseded while registering", token.id());
            self.watcher.deregister(registration);
            return;
        }

        debug!(
            "Watching '{}' with subscription {}",
            snapshot.profile_id,
            token.id()
        );
    }

    fn unsubscribe(&self) {
        let previous = self.shared.attachment().subscription.take();
        if let Some(previous) = previous {
            if let Some(registration) = previous.registration {
                self.watcher.deregister(registration);
            }
            debug!("Cancelled subscription {}", previous.token.id());
        }
    }
}

impl Drop for ServerRuntime {
    fn drop(&mut self) {
        self.detach();
    }
}
