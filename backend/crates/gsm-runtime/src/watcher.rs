//! Status watcher seam: the runtime subscribes to periodic samples and maps
//! them onto its lifecycle state.

use crate::endpoint::QueryEndpoints;
use crate::process::ProcessHandle;
use crate::run_state::{PublicationState, RunState};

use std::path::PathBuf;
use std::sync::Arc;

/// Coarse status reported by a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherStatus {
    NotInstalled,
    Initializing,
    Stopped,
    Unknown,
    /// Process is alive, local query not confirmed
    RunningLocalCheck,
    /// Local query answers, public query not yet
    RunningExternalCheck,
    /// Visible through the public query endpoint
    Published,
}

impl WatcherStatus {
    /// Map a watcher status onto both state axes.
    ///
    /// `current` is the publication state before the sample; a local-only
    /// reading does not downgrade an instance that is already published.
    pub fn to_states(self, current: PublicationState) -> (RunState, PublicationState) {
        match self {
            Self::NotInstalled => (RunState::Uninstalled, PublicationState::Unavailable),
            Self::Initializing => (RunState::Initializing, PublicationState::Unavailable),
            Self::Stopped => (RunState::Stopped, PublicationState::Unavailable),
            Self::Unknown => (RunState::Unknown, PublicationState::Unknown),
            Self::RunningLocalCheck if current == PublicationState::Available => {
                (RunState::Running, PublicationState::Available)
            }
            Self::RunningLocalCheck | Self::RunningExternalCheck => {
                (RunState::Running, PublicationState::WaitingForPublication)
            }
            Self::Published => (RunState::Running, PublicationState::Available),
        }
    }
}

/// Server details read from the query protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Advertised name, usually carrying a `(vMAJOR.MINOR)` tag
    pub name: String,
    pub players: u32,
    pub max_players: u32,
}

/// One reading from a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSample {
    pub status: WatcherStatus,
    pub process: Option<ProcessHandle>,
    pub server_info: Option<ServerInfo>,
    pub players: Option<Vec<String>>,
}

impl StatusSample {
    pub fn new(status: WatcherStatus) -> Self {
        Self {
            status,
            process: None,
            server_info: None,
            players: None,
        }
    }

    pub fn with_process(mut self, process: ProcessHandle) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = Some(server_info);
        self
    }

    pub fn with_players(mut self, players: Vec<String>) -> Self {
        self.players = Some(players);
        self
    }
}

/// What to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub install_dir: PathBuf,
    pub instance_id: String,
    pub endpoints: QueryEndpoints,
}

pub type SampleCallback = Arc<dyn Fn(StatusSample) + Send + Sync>;

/// Handle a watcher hands back from [`StatusWatcher::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchRegistration(u64);

impl WatchRegistration {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Periodic status source for managed instances.
///
/// Callbacks may fire on any thread, and may still fire briefly after
/// `deregister` returns.
pub trait StatusWatcher: Send + Sync {
    fn register(&self, request: WatchRequest, callback: SampleCallback) -> WatchRegistration;

    fn deregister(&self, registration: WatchRegistration);
}

/// Runtime-side identity of one registration; samples carrying an older token
/// are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub(crate) u64);

impl SubscriptionToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The token is stored before the watcher is asked to register, so the
/// registration is missing until `register` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Subscription {
    pub(crate) token: SubscriptionToken,
    pub(crate) registration: Option<WatchRegistration>,
}
