use crate::process::ProcessHandle;
use crate::run_state::{PublicationState, RunState};
use crate::version::ServerVersion;

use serde::Serialize;

/// Externally observable state of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeStatus {
    pub run_state: RunState,
    pub publication: PublicationState,
    pub label: &'static str,
    pub players: u32,
    pub max_players: u32,
    pub version: Option<ServerVersion>,
    /// Live server process as last reported by the watcher
    pub process: Option<ProcessHandle>,
}

impl Default for RuntimeStatus {
    fn default() -> Self {
        Self {
            run_state: RunState::Unknown,
            publication: PublicationState::Unknown,
            label: RunState::Unknown.label(),
            players: 0,
            max_players: 0,
            version: None,
            process: None,
        }
    }
}

impl RuntimeStatus {
    /// Set both state axes. Publication is never `Available` unless running.
    pub(crate) fn set_states(&mut self, run_state: RunState, publication: PublicationState) {
        self.run_state = run_state;
        self.publication = if run_state != RunState::Running
            && publication == PublicationState::Available
        {
            PublicationState::Unavailable
        } else {
            publication
        };
        self.label = run_state.label();
    }
}

/// A change of [`RunState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: RunState,
    pub to: RunState,
}
