use std::fmt;

use serde::Serialize;

/// Lifecycle state of a managed server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunState {
    Unknown,
    Initializing,
    Running,
    Stopping,
    Stopped,
    Updating,
    Uninstalled,
}

impl RunState {
    /// Display label shown next to the instance.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Initializing => "Initializing",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Updating => "Updating",
            Self::Uninstalled => "Not Installed",
        }
    }

    /// States in which configuration may be reattached.
    pub fn is_quiescent(&self) -> bool {
        matches!(self, Self::Stopped | Self::Uninstalled | Self::Unknown)
    }

    /// States in which `start()` has nothing to do.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Initializing | Self::Stopping)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Visibility of the instance on the public query layer.
///
/// Tracked independently of [`RunState`] so publication can lag behind the
/// process coming up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PublicationState {
    Unknown,
    NeedPublicIP,
    Unavailable,
    WaitingForPublication,
    Available,
}

impl PublicationState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::NeedPublicIP => "Need Public IP",
            Self::Unavailable => "Unavailable",
            Self::WaitingForPublication => "Waiting For Publication",
            Self::Available => "Available",
        }
    }
}

impl fmt::Display for PublicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
