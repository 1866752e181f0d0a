use std::fmt;
use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

/// Which external program could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableKind {
    /// The per-instance launcher script
    Launcher,
    /// SteamCMD
    UpdateTool,
}

impl fmt::Display for ExecutableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launcher => write!(f, "server launcher"),
            Self::UpdateTool => write!(f, "update tool"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Precondition failed: {message} {location}")]
    PreconditionFailure {
        message: String,
        location: ErrorLocation,
    },

    #[error("The {kind} was not found at {path} (install directory {install_dir}) {location}")]
    MissingExecutable {
        kind: ExecutableKind,
        path: PathBuf,
        install_dir: PathBuf,
        location: ErrorLocation,
    },

    #[error("Process control failed for pid {pid}: {message} {location}")]
    ProcessControl {
        pid: u32,
        message: String,
        location: ErrorLocation,
    },

    #[error("Graceful shutdown of pid {pid} timed out after {timeout_secs}s {location}")]
    ShutdownTimeout {
        pid: u32,
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("Could not resolve {host}: {message} {location}")]
    NetworkResolution {
        host: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Update tool failed: {message} {location}")]
    UpdateTool {
        message: String,
        location: ErrorLocation,
    },

    #[error("Operation cancelled {location}")]
    Cancelled { location: ErrorLocation },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Configuration invalid: {source}")]
    Config {
        #[source]
        source: gsm_config::ConfigError,
    },
}

impl RuntimeError {
    #[track_caller]
    pub fn precondition<S: Into<String>>(message: S) -> Self {
        Self::PreconditionFailure {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn missing_executable(
        kind: ExecutableKind,
        path: impl Into<PathBuf>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::MissingExecutable {
            kind,
            path: path.into(),
            install_dir: install_dir.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn process_control<S: Into<String>>(pid: u32, message: S) -> Self {
        Self::ProcessControl {
            pid,
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn shutdown_timeout(pid: u32, timeout_secs: u64) -> Self {
        Self::ShutdownTimeout {
            pid,
            timeout_secs,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn network_resolution<H: Into<String>, S: Into<String>>(host: H, message: S) -> Self {
        Self::NetworkResolution {
            host: host.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn update_tool<S: Into<String>>(message: S) -> Self {
        Self::UpdateTool {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn cancelled() -> Self {
        Self::Cancelled {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Failures `stop()` absorbs: the process handle no longer refers to a
    /// live process, which is the outcome a stop wants anyway.
    pub fn is_swallowed_on_stop(&self) -> bool {
        matches!(self, Self::ProcessControl { .. })
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::PreconditionFailure { .. } => {
                "The operation cannot run in the current setup. \
                   Attach an instance first, and run the manager on a 64-bit host."
            }
            Self::MissingExecutable {
                kind: ExecutableKind::Launcher,
                ..
            } => {
                "The server launcher is missing. \
                   Reinstall or upgrade the server to recreate it."
            }
            Self::MissingExecutable {
                kind: ExecutableKind::UpdateTool,
                ..
            } => {
                "SteamCMD could not be found. \
                   Set update.steamcmd_path (or GSM_STEAMCMD_PATH) to its location."
            }
            Self::ShutdownTimeout { .. } => {
                "The server did not exit in time. \
                   Check whether it is still saving, or raise process.shutdown_timeout_secs."
            }
            Self::NetworkResolution { .. } => {
                "The public address could not be resolved. \
                   Check network.public_ip and your DNS settings."
            }
            Self::UpdateTool { .. } => {
                "SteamCMD did not complete. \
                   Retry the upgrade, or disable redirect_output to inspect its console."
            }
            Self::Config { .. } => {
                "Configuration file has invalid settings. \
                   Check the logs for details or delete the config file to use defaults."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for RuntimeError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<gsm_config::ConfigError> for RuntimeError {
    fn from(source: gsm_config::ConfigError) -> Self {
        Self::Config { source }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
