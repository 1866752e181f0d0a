use std::panic::Location;

use error_location::ErrorLocation;
use gsm_config::ConfigError;
use gsm_runtime::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Logging setup failed: {message} {location}")]
    Logging {
        message: String,
        location: ErrorLocation,
    },

    #[error("Failed to encode output: {source} {location}")]
    Output {
        #[source]
        source: serde_json::Error,
        location: ErrorLocation,
    },
}

impl CliError {
    #[track_caller]
    pub fn logging<S: Into<String>>(message: S) -> Self {
        Self::Logging {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn output(source: serde_json::Error) -> Self {
        Self::Output {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::Config(_) => {
                "Check config.toml in the config directory (GSM_CONFIG_DIR or ./.gsm)."
            }
            Self::Runtime(e) => e.recovery_hint(),
            Self::Logging { .. } => "Check that logging.dir is writable.",
            Self::Output { .. } => {
                "An unexpected error occurred. Please check the logs for details."
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
