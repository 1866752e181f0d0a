use crate::{
    DEFAULT_BINARY_RELATIVE_PATH, DEFAULT_CONFIG_RELATIVE_PATH, DEFAULT_LAUNCHER_FILE,
    DEFAULT_SAVE_RELATIVE_PATH, DEFAULT_SAVED_ARKS_FOLDER, DEFAULT_SERVER_EXE,
};
use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

/// Layout of a dedicated server installation, relative to its install directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerFilesConfig {
    /// Directory holding the server executable
    pub binary_relative_path: String,
    pub server_exe: String,
    pub config_relative_path: String,
    /// Launcher script, written into the config directory
    pub launcher_file: String,
    pub save_relative_path: String,
    pub saved_arks_folder: String,
}

impl Default for ServerFilesConfig {
    fn default() -> Self {
        Self {
            binary_relative_path: String::from(DEFAULT_BINARY_RELATIVE_PATH),
            server_exe: String::from(DEFAULT_SERVER_EXE),
            config_relative_path: String::from(DEFAULT_CONFIG_RELATIVE_PATH),
            launcher_file: String::from(DEFAULT_LAUNCHER_FILE),
            save_relative_path: String::from(DEFAULT_SAVE_RELATIVE_PATH),
            saved_arks_folder: String::from(DEFAULT_SAVED_ARKS_FOLDER),
        }
    }
}

impl ServerFilesConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.server_exe.trim().is_empty() {
            return Err(ConfigError::config("server_files.server_exe cannot be empty"));
        }

        if self.launcher_file.trim().is_empty() {
            return Err(ConfigError::config(
                "server_files.launcher_file cannot be empty",
            ));
        }

        for (name, value) in [
            ("binary_relative_path", &self.binary_relative_path),
            ("config_relative_path", &self.config_relative_path),
            ("save_relative_path", &self.save_relative_path),
        ] {
            if std::path::Path::new(value).is_absolute() {
                return Err(ConfigError::config(format!(
                    "server_files.{name} must be relative, got {value}"
                )));
            }
        }

        Ok(())
    }
}
