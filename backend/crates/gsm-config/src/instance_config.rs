use crate::{
    DEFAULT_MAX_PLAYERS, DEFAULT_QUERY_PORT, DEFAULT_RCON_PORT, DEFAULT_SERVER_MAP,
    DEFAULT_SERVER_PORT,
};
use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

/// One managed server profile.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstanceConfig {
    pub profile_id: String,
    pub profile_name: String,
    pub install_directory: String,
    pub server_name: String,
    /// Bind address; empty means all interfaces
    pub server_ip: String,
    pub server_port: u16,
    pub query_port: u16,
    pub rcon_enabled: bool,
    pub rcon_port: u16,
    pub use_raw_sockets: bool,
    pub max_players: u32,
    pub server_map: String,
    pub alt_save_directory_name: Option<String>,
    pub last_installed_version: Option<String>,
    pub branch_name: Option<String>,
    pub branch_password: Option<String>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            profile_id: String::new(),
            profile_name: String::new(),
            install_directory: String::new(),
            server_name: String::new(),
            server_ip: String::new(),
            server_port: DEFAULT_SERVER_PORT,
            query_port: DEFAULT_QUERY_PORT,
            rcon_enabled: false,
            rcon_port: DEFAULT_RCON_PORT,
            use_raw_sockets: false,
            max_players: DEFAULT_MAX_PLAYERS,
            server_map: String::from(DEFAULT_SERVER_MAP),
            alt_save_directory_name: None,
            last_installed_version: None,
            branch_name: None,
            branch_password: None,
        }
    }
}

impl InstanceConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.profile_id.trim().is_empty() {
            return Err(ConfigError::instance("instances.profile_id cannot be empty"));
        }

        if self.install_directory.trim().is_empty() {
            return Err(ConfigError::instance(format!(
                "instances[{}].install_directory cannot be empty",
                self.profile_id
            )));
        }

        for (name, port) in [
            ("server_port", self.server_port),
            ("query_port", self.query_port),
            ("rcon_port", self.rcon_port),
        ] {
            if port == 0 {
                return Err(ConfigError::instance(format!(
                    "instances[{}].{name} must be non-zero",
                    self.profile_id
                )));
            }
        }

        if self.use_raw_sockets && self.server_port == u16::MAX {
            return Err(ConfigError::instance(format!(
                "instances[{}].server_port leaves no room for the raw socket port",
                self.profile_id
            )));
        }

        Ok(())
    }
}
