use std::path::{Path, PathBuf};
use std::time::Duration;

use gsm_config::{
    AutoUpdateConfig, Config, FirewallConfig, InstanceConfig, ServerFilesConfig, UpdateConfig,
};

/// Immutable copy of one instance's configuration, taken when it is attached.
///
/// Operations read the snapshot rather than live configuration, so edits made
/// while a start or upgrade is running only apply on the next attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedInstanceSnapshot {
    pub profile_id: String,
    pub profile_name: String,
    pub install_directory: PathBuf,
    pub server_name: String,
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

impl ManagedInstanceSnapshot {
    pub fn from_config(instance: &InstanceConfig) -> Self {
        Self {
            profile_id: instance.profile_id.clone(),
            profile_name: instance.profile_name.clone(),
            install_directory: PathBuf::from(&instance.install_directory),
            server_name: instance.server_name.clone(),
            server_ip: instance.server_ip.clone(),
            server_port: instance.server_port,
            query_port: instance.query_port,
            rcon_enabled: instance.rcon_enabled,
            rcon_port: instance.rcon_port,
            use_raw_sockets: instance.use_raw_sockets,
            max_players: instance.max_players,
            server_map: instance.server_map.clone(),
            alt_save_directory_name: instance.alt_save_directory_name.clone(),
            last_installed_version: instance.last_installed_version.clone(),
            branch_name: instance.branch_name.clone(),
            branch_password: instance.branch_password.clone(),
        }
    }
}

/// Global settings a runtime needs, captured once at construction.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub server_files: ServerFilesConfig,
    pub update: UpdateConfig,
    pub auto_update: AutoUpdateConfig,
    pub firewall: FirewallConfig,
    pub public_ip: String,
    pub shutdown_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RuntimeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            server_files: config.server_files.clone(),
            update: config.update.clone(),
            auto_update: config.auto_update.clone(),
            firewall: config.firewall.clone(),
            public_ip: config.network.public_ip.clone(),
            shutdown_timeout: Duration::from_secs(config.process.shutdown_timeout_secs),
            poll_interval: Duration::from_secs(config.process.poll_interval_secs),
        }
    }

    pub fn binary_dir(&self, install_dir: &Path) -> PathBuf {
        install_dir.join(&self.server_files.binary_relative_path)
    }

    pub fn server_exe_path(&self, install_dir: &Path) -> PathBuf {
        self.binary_dir(install_dir).join(&self.server_files.server_exe)
    }

    pub fn launcher_path(&self, install_dir: &Path) -> PathBuf {
        install_dir
            .join(&self.server_files.config_relative_path)
            .join(&self.server_files.launcher_file)
    }

    /// Expected world save for the instance's map.
    pub fn world_save_path(&self, snapshot: &ManagedInstanceSnapshot) -> PathBuf {
        let folder = snapshot
            .alt_save_directory_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.server_files.saved_arks_folder);

        snapshot
            .install_directory
            .join(&self.server_files.save_relative_path)
            .join(folder)
            .join(format!("{}.ark", snapshot.server_map))
    }

    pub fn steamcmd_path(&self) -> PathBuf {
        PathBuf::from(&self.update.steamcmd_path)
    }
}
