use crate::{
    AutoUpdateConfig, CONFIG_DIR_ENV, CONFIG_DIR_NAME, CONFIG_FILE_NAME, ConfigError,
    ConfigErrorResult, FirewallConfig, InstanceConfig, LoggingConfig, NetworkConfig,
    ProcessConfig, ServerFilesConfig, UpdateConfig,
};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server_files: ServerFilesConfig,
    pub update: UpdateConfig,
    pub auto_update: AutoUpdateConfig,
    pub network: NetworkConfig,
    pub firewall: FirewallConfig,
    pub process: ProcessConfig,
    pub logging: LoggingConfig,
    pub instances: Vec<InstanceConfig>,
}

impl Config {
    /// Load config with full production error handling.
    ///
    /// Loading order:
    /// 1. Check for GSM_CONFIG_DIR env var, else use ./.gsm/
    /// 2. Auto-create config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Apply GSM_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load and parse TOML file with detailed error context.
    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: GSM_CONFIG_DIR env var > ./.gsm/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(CONFIG_DIR_NAME))
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.server_files.validate()?;
        self.update.validate()?;
        self.process.validate()?;

        let mut seen = HashSet::new();
        for instance in &self.instances {
            instance.validate()?;
            if !seen.insert(instance.profile_id.as_str()) {
                return Err(ConfigError::instance(format!(
                    "duplicate profile_id '{}'",
                    instance.profile_id
                )));
            }
        }

        if self.auto_update.enabled && self.auto_update.cache_dir.trim().is_empty() {
            warn!(
                "auto_update is enabled but auto_update.cache_dir is empty; cache installs are skipped"
            );
        }

        Ok(())
    }

    /// Find a configured instance by profile id.
    pub fn instance(&self, profile_id: &str) -> ConfigErrorResult<&InstanceConfig> {
        self.instances
            .iter()
            .find(|i| i.profile_id == profile_id)
            .ok_or_else(|| {
                ConfigError::instance(format!("no instance with profile_id '{profile_id}'"))
            })
    }

    /// The instance used when none is named explicitly.
    pub fn default_instance(&self) -> ConfigErrorResult<&InstanceConfig> {
        self.instances
            .first()
            .ok_or_else(|| ConfigError::instance("no instances configured"))
    }

    /// Get absolute path to the log directory.
    pub fn log_dir(&self) -> ConfigErrorResult<PathBuf> {
        let dir = Path::new(&self.logging.dir);
        if dir.is_absolute() {
            return Ok(dir.to_path_buf());
        }
        Ok(Self::config_dir()?.join(dir))
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  server_files: {}/{} (launcher {})",
            self.server_files.binary_relative_path,
            self.server_files.server_exe,
            self.server_files.launcher_file
        );
        info!(
            "  update: steamcmd={}, app_id={}, redirect_output={}",
            if self.update.steamcmd_path.is_empty() {
                "<unset>"
            } else {
                self.update.steamcmd_path.as_str()
            },
            self.update.app_id,
            self.update.redirect_output
        );
        info!(
            "  auto_update: {} (cache={}, smart_copy={})",
            if self.auto_update.enabled {
                "enabled"
            } else {
                "disabled"
            },
            self.auto_update.cache_dir,
            self.auto_update.use_smart_copy
        );
        info!(
            "  network: public_ip={}",
            if self.network.public_ip.is_empty() {
                "<none>"
            } else {
                self.network.public_ip.as_str()
            }
        );
        info!(
            "  firewall: {} (prefix '{}')",
            if self.firewall.manage_automatically {
                "managed"
            } else {
                "unmanaged"
            },
            self.firewall.rule_prefix
        );
        info!(
            "  process: shutdown_timeout={}s, poll_interval={}s",
            self.process.shutdown_timeout_secs, self.process.poll_interval_secs
        );
        info!(
            "  logging: {} (colored: {})",
            *self.logging.level, self.logging.colored
        );
        // Branch passwords are never logged
        for instance in &self.instances {
            info!(
                "  instance '{}': {} ports {}/{} at {}",
                instance.profile_id,
                instance.server_name,
                instance.server_port,
                instance.query_port,
                instance.install_directory
            );
        }
    }

    fn apply_env_overrides(&mut self) {
        // Update
        Self::apply_env_string("GSM_STEAMCMD_PATH", &mut self.update.steamcmd_path);
        Self::apply_env_string("GSM_APP_ID", &mut self.update.app_id);
        Self::apply_env_bool("GSM_REDIRECT_OUTPUT", &mut self.update.redirect_output);

        // Auto update
        Self::apply_env_bool("GSM_AUTO_UPDATE_ENABLED", &mut self.auto_update.enabled);
        Self::apply_env_string("GSM_AUTO_UPDATE_CACHE_DIR", &mut self.auto_update.cache_dir);
        Self::apply_env_bool(
            "GSM_AUTO_UPDATE_SMART_COPY",
            &mut self.auto_update.use_smart_copy,
        );

        // Network
        Self::apply_env_string("GSM_PUBLIC_IP", &mut self.network.public_ip);

        // Firewall
        Self::apply_env_bool(
            "GSM_FIREWALL_MANAGE",
            &mut self.firewall.manage_automatically,
        );

        // Process
        Self::apply_env_parse(
            "GSM_SHUTDOWN_TIMEOUT_SECS",
            &mut self.process.shutdown_timeout_secs,
        );
        Self::apply_env_parse("GSM_POLL_INTERVAL_SECS", &mut self.process.poll_interval_secs);

        // Logging
        Self::apply_env_parse("GSM_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("GSM_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_string("GSM_LOG_DIR", &mut self.logging.dir);
        Self::apply_env_option_string("GSM_LOG_FILE", &mut self.logging.file);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}
