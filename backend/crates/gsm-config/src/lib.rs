mod auto_update_config;
mod config;
mod error;
mod firewall_config;
mod instance_config;
mod log_level;
mod logging_config;
mod network_config;
mod process_config;
mod server_files_config;
mod update_config;

#[cfg(test)]
mod tests;

pub use auto_update_config::AutoUpdateConfig;
pub use config::Config;
pub use error::{ConfigError, ConfigErrorResult};
pub use firewall_config::FirewallConfig;
pub use instance_config::InstanceConfig;
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use network_config::NetworkConfig;
pub use process_config::ProcessConfig;
pub use server_files_config::ServerFilesConfig;
pub use update_config::UpdateConfig;

pub const CONFIG_DIR_ENV: &str = "GSM_CONFIG_DIR";
pub const CONFIG_DIR_NAME: &str = ".gsm";
pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "logs";
const DEFAULT_LOG_COLORED: bool = true;

const DEFAULT_BINARY_RELATIVE_PATH: &str = "ShooterGame/Binaries/Win64";
const DEFAULT_SERVER_EXE: &str = "ShooterGameServer.exe";
const DEFAULT_CONFIG_RELATIVE_PATH: &str = "ShooterGame/Saved/Config/WindowsServer";
const DEFAULT_LAUNCHER_FILE: &str = "RunServer.cmd";
const DEFAULT_SAVE_RELATIVE_PATH: &str = "ShooterGame/Saved";
const DEFAULT_SAVED_ARKS_FOLDER: &str = "SavedArks";

const DEFAULT_APP_ID: &str = "376030";
const DEFAULT_INSTALL_ARGS_FORMAT: &str =
    "+force_install_dir \"{0}\" +login anonymous +app_update {1} {2} {3} +quit";
const DEFAULT_BETA_NAME_ARGS_FORMAT: &str = "-beta {0}";
const DEFAULT_BETA_PASSWORD_ARGS_FORMAT: &str = "-betapassword {0}";
const DEFAULT_REDIRECT_OUTPUT: bool = true;
const DEFAULT_BRANCH_NAME: &str = "public";

const DEFAULT_USE_SMART_COPY: bool = true;
const DEFAULT_BRANCH_FOLDER_PREFIX: &str = "branch_";

const DEFAULT_FIREWALL_RULE_PREFIX: &str = "GSM";

const DEFAULT_SERVER_PORT: u16 = 7777;
const DEFAULT_QUERY_PORT: u16 = 27015;
const DEFAULT_RCON_PORT: u16 = 32330;
const DEFAULT_MAX_PLAYERS: u32 = 70;
const DEFAULT_SERVER_MAP: &str = "TheIsland";
