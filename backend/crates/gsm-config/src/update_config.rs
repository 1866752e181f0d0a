use crate::{
    DEFAULT_APP_ID, DEFAULT_BETA_NAME_ARGS_FORMAT, DEFAULT_BETA_PASSWORD_ARGS_FORMAT,
    DEFAULT_BRANCH_NAME, DEFAULT_INSTALL_ARGS_FORMAT, DEFAULT_REDIRECT_OUTPUT,
};
use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

/// SteamCMD settings used by server installs and upgrades.
///
/// The argument formats use indexed placeholders. `install_args_format`
/// receives the install directory (`{0}`), the app id (`{1}`), the branch
/// arguments (`{2}`) and the validate flag (`{3}`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateConfig {
    pub steamcmd_path: String,
    pub app_id: String,
    pub install_args_format: String,
    pub beta_name_args_format: String,
    pub beta_password_args_format: String,
    /// Capture tool output and scan it for success markers
    pub redirect_output: bool,
    pub default_branch_name: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            steamcmd_path: String::new(),
            app_id: String::from(DEFAULT_APP_ID),
            install_args_format: String::from(DEFAULT_INSTALL_ARGS_FORMAT),
            beta_name_args_format: String::from(DEFAULT_BETA_NAME_ARGS_FORMAT),
            beta_password_args_format: String::from(DEFAULT_BETA_PASSWORD_ARGS_FORMAT),
            redirect_output: DEFAULT_REDIRECT_OUTPUT,
            default_branch_name: String::from(DEFAULT_BRANCH_NAME),
        }
    }
}

impl UpdateConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::update("update.app_id cannot be empty"));
        }

        for placeholder in ["{0}", "{1}", "{2}", "{3}"] {
            if !self.install_args_format.contains(placeholder) {
                return Err(ConfigError::update(format!(
                    "update.install_args_format must contain {placeholder}"
                )));
            }
        }

        if !self.beta_name_args_format.contains("{0}") {
            return Err(ConfigError::update(
                "update.beta_name_args_format must contain {0}",
            ));
        }

        if !self.beta_password_args_format.contains("{0}") {
            return Err(ConfigError::update(
                "update.beta_password_args_format must contain {0}",
            ));
        }

        Ok(())
    }
}
