use crate::{DEFAULT_BRANCH_FOLDER_PREFIX, DEFAULT_USE_SMART_COPY};

use serde::Deserialize;

/// Shared server cache used to seed fresh installs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutoUpdateConfig {
    pub enabled: bool,
    pub cache_dir: String,
    pub use_smart_copy: bool,
    /// Each branch is cached under `<cache_dir>/<prefix><branch>`
    pub branch_folder_prefix: String,
}

impl Default for AutoUpdateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cache_dir: String::new(),
            use_smart_copy: DEFAULT_USE_SMART_COPY,
            branch_folder_prefix: String::from(DEFAULT_BRANCH_FOLDER_PREFIX),
        }
    }
}
