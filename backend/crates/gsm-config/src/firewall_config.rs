use crate::DEFAULT_FIREWALL_RULE_PREFIX;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FirewallConfig {
    pub manage_automatically: bool,
    pub rule_prefix: String,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            manage_automatically: false,
            rule_prefix: String::from(DEFAULT_FIREWALL_RULE_PREFIX),
        }
    }
}
