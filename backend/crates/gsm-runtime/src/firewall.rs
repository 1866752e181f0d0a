use crate::snapshot::ManagedInstanceSnapshot;

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

/// Opens inbound firewall ports for a server executable.
#[async_trait]
pub trait FirewallGate: Send + Sync {
    /// Returns `false` when the rules could not be put in place.
    async fn ensure_ports_open(&self, exe_path: &Path, ports: &[u16], rule_label: &str) -> bool;
}

/// Gate for hosts where firewall rules are managed outside the manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternallyManagedFirewall;

#[async_trait]
impl FirewallGate for ExternallyManagedFirewall {
    async fn ensure_ports_open(&self, exe_path: &Path, ports: &[u16], rule_label: &str) -> bool {
        info!(
            "Firewall managed externally; expecting '{rule_label}' to allow {ports:?} for {}",
            exe_path.display()
        );
        true
    }
}

/// Ports the instance listens on: game, query, raw socket and RCON.
pub fn firewall_ports(snapshot: &ManagedInstanceSnapshot) -> Vec<u16> {
    let mut ports = vec![snapshot.server_port, snapshot.query_port];

    if snapshot.use_raw_sockets
        && let Some(raw_port) = snapshot.server_port.checked_add(1)
    {
        ports.push(raw_port);
    }

    if snapshot.rcon_enabled {
        ports.push(snapshot.rcon_port);
    }

    ports
}

pub fn rule_label(prefix: &str, snapshot: &ManagedInstanceSnapshot) -> String {
    format!("{prefix} {}", snapshot.server_name)
}
