//! Query endpoint resolution for the status watcher.

use crate::error::{Result as RuntimeResult, RuntimeError};
use crate::snapshot::ManagedInstanceSnapshot;

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use tracing::{debug, warn};

/// Addresses the watcher probes for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryEndpoints {
    pub local: SocketAddr,
    /// `None` when no public address is configured or it failed to resolve.
    pub public: Option<SocketAddr>,
}

/// Compute the local and public query endpoints for an instance.
///
/// The local endpoint uses the bind address when it is a valid IP, else
/// loopback. The public endpoint uses `public_ip` as a literal address when it
/// parses, else resolves it as a host name and takes the first address.
/// Resolution failures are logged and leave the public endpoint empty.
pub fn resolve_endpoints(snapshot: &ManagedInstanceSnapshot, public_ip: &str) -> QueryEndpoints {
    let local_ip = snapshot
        .server_ip
        .trim()
        .parse::<IpAddr>()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let local = SocketAddr::new(local_ip, snapshot.query_port);

    let public = match resolve_public(public_ip.trim(), snapshot.query_port) {
        Ok(addr) => addr,
        Err(e) => {
            warn!(
                "Failed to resolve public endpoint for '{}': {e}",
                snapshot.profile_id
            );
            None
        }
    };

    debug!(
        "Endpoints for '{}': local={local}, public={}",
        snapshot.profile_id,
        public.map_or_else(|| String::from("<none>"), |a| a.to_string())
    );

    QueryEndpoints { local, public }
}

fn resolve_public(host: &str, port: u16) -> RuntimeResult<Option<SocketAddr>> {
    if host.is_empty() {
        return Ok(None);
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(Some(SocketAddr::new(ip, port)));
    }

    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| RuntimeError::network_resolution(host, e.to_string()))?;

    addrs
        .next()
        .map(Some)
        .ok_or_else(|| RuntimeError::network_resolution(host, "no addresses returned"))
}
