//! The container runtime adapter (C5): a polymorphic wrapper over Docker
//! Engine API clients that differ only in a handful of desktop-specific
//! networking quirks.

use std::net::Ipv4Addr;

use bollard::network::InspectNetworkOptions;
use bollard::Docker;

use crate::error::RuntimeError;

/// Selects which flavor of local Docker Desktop networking quirks apply.
/// Chosen from the `LAVA_RUNTIME` environment variable; empty/unset
/// defaults to [`Runtime::Dockerd`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Dockerd,
    DockerdDockerDesktop,
    DockerdRancherDesktop,
    DockerdPodmanDesktop,
}

impl RuntimeKind {
    pub fn from_env() -> Result<RuntimeKind, RuntimeError> {
        match std::env::var("LAVA_RUNTIME").unwrap_or_default().as_str() {
            "" | "dockerd" => Ok(RuntimeKind::Dockerd),
            "docker-desktop" => Ok(RuntimeKind::DockerdDockerDesktop),
            "rancher-desktop" => Ok(RuntimeKind::DockerdRancherDesktop),
            "podman-desktop" => Ok(RuntimeKind::DockerdPodmanDesktop),
            other => Err(RuntimeError::UnknownRuntime(other.to_string())),
        }
    }

    /// The DNS name checks should use to reach the host.
    pub fn host_gateway_hostname(self) -> &'static str {
        match self {
            RuntimeKind::DockerdPodmanDesktop => "host.containers.internal",
            _ => "host.docker.internal",
        }
    }

    /// An `--add-host` mapping to append to a container's `extra_hosts`,
    /// or empty when the daemon resolves the hostname natively.
    pub fn host_gateway_mapping(self) -> String {
        match self {
            RuntimeKind::Dockerd => format!("{}:host-gateway", self.host_gateway_hostname()),
            _ => String::new(),
        }
    }

    /// Normalize a `DOCKER_HOST`-style daemon address for this flavor.
    pub fn normalize_daemon_host(self, raw: &str) -> String {
        match self {
            RuntimeKind::DockerdDockerDesktop if raw.ends_with("docker.sock") => {
                "unix:///var/run/docker.sock".to_string()
            }
            _ => raw.to_string(),
        }
    }
}

/// A connected Docker Engine API client plus the desktop-flavor quirks
/// needed to pick reachable addresses for the target server.
pub struct Runtime {
    pub kind: RuntimeKind,
    pub docker: Docker,
}

impl Runtime {
    /// Connect using the conventional environment (`DOCKER_HOST`,
    /// `DOCKER_CERT_PATH`, `DOCKER_TLS_VERIFY`, `DOCKER_CONFIG`), with the
    /// flavor selected from `LAVA_RUNTIME`.
    pub fn connect() -> Result<Runtime, RuntimeError> {
        let kind = RuntimeKind::from_env()?;
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Runtime { kind, docker })
    }

    pub fn host_gateway_hostname(&self) -> &'static str {
        self.kind.host_gateway_hostname()
    }

    pub fn host_gateway_mapping(&self) -> String {
        self.kind.host_gateway_mapping()
    }

    /// The address the target server should bind its listeners to for a
    /// container to reach it: the default bridge network's gateway IP for
    /// `Dockerd`, loopback for desktop flavors that already proxy host
    /// traffic onto their VM.
    pub async fn host_gateway_interface_addr(&self) -> Result<String, RuntimeError> {
        match self.kind {
            RuntimeKind::Dockerd => Ok(self.bridge_gateway().await?.to_string()),
            _ => Ok("127.0.0.1".to_string()),
        }
    }

    /// Inspect the default `bridge` network, assert exactly one IPAM
    /// config, parse its subnet and gateway, verify the gateway lies
    /// within the subnet, and return the gateway address.
    pub async fn bridge_gateway(&self) -> Result<Ipv4Addr, RuntimeError> {
        let network = self
            .docker
            .inspect_network("bridge", None::<InspectNetworkOptions<String>>)
            .await?;

        let ipam_configs = network
            .ipam
            .and_then(|ipam| ipam.config)
            .unwrap_or_default();

        if ipam_configs.is_empty() {
            return Err(RuntimeError::NoIpamConfig);
        }
        if ipam_configs.len() != 1 {
            return Err(RuntimeError::AmbiguousIpamConfig(ipam_configs.len()));
        }

        let config = &ipam_configs[0];
        let subnet = config
            .subnet
            .as_deref()
            .ok_or(RuntimeError::IncompleteIpamConfig)?;
        let gateway = config
            .gateway
            .as_deref()
            .ok_or(RuntimeError::IncompleteIpamConfig)?;

        let gateway_addr: Ipv4Addr = gateway
            .parse()
            .map_err(|e| RuntimeError::InvalidAddr(gateway.to_string(), e))?;

        if !cidr_contains(subnet, gateway_addr)? {
            return Err(RuntimeError::GatewayOutsideSubnet {
                gateway: gateway.to_string(),
                subnet: subnet.to_string(),
            });
        }

        Ok(gateway_addr)
    }
}

/// Whether `addr` falls within the IPv4 CIDR block `cidr` (`a.b.c.d/n`).
fn cidr_contains(cidr: &str, addr: Ipv4Addr) -> Result<bool, RuntimeError> {
    let (base, bits) = cidr
        .split_once('/')
        .ok_or(RuntimeError::IncompleteIpamConfig)?;
    let base: Ipv4Addr = base
        .parse()
        .map_err(|e| RuntimeError::InvalidAddr(base.to_string(), e))?;
    let bits: u32 = bits.parse().unwrap_or(32);
    let mask = if bits == 0 {
        0
    } else {
        u32::MAX << (32 - bits)
    };
    let base_bits = u32::from(base) & mask;
    let addr_bits = u32::from(addr) & mask;
    Ok(base_bits == addr_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dockerd_uses_docker_internal_hostname() {
        assert_eq!(
            RuntimeKind::Dockerd.host_gateway_hostname(),
            "host.docker.internal"
        );
        assert_eq!(
            RuntimeKind::DockerdPodmanDesktop.host_gateway_hostname(),
            "host.containers.internal"
        );
    }

    #[test]
    fn only_dockerd_needs_host_gateway_mapping() {
        assert!(!RuntimeKind::Dockerd.host_gateway_mapping().is_empty());
        assert!(RuntimeKind::DockerdDockerDesktop
            .host_gateway_mapping()
            .is_empty());
    }

    #[test]
    fn docker_desktop_normalizes_socket_path() {
        let normalized =
            RuntimeKind::DockerdDockerDesktop.normalize_daemon_host("/var/run/docker.sock");
        assert_eq!(normalized, "unix:///var/run/docker.sock");
    }

    #[test]
    fn dockerd_passes_daemon_host_through() {
        let raw = "tcp://10.0.0.5:2376";
        assert_eq!(RuntimeKind::Dockerd.normalize_daemon_host(raw), raw);
    }

    #[test]
    fn cidr_contains_matches_within_subnet() {
        let gw: Ipv4Addr = "172.17.0.1".parse().unwrap();
        assert!(cidr_contains("172.17.0.0/16", gw).unwrap());
        assert!(!cidr_contains("10.0.0.0/8", gw).unwrap());
    }

    #[test]
    fn from_env_defaults_to_dockerd() {
        std::env::remove_var("LAVA_RUNTIME");
        assert_eq!(RuntimeKind::from_env().unwrap(), RuntimeKind::Dockerd);
    }

    #[test]
    fn from_env_rejects_unknown_value() {
        std::env::set_var("LAVA_RUNTIME", "bogus-flavor");
        assert!(RuntimeKind::from_env().is_err());
        std::env::remove_var("LAVA_RUNTIME");
    }
}
