//! Errors raised by the container runtime adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to connect to the Docker daemon: {0}")]
    Connect(#[from] bollard::errors::Error),

    #[error("default bridge network has no IPAM config")]
    NoIpamConfig,

    #[error("default bridge network has {0} IPAM configs, expected exactly one")]
    AmbiguousIpamConfig(usize),

    #[error("IPAM config is missing a subnet or gateway")]
    IncompleteIpamConfig,

    #[error("failed to parse network address {0:?}: {1}")]
    InvalidAddr(String, #[source] std::net::AddrParseError),

    #[error("gateway {gateway} is not contained in subnet {subnet}")]
    GatewayOutsideSubnet { gateway: String, subnet: String },

    #[error("unknown LAVA_RUNTIME value {0:?}")]
    UnknownRuntime(String),
}
