//! Container runtime adapter (C5): a thin wrapper around the Docker Engine
//! API client that resolves the handful of networking quirks that differ
//! across local Docker Desktop flavors.

pub mod error;
pub mod runtime;

pub use error::RuntimeError;
pub use runtime::{Runtime, RuntimeKind};
