//! Target server (C6): makes local assets reachable from inside check
//! containers under a stable name, and tracks the identifier rewrites so
//! the engine can undo them in the final report.

pub mod addr;
pub mod error;
pub mod gitserve;
pub mod proxy;

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use lava_core::{AssetType, Target, TargetMap};
use lava_runtime::Runtime;
use tokio::sync::Mutex;
use uuid::Uuid;

pub use error::TargetServerError;

struct Listener {
    task: tokio::task::JoinHandle<()>,
    mirror_dir: Option<tempfile::TempDir>,
}

/// Holds every live (listener, [`TargetMap`]) pair, keyed by `check_id`.
pub struct TargetServer {
    host_gateway_hostname: &'static str,
    bind_interface: String,
    state: Mutex<HashMap<Uuid, Vec<Listener>>>,
}

impl TargetServer {
    pub async fn new(runtime: &Runtime) -> Result<TargetServer, TargetServerError> {
        Ok(TargetServer {
            host_gateway_hostname: runtime.host_gateway_hostname(),
            bind_interface: runtime.host_gateway_interface_addr().await?,
            state: Mutex::new(HashMap::new()),
        })
    }

    /// Decide whether `target` needs rewriting for a container to reach
    /// it; if so, start the relevant proxy or Git server and return a
    /// [`TargetMap`]. Returns `None` (the "Zero" value) when no rewrite is
    /// needed.
    pub async fn handle(
        &self,
        check_id: Uuid,
        target: &Target,
    ) -> Result<Option<TargetMap>, TargetServerError> {
        let result = match target.asset_type {
            AssetType::Path => self.handle_path(check_id, target).await.map(Some),
            AssetType::GitRepository | AssetType::WebAddress | AssetType::Hostname | AssetType::IP => {
                self.handle_network(check_id, target).await
            }
            AssetType::DockerImage | AssetType::AWSAccount | AssetType::IPRange => Ok(None),
        };
        if let Ok(Some(_)) = &result {
            lava_core::metrics::METRICS.inc_targets_rewritten();
        }
        result
    }

    async fn handle_path(
        &self,
        check_id: Uuid,
        target: &Target,
    ) -> Result<TargetMap, TargetServerError> {
        let source = Path::new(&target.identifier);
        let mirror_dir = tempfile::tempdir().map_err(|e| TargetServerError::GitMirror {
            path: target.identifier.clone(),
            source: e,
        })?;
        let repo_path = gitserve::mirror(source, mirror_dir.path()).await?;

        let bind_addr = format!("{}:0", self.bind_interface);
        let (local_addr, task) = gitserve::spawn_server(&bind_addr, repo_path).await?;

        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("repo");
        // `serve_one` pipes the raw socket into `git upload-pack`'s
        // stdin/stdout: the `git://` wire protocol, not smart-HTTP framing.
        let new_identifier = format!(
            "git://{}:{}/{}.git",
            self.host_gateway_hostname,
            local_addr.port(),
            name
        );

        self.register(
            check_id,
            Listener {
                task,
                mirror_dir: Some(mirror_dir),
            },
        )
        .await;

        Ok(TargetMap {
            check_id,
            old_identifier: target.identifier.clone(),
            new_identifier: new_identifier.clone(),
            old_asset_type: AssetType::Path,
            new_asset_type: AssetType::GitRepository,
            addrs: lava_core::AddrPair {
                old: target.identifier.clone(),
                new: new_identifier,
            },
        })
    }

    async fn handle_network(
        &self,
        check_id: Uuid,
        target: &Target,
    ) -> Result<Option<TargetMap>, TargetServerError> {
        let (host, port) = addr::get_target_addr(&target.identifier);
        if !is_local(&host) {
            return Ok(None);
        }
        let Some(port) = port else {
            return Ok(None);
        };

        let bind_addr = format!("{}:0", self.bind_interface);
        let upstream = format!("{host}:{port}");
        let (local_addr, task) = proxy::spawn_proxy(&bind_addr, upstream).await?;

        let new_identifier = target
            .identifier
            .replacen(&host, self.host_gateway_hostname, 1)
            .replacen(&port.to_string(), &local_addr.port().to_string(), 1);

        self.register(
            check_id,
            Listener {
                task,
                mirror_dir: None,
            },
        )
        .await;

        Ok(Some(TargetMap {
            check_id,
            old_identifier: target.identifier.clone(),
            new_identifier: new_identifier.clone(),
            old_asset_type: target.asset_type,
            new_asset_type: target.asset_type,
            addrs: lava_core::AddrPair {
                old: target.identifier.clone(),
                new: new_identifier,
            },
        }))
    }

    async fn register(&self, check_id: Uuid, listener: Listener) {
        self.state
            .lock()
            .await
            .entry(check_id)
            .or_default()
            .push(listener);
    }

    /// Tear down every live listener.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        for (_, listeners) in state.drain() {
            for listener in listeners {
                listener.task.abort();
                drop(listener.mirror_dir);
            }
        }
    }
}

/// Whether `host` refers to the loopback interface or a private (RFC 1918)
/// network — the cases the target server must proxy for container
/// reachability.
fn is_local(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        Ok(IpAddr::V6(v6)) => v6.is_loopback(),
        Err(_) => false,
    }
}
