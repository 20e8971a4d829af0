//! TCP proxy: accepts connections on a container-reachable listener and
//! relays them to the real (loopback or local-network) target address.

use tokio::net::{TcpListener, TcpStream};

use crate::error::TargetServerError;

/// Bind a listener on `bind_addr` and spawn an accept loop that relays
/// every connection to `upstream`. Returns the bound local address and the
/// accept loop's task handle, so the caller can build a rewritten
/// identifier and later tear the listener down via [`Close`](crate::TargetServer::close).
pub async fn spawn_proxy(
    bind_addr: &str,
    upstream: String,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), TargetServerError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| TargetServerError::Bind(bind_addr.to_string(), e))?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        loop {
            let (inbound, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "target server proxy accept failed");
                    continue;
                }
            };
            let upstream = upstream.clone();
            tokio::spawn(async move {
                if let Err(e) = relay(inbound, &upstream).await {
                    tracing::debug!(peer = %peer, upstream = %upstream, error = %e, "proxy connection ended");
                }
            });
        }
    });

    Ok((local_addr, handle))
}

async fn relay(mut inbound: TcpStream, upstream: &str) -> Result<(), TargetServerError> {
    let mut outbound = TcpStream::connect(upstream).await?;
    tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await?;
    Ok(())
}
