//! Serve a local directory as a bare Git repository over TCP, by mirroring
//! it once and shelling out to `git upload-pack` per connection rather than
//! reimplementing the smart-HTTP/pack wire protocol.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::process::Command;

use crate::error::TargetServerError;

/// Create a bare mirror of `source_dir` under `dest_dir`, ready to be
/// served by [`serve`].
pub async fn mirror(source_dir: &Path, dest_dir: &Path) -> Result<PathBuf, TargetServerError> {
    let status = Command::new("git")
        .arg("clone")
        .arg("--bare")
        .arg(source_dir)
        .arg(dest_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .status()
        .await
        .map_err(|e| TargetServerError::GitMirror {
            path: source_dir.display().to_string(),
            source: e,
        })?;

    if !status.success() {
        return Err(TargetServerError::GitExitStatus(status.code().unwrap_or(-1)));
    }

    Ok(dest_dir.to_path_buf())
}

/// Bind a listener on `bind_addr` and spawn an accept loop that serves
/// `repo_path` (a bare repository) to each connection via
/// `git upload-pack --strict`.
pub async fn spawn_server(
    bind_addr: &str,
    repo_path: PathBuf,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), TargetServerError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| TargetServerError::Bind(bind_addr.to_string(), e))?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "git target server accept failed");
                    continue;
                }
            };
            let repo_path = repo_path.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_one(socket, &repo_path).await {
                    tracing::debug!(peer = %peer, error = %e, "git upload-pack session ended");
                }
            });
        }
    });

    Ok((local_addr, handle))
}

async fn serve_one(
    mut socket: tokio::net::TcpStream,
    repo_path: &Path,
) -> Result<(), TargetServerError> {
    let mut child = Command::new("git")
        .arg("upload-pack")
        .arg("--strict")
        .arg(repo_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut child_stdin = child.stdin.take().expect("piped stdin");
    let mut child_stdout = child.stdout.take().expect("piped stdout");
    let (mut sock_read, mut sock_write) = socket.split();

    let to_child = tokio::io::copy(&mut sock_read, &mut child_stdin);
    let from_child = tokio::io::copy(&mut child_stdout, &mut sock_write);

    let _ = tokio::try_join!(to_child, from_child);
    let _ = child.wait().await;
    sock_write.shutdown().await.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mirror_fails_loudly_for_nonexistent_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("does-not-exist");
        let dest = dir.path().join("mirror.git");
        let err = mirror(&source, &dest).await.unwrap_err();
        assert!(matches!(
            err,
            TargetServerError::GitExitStatus(_) | TargetServerError::GitMirror { .. }
        ));
    }
}
