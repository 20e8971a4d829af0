//! Low-level container lifecycle: create, start, wait (with timeout), and
//! tear down a single check container via the Docker Engine API.

use std::time::Duration;

use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, LogsOptions, RemoveContainerOptions,
    StopContainerOptions, WaitContainerOptions,
};
use bollard::Docker;
use futures::StreamExt;

use crate::error::AgentError;

/// Parameters for one check container run, already resolved by the
/// pre-run hook (extra hosts added, env vars finalized).
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<String>,
    pub extra_hosts: Vec<String>,
    pub binds: Vec<String>,
    pub timeout_seconds: u64,
}

/// Outcome of running a container to completion (or to timeout).
pub enum ContainerOutcome {
    Exited { exit_code: i64, logs: String },
    TimedOut,
}

/// Create, start, and wait for one check container, removing it
/// afterwards regardless of outcome.
pub async fn run_container(
    docker: &Docker,
    spec: ContainerSpec,
) -> Result<ContainerOutcome, AgentError> {
    let host_config = bollard::models::HostConfig {
        extra_hosts: Some(spec.extra_hosts),
        binds: Some(spec.binds),
        ..Default::default()
    };

    let config = ContainerConfig {
        image: Some(spec.image),
        env: Some(spec.env),
        host_config: Some(host_config),
        ..Default::default()
    };

    let options = CreateContainerOptions {
        name: spec.name.clone(),
        platform: None,
    };
    docker.create_container(Some(options), config).await?;
    docker.start_container::<String>(&spec.name, None).await?;

    let wait = wait_for_container(docker, &spec.name, spec.timeout_seconds);
    let outcome = match wait.await {
        Ok(exit_code) => {
            let logs = collect_logs(docker, &spec.name).await.unwrap_or_default();
            ContainerOutcome::Exited { exit_code, logs }
        }
        Err(TimedOut) => {
            let _ = docker
                .stop_container(&spec.name, Some(StopContainerOptions { t: 5 }))
                .await;
            ContainerOutcome::TimedOut
        }
    };

    let _ = docker
        .remove_container(
            &spec.name,
            Some(RemoveContainerOptions {
                force: true,
                ..Default::default()
            }),
        )
        .await;

    Ok(outcome)
}

struct TimedOut;

async fn wait_for_container(
    docker: &Docker,
    name: &str,
    timeout_seconds: u64,
) -> Result<i64, TimedOut> {
    let mut stream = docker.wait_container(name, None::<WaitContainerOptions<String>>);
    let fut = async {
        match stream.next().await {
            Some(Ok(response)) => response.status_code,
            _ => -1,
        }
    };
    match tokio::time::timeout(Duration::from_secs(timeout_seconds.max(1)), fut).await {
        Ok(code) => Ok(code),
        Err(_) => Err(TimedOut),
    }
}

async fn collect_logs(docker: &Docker, name: &str) -> Result<String, AgentError> {
    let options = LogsOptions::<String> {
        stdout: true,
        stderr: false,
        ..Default::default()
    };
    let mut stream = docker.logs(name, Some(options));
    let mut out = String::new();
    while let Some(chunk) = stream.next().await {
        if let Ok(log) = chunk {
            out.push_str(&log.to_string());
        }
    }
    Ok(out)
}

/// Set `KEY=value` in `env`, replacing an existing `KEY=...` entry in
/// place, appending otherwise.
pub fn set_env(env: &mut Vec<String>, key: &str, value: &str) {
    let prefix = format!("{key}=");
    if let Some(existing) = env.iter_mut().find(|e| e.starts_with(&prefix)) {
        *existing = format!("{key}={value}");
    } else {
        env.push(format!("{key}={value}"));
    }
}

/// The last non-empty JSON-object line of `logs` — the convention checks
/// use to emit their final report to stdout.
pub fn last_json_line(logs: &str) -> Option<&str> {
    logs.lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{') && line.ends_with('}'))
}
