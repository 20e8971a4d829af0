//! The agent driver (C8): dispatches jobs as containers with bounded
//! concurrency, applies the pre-run target/env hooks, and feeds finished
//! reports into the [`ReportStore`].

use std::sync::Arc;
use std::time::Duration;

use lava_core::{AssetType, Job, PullPolicy, Target};
use lava_core::metrics::METRICS;
use lava_core::CheckStatus;
use lava_runtime::Runtime;
use lava_targetserver::TargetServer;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::container::{self, ContainerOutcome, ContainerSpec};
use crate::error::AgentError;
use crate::report_store::ReportStore;

/// Static env vars and pull/registry configuration handed to every
/// container, independent of the individual job.
#[derive(Clone, Default)]
pub struct AgentSettings {
    pub parallel: u32,
    pub pull_policy: PullPolicy,
    pub vars: std::collections::HashMap<String, String>,
}

impl AgentSettings {
    pub fn from_config(config: &lava_core::AgentConfig) -> AgentSettings {
        AgentSettings {
            parallel: config.effective_parallel(),
            pull_policy: config.effective_pull_policy(),
            vars: config.vars.clone(),
        }
    }
}

/// Runs jobs against the container runtime, tracking progress in a
/// [`ReportStore`] and rewriting unreachable targets via a [`TargetServer`].
pub struct Agent {
    runtime: Arc<Runtime>,
    target_server: Arc<TargetServer>,
    report_store: ReportStore,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(
        runtime: Arc<Runtime>,
        target_server: Arc<TargetServer>,
        report_store: ReportStore,
        settings: AgentSettings,
    ) -> Agent {
        Agent {
            runtime,
            target_server,
            report_store,
            settings,
        }
    }

    /// Run every job to completion, bounded by `settings.parallel`
    /// concurrent containers, emitting a summary log line every 15
    /// seconds until the last job finishes.
    pub async fn run(&self, jobs: Vec<Job>) -> Result<(), AgentError> {
        let semaphore = Arc::new(Semaphore::new(self.settings.parallel as usize));
        let report_store = self.report_store.clone();
        let ticker = tokio::spawn(summary_ticker(report_store));

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore open");
            let runtime = self.runtime.clone();
            let target_server = self.target_server.clone();
            let report_store = self.report_store.clone();
            let settings = self.settings.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                run_one_job(&runtime, &target_server, &report_store, &settings, job).await
            }));
        }

        let mut first_err = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "check job failed");
                    first_err.get_or_insert(e);
                }
                Err(join_err) => warn!(error = %join_err, "check task panicked"),
            }
        }

        ticker.abort();
        METRICS.flush();
        if let Some(err) = first_err {
            return Err(err);
        }
        Ok(())
    }
}

async fn summary_ticker(report_store: ReportStore) {
    let mut interval = tokio::time::interval(Duration::from_secs(15));
    loop {
        interval.tick().await;
        for line in report_store.summary().await {
            info!("{line}");
        }
    }
}

async fn run_one_job(
    runtime: &Runtime,
    target_server: &TargetServer,
    report_store: &ReportStore,
    settings: &AgentSettings,
    job: Job,
) -> Result<(), AgentError> {
    report_store
        .start(job.check_id, &job.checktype_name, &job.target_identifier)
        .await;
    METRICS.inc_checks_dispatched();

    let target = Target::new(job.target_identifier.clone(), job.asset_type);
    let target_map = target_server.handle(job.check_id, &target).await?;
    if let Some(target_map) = &target_map {
        report_store.record_target_map(target_map.clone()).await;
    }

    let spec = build_container_spec(runtime, settings, &job, target_map.as_ref());

    let outcome = container::run_container(&runtime.docker, spec).await?;
    match outcome {
        ContainerOutcome::TimedOut => {
            report_store
                .mark_status(job.check_id, CheckStatus::Failed)
                .await;
            METRICS.inc_checks_failed();
        }
        ContainerOutcome::Exited { exit_code, logs } => {
            if let Some(line) = container::last_json_line(&logs) {
                if let Err(e) = report_store
                    .upload(job.check_id, "reports", line.as_bytes())
                    .await
                {
                    warn!(check_id = %job.check_id, error = %e, "could not parse check report");
                    report_store
                        .mark_status(job.check_id, CheckStatus::Inconclusive)
                        .await;
                    METRICS.inc_checks_failed();
                } else {
                    METRICS.inc_checks_finished();
                }
            } else if exit_code == 0 {
                report_store
                    .mark_status(job.check_id, CheckStatus::Finished)
                    .await;
                METRICS.inc_checks_finished();
            } else {
                report_store
                    .mark_status(job.check_id, CheckStatus::Failed)
                    .await;
                METRICS.inc_checks_failed();
            }
        }
    }

    Ok(())
}

/// Build the container spec for one job, applying the pre-run hook in the
/// order described for the agent driver: extra hosts, private-IP
/// allowance, Docker-image specific reachability skip and socket mount,
/// then the rewritten target/asset-type env vars if the target server
/// produced a [`lava_core::TargetMap`].
fn build_container_spec(
    runtime: &Runtime,
    settings: &AgentSettings,
    job: &Job,
    target_map: Option<&lava_core::TargetMap>,
) -> ContainerSpec {
    let mut env: Vec<String> = settings
        .vars
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    container::set_env(&mut env, "CHECK_TARGET", &job.target_identifier);
    container::set_env(&mut env, "CHECK_ASSET_TYPE", job.asset_type.as_str());
    container::set_env(&mut env, "CHECK_OPTIONS", &job.options_json);
    for required in &job.required_vars {
        if !settings.vars.contains_key(required) {
            warn!(var = %required, checktype = %job.checktype_name, "required var not set");
        }
    }
    container::set_env(&mut env, "VULCAN_ALLOW_PRIVATE_IPS", "true");

    let mut extra_hosts = Vec::new();
    let mapping = runtime.host_gateway_mapping();
    if !mapping.is_empty() {
        extra_hosts.push(mapping);
    }

    let mut binds = Vec::new();
    if job.asset_type == AssetType::DockerImage {
        container::set_env(&mut env, "VULCAN_SKIP_REACHABILITY", "true");
        if let Some(socket) = local_docker_socket() {
            binds.push(format!("{socket}:/var/run/docker.sock"));
        }
    }

    if let Some(target_map) = target_map {
        container::set_env(&mut env, "VULCAN_CHECK_TARGET", &target_map.new_identifier);
        container::set_env(
            &mut env,
            "VULCAN_CHECK_ASSET_TYPE",
            target_map.new_asset_type.as_str(),
        );
    }

    ContainerSpec {
        name: format!("lava-check-{}", job.check_id),
        image: job.image.clone(),
        env,
        extra_hosts,
        binds,
        timeout_seconds: job.timeout_seconds,
    }
}

/// The host path to bind-mount into a `DockerImage` check's container, if
/// the daemon is reachable over a local Unix socket.
fn local_docker_socket() -> Option<String> {
    match std::env::var("DOCKER_HOST") {
        Ok(host) if host.starts_with("unix://") => {
            Some(host.trim_start_matches("unix://").to_string())
        }
        Ok(_) => None,
        Err(_) => Some("/var/run/docker.sock".to_string()),
    }
}
