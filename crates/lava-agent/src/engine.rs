//! The engine facade (C9): orchestrates config resolution, catalog
//! loading, matrix expansion, runtime/target-server setup, the agent run,
//! and the identifier-rewrite undo, handing a finished map of
//! [`CheckReport`]s to whatever report writer the caller chooses.

use std::collections::HashMap;
use std::sync::Arc;

use lava_core::{AssetType, CheckReport, CheckStatus, Config, ConfigGraph, Job};
use lava_fetch::Fetcher;
use lava_runtime::Runtime;
use lava_targetserver::TargetServer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentSettings};
use crate::error::EngineError;
use crate::report_store::ReportStore;

/// The result of one full engine run: every check's final report, keyed
/// by `check_id`, plus the resolved config that produced them (the report
/// writer needs its `report` section to apply severity filtering and
/// exclusions).
pub struct EngineRun {
    pub config: Config,
    pub reports: HashMap<Uuid, CheckReport>,
}

/// Ties together config resolution, catalog loading, matrix expansion,
/// and the agent run.
pub struct Engine {
    fetcher: Fetcher,
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            fetcher: Fetcher::new(),
        }
    }

    /// Resolve `root_config_url` through its include graph, load the
    /// resulting catalog, expand the matrix, connect to the container
    /// runtime, start the target server, run the agent, and undo every
    /// identifier rewrite in the collected reports.
    pub async fn run(&self, root_config_url: &str) -> Result<EngineRun, EngineError> {
        let graph = ConfigGraph::load(&self.fetcher, root_config_url).await?;
        let config = graph.resolve()?;

        let catalog = lava_core::Catalog::load(&self.fetcher, &config.checktype_urls).await?;
        let jobs = lava_core::matcher::expand_to_jobs(&config.targets, &catalog)?;
        info!(jobs = jobs.len(), "expanded check matrix");

        self.run_jobs(config, jobs).await
    }

    /// Run a caller-supplied, already-expanded job list against
    /// `config.agent_config`/`config.report_config` — the ad-hoc CLI mode's
    /// entry point, which has no catalog or target matrix to expand.
    pub async fn run_with_jobs(
        &self,
        config: Config,
        jobs: Vec<Job>,
    ) -> Result<EngineRun, EngineError> {
        self.run_jobs(config, jobs).await
    }

    async fn run_jobs(&self, config: Config, jobs: Vec<Job>) -> Result<EngineRun, EngineError> {
        check_reachability(&jobs).await?;

        let runtime = Arc::new(Runtime::connect().map_err(crate::error::AgentError::from)?);
        let target_server = Arc::new(
            TargetServer::new(&runtime)
                .await
                .map_err(crate::error::AgentError::from)?,
        );
        let report_store = ReportStore::new();

        let settings = AgentSettings::from_config(&config.agent_config);
        let agent = Agent::new(
            runtime.clone(),
            target_server.clone(),
            report_store.clone(),
            settings,
        );

        let run_result = agent.run(jobs).await;
        target_server.close().await;
        run_result.map_err(EngineError::Agent)?;

        let reports = report_store.reports().await;
        Ok(EngineRun { config, reports })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

/// Pre-flight reachability probe: dial every job's target that resolves to
/// a host/port before any container starts. `Path`/`GitRepository` are
/// skipped (local-vs-remote is ambiguous for them, per the target server's
/// own handling), as are asset types the target server never rewrites
/// (`DockerImage`, `AWSAccount`, `IPRange`) since they aren't TCP-dialable
/// targets. A target whose identifier carries no determinable port is the
/// probe's `ErrUnsupported` case and is silently skipped rather than
/// failing the run.
async fn check_reachability(jobs: &[Job]) -> Result<(), EngineError> {
    for job in jobs {
        if !matches!(
            job.asset_type,
            AssetType::IP | AssetType::Hostname | AssetType::WebAddress | AssetType::DomainName
        ) {
            continue;
        }

        let (host, port) = lava_targetserver::addr::get_target_addr(&job.target_identifier);
        let Some(port) = port else {
            continue;
        };

        tokio::net::TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|source| EngineError::UnreachableTarget {
                identifier: job.target_identifier.clone(),
                reason: source.to_string(),
            })?;
    }
    Ok(())
}

/// Apply the summary-log-friendly overview of a finished run: one line per
/// terminal status count. Used by the CLI before handing reports to the
/// report writer.
pub fn log_status_counts(reports: &HashMap<Uuid, CheckReport>) {
    let mut counts: HashMap<CheckStatus, usize> = HashMap::new();
    for report in reports.values() {
        *counts.entry(report.status).or_default() += 1;
    }
    for (status, count) in counts {
        info!(?status, count, "checks finished");
    }
    if reports.is_empty() {
        warn!("engine run produced no reports");
    }
}
