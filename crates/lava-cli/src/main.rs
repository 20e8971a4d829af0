//! Lava - containerized vulnerability-assessment scan orchestrator
//!
//! A thin front-end over [`lava_agent::Engine`]: parses CLI flags, builds
//! either a config-file-driven run or an ad-hoc single-job run, renders
//! the evaluated report, and maps the result onto a process exit code.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lava_core::{
    AgentConfig, AssetType, Config, Job, LogLevel, PullPolicy, RegistryAuth, ReportConfig,
    ReportFormat, Severity,
};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lava")]
#[command(author = "Lava Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Containerized vulnerability-assessment scanner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan, either from a config file or ad-hoc against one target
    Run {
        /// Path to the scan configuration file (config-file mode)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Checktype image (ad-hoc mode, positional 1)
        checktype: Option<String>,

        /// Target identifier (ad-hoc mode, positional 2)
        target: Option<String>,

        /// Target asset type (ad-hoc mode)
        #[arg(long = "type")]
        asset_type: Option<String>,

        /// Per-check timeout in seconds (ad-hoc mode)
        #[arg(long, default_value_t = 600)]
        timeout: u64,

        /// Check option as `key=value` (ad-hoc mode, repeatable)
        #[arg(long = "opt")]
        opt: Vec<String>,

        /// JSON file of check options, merged before `--opt` (ad-hoc mode)
        #[arg(long)]
        optfile: Option<PathBuf>,

        /// Environment variable as `NAME=value`, or bare `NAME` to read
        /// from the process environment (repeatable)
        #[arg(long = "var")]
        var: Vec<String>,

        /// Container pull policy
        #[arg(long)]
        pull: Option<String>,

        /// Registry server for `--user` credentials (ad-hoc mode)
        #[arg(long)]
        registry: Option<String>,

        /// Registry credentials as `USER[:[PASS]]`; omitting `:PASS` reads
        /// the password from stdin
        #[arg(long)]
        user: Option<String>,

        /// Minimum severity that affects the exit code
        #[arg(long)]
        severity: Option<String>,

        /// Report output path (defaults to stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Report format: human|json
        #[arg(long = "fmt")]
        format: Option<String>,

        /// Metrics sink output path
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Log level: debug|info|warn|error
        #[arg(long)]
        log: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("lava: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<i32> {
    let wall_start = chrono::Utc::now();
    let started_at = std::time::Instant::now();
    let cli = Cli::parse();
    let Commands::Run {
        config,
        checktype,
        target,
        asset_type,
        timeout,
        opt,
        optfile,
        var,
        pull,
        registry,
        user,
        severity,
        output,
        format,
        metrics,
        log,
    } = cli.command;

    init_tracing(log.as_deref())?;

    let engine = lava_agent::Engine::new();
    let run_result = if let (Some(checktype), Some(target)) = (&checktype, &target) {
        run_ad_hoc(
            &engine,
            checktype,
            target,
            asset_type.as_deref(),
            timeout,
            &opt,
            optfile.as_deref(),
            &var,
            pull.as_deref(),
            registry.as_deref(),
            user.as_deref(),
            severity.as_deref(),
            output.clone(),
            format.as_deref(),
            metrics.clone(),
        )
        .await?
    } else {
        run_from_config(&engine, config.as_deref()).await?
    };

    lava_agent::engine::log_status_counts(&run_result.reports);

    let today = chrono::Utc::now().date_naive();
    let result = lava_report::evaluate(&run_result.reports, &run_result.config.report_config, today)
        .context("failed to evaluate report")?;

    let rendered = match run_result.config.report_config.format.unwrap_or_default() {
        ReportFormat::Json => lava_report::render_json(&result).context("failed to render JSON report")?,
        ReportFormat::Human => lava_report::render_human(&result),
    };
    let output_path = run_result
        .config
        .report_config
        .output_file
        .as_ref()
        .map(PathBuf::from);
    lava_report::write_output(&rendered, output_path.as_deref())
        .context("failed to write report output")?;

    if let Some(metrics_path) = &run_result.config.report_config.metrics_file {
        write_metrics(
            &result,
            &run_result.config,
            metrics_path,
            wall_start,
            started_at.elapsed().as_secs_f64(),
        )?;
    }

    Ok(result.exit_code)
}

fn init_tracing(log: Option<&str>) -> Result<()> {
    let level = log
        .map(parse_log_level)
        .transpose()?
        .unwrap_or_default()
        .as_filter_str();
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn parse_log_level(raw: &str) -> Result<LogLevel> {
    match raw.to_lowercase().as_str() {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => bail!("invalid log level {other:?}"),
    }
}

/// Resolve the config path (default `lava.yaml`), `chdir` into its parent
/// directory so that relative `includes`/catalog URLs resolve against it,
/// then hand the bare file name to the engine.
async fn run_from_config(
    engine: &lava_agent::Engine,
    config_path: Option<&Path>,
) -> Result<lava_agent::EngineRun> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("lava.yaml"));
    let absolute = std::fs::canonicalize(&path)
        .with_context(|| format!("config file not found: {}", path.display()))?;
    let dir = absolute
        .parent()
        .ok_or_else(|| anyhow::anyhow!("config path {} has no parent directory", path.display()))?;
    let file_name = absolute
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("config path {} has no file name", path.display()))?;
    std::env::set_current_dir(dir)
        .with_context(|| format!("failed to chdir to {}", dir.display()))?;

    info!(config = %absolute.display(), "running from config file");
    engine
        .run(file_name.to_string_lossy().as_ref())
        .await
        .context("scan engine failed")
}

#[allow(clippy::too_many_arguments)]
async fn run_ad_hoc(
    engine: &lava_agent::Engine,
    checktype: &str,
    target: &str,
    asset_type: Option<&str>,
    timeout: u64,
    opt: &[String],
    optfile: Option<&Path>,
    var: &[String],
    pull: Option<&str>,
    registry: Option<&str>,
    user: Option<&str>,
    severity: Option<&str>,
    output: Option<PathBuf>,
    format: Option<&str>,
    metrics: Option<PathBuf>,
) -> Result<lava_agent::EngineRun> {
    let asset_type = asset_type.unwrap_or("DomainName");
    let asset_type = AssetType::parse(asset_type)
        .ok_or_else(|| anyhow::anyhow!("unknown asset type {asset_type:?}"))?;

    let mut options = serde_json::Map::new();
    if let Some(path) = optfile {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let from_file: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&text).context("optfile is not a JSON object")?;
        options.extend(from_file);
    }
    for entry in opt {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--opt {entry:?} is not in key=value form"))?;
        let parsed = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        options.insert(key.to_string(), parsed);
    }
    let options_json = serde_json::Value::Object(options).to_string();

    let job = Job {
        check_id: Uuid::new_v4(),
        checktype_name: checktype.to_string(),
        image: checktype.to_string(),
        target_identifier: target.to_string(),
        asset_type,
        timeout_seconds: timeout,
        options_json,
        required_vars: vec![],
    };

    let mut vars = std::collections::HashMap::new();
    for entry in var {
        match entry.split_once('=') {
            Some((name, value)) => {
                vars.insert(name.to_string(), value.to_string());
            }
            None => {
                let value = std::env::var(entry)
                    .with_context(|| format!("--var {entry:?} has no value and isn't set in the environment"))?;
                vars.insert(entry.clone(), value);
            }
        }
    }

    let mut registry_auths = Vec::new();
    if let Some(user) = user {
        let (username, password) = match user.split_once(':') {
            Some((username, "")) => (username.to_string(), read_password_from_stdin()?),
            Some((username, password)) => (username.to_string(), password.to_string()),
            None => (user.to_string(), read_password_from_stdin()?),
        };
        registry_auths.push(RegistryAuth {
            server: registry.unwrap_or_default().to_string(),
            username,
            password,
        });
    }

    let agent_config = AgentConfig {
        pull_policy: pull.map(PullPolicy::parse).transpose()?,
        parallel: None,
        vars,
        registry_auths,
    };
    let report_config = ReportConfig {
        severity: severity.map(Severity::parse).transpose()?,
        show_severity: None,
        format: format.map(ReportFormat::parse).transpose()?,
        output_file: output.map(|p| p.to_string_lossy().into_owned()),
        exclusions: vec![],
        error_on_stale_exclusions: None,
        metrics_file: metrics.map(|p| p.to_string_lossy().into_owned()),
    };
    let config = Config {
        lava_version: None,
        includes: vec![],
        checktype_urls: vec![],
        targets: vec![],
        agent_config,
        report_config,
        log_level: None,
    };

    engine
        .run_with_jobs(config, vec![job])
        .await
        .context("scan engine failed")
}

fn read_password_from_stdin() -> Result<String> {
    print!("Registry password: ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

fn write_metrics(
    result: &lava_report::ReportResult,
    config: &Config,
    metrics_path: &str,
    start_time: chrono::DateTime<chrono::Utc>,
    duration_seconds: f64,
) -> Result<()> {
    let vulnerability_count = result.entries.iter().filter(|e| !e.excluded).count();
    let snapshot = lava_report::MetricsSnapshot {
        start_time,
        lava_version: config.lava_version.clone().unwrap_or_default(),
        targets: config.targets.len(),
        severity: config.report_config.effective_severity().to_string(),
        checktypes: config.checktype_urls.len(),
        exit_code: result.exit_code,
        duration_seconds,
        excluded_vulnerability_count: result.excluded_count,
        vulnerability_count,
    };
    lava_report::write_atomically(&snapshot, Path::new(metrics_path))
        .context("failed to write metrics sink")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_str_rejects_unknown() {
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn log_level_from_str_is_case_insensitive() {
        assert!(matches!(parse_log_level("DEBUG").unwrap(), LogLevel::Debug));
    }
}
