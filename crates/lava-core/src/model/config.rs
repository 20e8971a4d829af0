//! Scan configuration: the root YAML document and its nested sections.

use serde::{Deserialize, Serialize};

use super::exclusion::Exclusion;
use super::severity::Severity;
use super::target::Target;
use crate::error::ConfigError;

/// Container image pull policy, as understood by the agent driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl PullPolicy {
    pub fn parse(raw: &str) -> Result<PullPolicy, ConfigError> {
        match raw {
            "Always" => Ok(PullPolicy::Always),
            "IfNotPresent" => Ok(PullPolicy::IfNotPresent),
            "Never" => Ok(PullPolicy::Never),
            other => Err(ConfigError::InvalidPullPolicy(other.to_string())),
        }
    }
}

impl Default for PullPolicy {
    fn default() -> Self {
        PullPolicy::IfNotPresent
    }
}

/// Report rendering format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Human,
    Json,
}

impl Default for ReportFormat {
    fn default() -> Self {
        ReportFormat::Human
    }
}

impl ReportFormat {
    pub fn parse(raw: &str) -> Result<ReportFormat, ConfigError> {
        match raw {
            "human" => Ok(ReportFormat::Human),
            "json" => Ok(ReportFormat::Json),
            other => Err(ConfigError::InvalidFormat(other.to_string())),
        }
    }
}

/// `tracing`-compatible log verbosity, as set by the `log` config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// `{server, username, password}` credentials for one container registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryAuth {
    pub server: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Agent-facing run parameters: concurrency, pull behavior, env vars for
/// checks, and registry credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(rename = "pullPolicy", default)]
    pub pull_policy: Option<PullPolicy>,

    #[serde(default)]
    pub parallel: Option<u32>,

    #[serde(default)]
    pub vars: std::collections::HashMap<String, String>,

    #[serde(rename = "registries", default)]
    pub registry_auths: Vec<RegistryAuth>,
}

impl AgentConfig {
    /// `parallel`, defaulted to 1 and floored at 1.
    pub fn effective_parallel(&self) -> u32 {
        self.parallel.unwrap_or(1).max(1)
    }

    pub fn effective_pull_policy(&self) -> PullPolicy {
        self.pull_policy.unwrap_or_default()
    }

    fn merge(self, more_recent: AgentConfig) -> AgentConfig {
        let mut vars = self.vars;
        vars.extend(more_recent.vars);
        let mut registry_auths = self.registry_auths;
        registry_auths.extend(more_recent.registry_auths);
        AgentConfig {
            pull_policy: more_recent.pull_policy.or(self.pull_policy),
            parallel: more_recent.parallel.or(self.parallel),
            vars,
            registry_auths,
        }
    }
}

/// Report filtering, rendering, and exclusion configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub severity: Option<Severity>,

    #[serde(rename = "show", default)]
    pub show_severity: Option<Severity>,

    #[serde(default)]
    pub format: Option<ReportFormat>,

    #[serde(rename = "output", default)]
    pub output_file: Option<String>,

    #[serde(default)]
    pub exclusions: Vec<Exclusion>,

    #[serde(rename = "errorOnStaleExclusions", default)]
    pub error_on_stale_exclusions: Option<bool>,

    #[serde(rename = "metrics", default)]
    pub metrics_file: Option<String>,
}

impl ReportConfig {
    pub fn effective_severity(&self) -> Severity {
        self.severity.unwrap_or(Severity::High)
    }

    /// Defaults to `severity` when unset, per the data model.
    pub fn effective_show_severity(&self) -> Severity {
        self.show_severity.unwrap_or_else(|| self.effective_severity())
    }

    fn merge(self, more_recent: ReportConfig) -> ReportConfig {
        let mut exclusions = self.exclusions;
        exclusions.extend(more_recent.exclusions);
        ReportConfig {
            severity: more_recent.severity.or(self.severity),
            show_severity: more_recent.show_severity.or(self.show_severity),
            format: more_recent.format.or(self.format),
            output_file: more_recent.output_file.or(self.output_file),
            exclusions,
            error_on_stale_exclusions: more_recent
                .error_on_stale_exclusions
                .or(self.error_on_stale_exclusions),
            metrics_file: more_recent.metrics_file.or(self.metrics_file),
        }
    }
}

/// A single scan configuration document, as parsed from YAML — before (or
/// after) merging against its [`crate::graph::ConfigGraph`] ancestry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "lava", default)]
    pub lava_version: Option<String>,

    #[serde(default)]
    pub includes: Vec<String>,

    #[serde(rename = "checktypes", default)]
    pub checktype_urls: Vec<String>,

    #[serde(default)]
    pub targets: Vec<Target>,

    #[serde(rename = "agent", default)]
    pub agent_config: AgentConfig,

    #[serde(rename = "report", default)]
    pub report_config: ReportConfig,

    #[serde(rename = "log", default)]
    pub log_level: Option<LogLevel>,
}

impl Config {
    /// Parse, after `${NAME}` environment expansion, from raw YAML text.
    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(v) = &self.lava_version {
            semver::Version::parse(v.trim_start_matches('v'))
                .map_err(|e| ConfigError::InvalidVersion(v.clone(), e))?;
        }
        for (index, target) in self.targets.iter().enumerate() {
            target.validate(index)?;
        }
        Ok(())
    }

    /// Merge `self` (a child, already-resolved result) with `more_recent`
    /// (the including parent, applied on top) per the config-graph merge
    /// semantics: scalars from the more recent config win when set;
    /// ordered-list fields are concatenated with the more recent config's
    /// entries appended last.
    pub fn merge(self, more_recent: Config) -> Config {
        let mut includes = self.includes;
        includes.extend(more_recent.includes);
        let mut checktype_urls = self.checktype_urls;
        checktype_urls.extend(more_recent.checktype_urls);
        let mut targets = self.targets;
        targets.extend(more_recent.targets);

        Config {
            lava_version: more_recent.lava_version.or(self.lava_version),
            includes,
            checktype_urls,
            targets,
            agent_config: self.agent_config.merge(more_recent.agent_config),
            report_config: self.report_config.merge(more_recent.report_config),
            log_level: more_recent.log_level.or(self.log_level),
        }
    }

    /// Invariant: a resolved (root) config must carry at least one catalog
    /// URL and at least one target.
    pub fn validate_resolved(&self) -> Result<(), ConfigError> {
        if self.checktype_urls.is_empty() {
            return Err(ConfigError::MissingCatalogUrls);
        }
        if self.targets.is_empty() {
            return Err(ConfigError::MissingTargets);
        }
        Ok(())
    }
}

/// Replace every `${NAME}` in `text` with the value of the process
/// environment variable `NAME`; unresolved variables become the empty
/// string.
pub fn expand_env(text: &str) -> String {
    crate::env_expand::expand(text, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::asset_type::AssetType;

    #[test]
    fn parses_minimal_yaml() {
        let yaml = "lava: \"v1.0.0\"\ntargets:\n  - identifier: example.com\n    type: DomainName\n";
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.lava_version.as_deref(), Some("v1.0.0"));
        assert_eq!(config.targets.len(), 1);
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let yaml = "bogus: true\n";
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn rejects_invalid_version() {
        let yaml = "lava: \"not-a-version\"\n";
        assert!(matches!(
            Config::parse(yaml),
            Err(ConfigError::InvalidVersion(..))
        ));
    }

    #[test]
    fn merge_scalars_more_recent_wins() {
        let child = Config {
            report_config: ReportConfig {
                severity: Some(Severity::Medium),
                ..Default::default()
            },
            ..Default::default()
        };
        let parent = Config {
            report_config: ReportConfig {
                severity: Some(Severity::Critical),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = child.merge(parent);
        assert_eq!(merged.report_config.severity, Some(Severity::Critical));
    }

    #[test]
    fn merge_unset_scalar_does_not_override() {
        let child = Config {
            report_config: ReportConfig {
                severity: Some(Severity::Medium),
                ..Default::default()
            },
            ..Default::default()
        };
        let parent = Config::default();
        let merged = child.merge(parent);
        assert_eq!(merged.report_config.severity, Some(Severity::Medium));
    }

    #[test]
    fn merge_concatenates_ordered_lists() {
        let child = Config {
            checktype_urls: vec!["b".into()],
            ..Default::default()
        };
        let parent = Config {
            checktype_urls: vec!["a".into()],
            ..Default::default()
        };
        let merged = child.merge(parent);
        assert_eq!(merged.checktype_urls, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn merge_vars_later_wins_on_collision() {
        let mut child_vars = std::collections::HashMap::new();
        child_vars.insert("NAME".to_string(), "child".to_string());
        let child = Config {
            agent_config: AgentConfig {
                vars: child_vars,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut parent_vars = std::collections::HashMap::new();
        parent_vars.insert("NAME".to_string(), "parent".to_string());
        let parent = Config {
            agent_config: AgentConfig {
                vars: parent_vars,
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = child.merge(parent);
        assert_eq!(merged.agent_config.vars.get("NAME").unwrap(), "parent");
    }

    #[test]
    fn show_severity_defaults_to_severity() {
        let rc = ReportConfig {
            severity: Some(Severity::Low),
            ..Default::default()
        };
        assert_eq!(rc.effective_show_severity(), Severity::Low);
    }

    #[test]
    fn validate_resolved_requires_catalog_and_targets() {
        let config = Config::default();
        assert!(matches!(
            config.validate_resolved(),
            Err(ConfigError::MissingCatalogUrls)
        ));
        let config = Config {
            checktype_urls: vec!["u".into()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate_resolved(),
            Err(ConfigError::MissingTargets)
        ));
        let config = Config {
            checktype_urls: vec!["u".into()],
            targets: vec![Target::new("x", AssetType::IP)],
            ..Default::default()
        };
        assert!(config.validate_resolved().is_ok());
    }

    #[test]
    fn expand_env_substitutes_and_blanks_unresolved() {
        std::env::set_var("LAVA_TEST_VAR_CONFIG", "sub");
        let out = expand_env("a${LAVA_TEST_VAR_CONFIG}b${LAVA_TEST_MISSING}c");
        assert_eq!(out, "asubbc");
    }
}
