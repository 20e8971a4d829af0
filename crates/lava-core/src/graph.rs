//! Config graph: a DAG of included configuration documents, and the
//! depth-first merge that resolves it into one effective [`Config`].

use std::collections::HashMap;

use lava_fetch::Fetcher;

use crate::error::GraphError;
use crate::model::config::expand_env;
use crate::model::Config;

/// A loaded, not-yet-resolved set of configuration documents reachable from
/// a root URL via `includes`.
///
/// Vertices are config URLs; edges point from an including config to each
/// included URL, in the file order they were declared.
#[derive(Debug, Clone)]
pub struct ConfigGraph {
    root: String,
    configs: HashMap<String, Config>,
}

impl ConfigGraph {
    /// Fetch, parse, and validate every config reachable from `root_url`,
    /// failing on the first cycle, fetch error, or invalid document.
    pub async fn load(fetcher: &Fetcher, root_url: &str) -> Result<ConfigGraph, GraphError> {
        let mut configs = HashMap::new();
        let mut path = Vec::new();
        load_node(fetcher, root_url, &mut configs, &mut path).await?;
        Ok(ConfigGraph {
            root: root_url.to_string(),
            configs,
        })
    }

    /// Depth-first merge from the root into one effective [`Config`].
    ///
    /// The same URL reached via more than one path is re-merged
    /// independently along each path — this is intentional: it makes
    /// include order compose predictably rather than collapsing shared
    /// includes to a single instance.
    pub fn resolve(&self) -> Result<Config, GraphError> {
        let resolved = self.resolve_node(&self.root)?;
        resolved
            .validate_resolved()
            .map_err(|source| GraphError::InvalidConfig {
                url: self.root.clone(),
                source,
            })?;
        Ok(resolved)
    }

    fn resolve_node(&self, url: &str) -> Result<Config, GraphError> {
        let cfg = self
            .configs
            .get(url)
            .ok_or_else(|| GraphError::UnknownVertex(url.to_string()))?
            .clone();

        // Children are merged in reverse file order so that, after the
        // node's own config is merged in last, the final ordered-list
        // fields read "last include first" (see model::config::Config
        // merge tests and the include-order scenario in the top-level
        // test below).
        let mut acc = Config::default();
        for child in cfg.includes.iter().rev() {
            let child_resolved = self.resolve_node(child)?;
            acc = acc.merge(child_resolved);
        }

        let mut own = cfg;
        own.includes.clear();
        Ok(acc.merge(own))
    }
}

fn load_node<'a>(
    fetcher: &'a Fetcher,
    url: &'a str,
    configs: &'a mut HashMap<String, Config>,
    path: &'a mut Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), GraphError>> + 'a>> {
    Box::pin(async move {
        if configs.contains_key(url) {
            return Ok(());
        }
        if path.iter().any(|ancestor| ancestor == url) {
            let mut cycle = path.clone();
            cycle.push(url.to_string());
            return Err(GraphError::Cycle(cycle.join(" -> ")));
        }

        let bytes = fetcher
            .fetch(url)
            .await
            .map_err(|source| GraphError::Fetch {
                url: url.to_string(),
                source,
            })?;
        let text = String::from_utf8_lossy(&bytes);
        let expanded = expand_env(&text);
        let cfg = Config::parse(&expanded).map_err(|source| GraphError::InvalidConfig {
            url: url.to_string(),
            source,
        })?;

        path.push(url.to_string());
        for child in &cfg.includes {
            load_node(fetcher, child, configs, path).await?;
        }
        path.pop();

        configs.insert(url.to_string(), cfg);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(pairs: &[(&str, &str)]) -> ConfigGraph {
        let mut configs = HashMap::new();
        for (url, yaml) in pairs {
            configs.insert(url.to_string(), Config::parse(yaml).unwrap());
        }
        ConfigGraph {
            root: pairs[0].0.to_string(),
            configs,
        }
    }

    #[test]
    fn resolves_single_node() {
        let graph = graph_of(&[("root", "lava: \"v1.0.0\"\nchecktypes: []\n")]);
        let resolved = graph.resolve_node("root").unwrap();
        assert_eq!(resolved.lava_version.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn include_order_scenario() {
        // root includes [A, B]; A sets severity: medium; B sets nothing;
        // root itself sets severity: critical. Expected effective severity
        // is critical, and checktype_urls read B.urls ++ A.urls ++ root.urls.
        let graph = graph_of(&[
            (
                "root",
                "lava: \"v1.0.0\"\nincludes: [\"A\", \"B\"]\nchecktypes: [\"root-url\"]\nreport:\n  severity: \"critical\"\n",
            ),
            (
                "A",
                "checktypes: [\"a-url\"]\nreport:\n  severity: \"medium\"\n",
            ),
            ("B", "checktypes: [\"b-url\"]\n"),
        ]);
        let resolved = graph.resolve_node("root").unwrap();
        assert_eq!(
            resolved.checktype_urls,
            vec!["b-url".to_string(), "a-url".to_string(), "root-url".to_string()]
        );
        assert_eq!(
            resolved.report_config.effective_severity(),
            crate::model::Severity::Critical
        );
    }

    #[test]
    fn repeated_include_doubles_content() {
        // A includes [B, B]; resolving A should read B.targets ++ B.targets
        // ++ A.targets, in that order.
        let graph = graph_of(&[
            (
                "A",
                "includes: [\"B\", \"B\"]\nchecktypes: [\"a-url\"]\ntargets:\n  - identifier: a-target\n    type: Hostname\n",
            ),
            (
                "B",
                "checktypes: [\"b-url\"]\ntargets:\n  - identifier: b-target\n    type: Hostname\n",
            ),
        ]);
        let resolved = graph.resolve_node("A").unwrap();
        let ids: Vec<&str> = resolved
            .targets
            .iter()
            .map(|t| t.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["b-target", "b-target", "a-target"]);
    }

    #[tokio::test]
    async fn load_detects_cycle() {
        let fetcher = Fetcher::new();
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        tokio::fs::write(&a, format!("includes: [\"{}\"]\n", b.display()))
            .await
            .unwrap();
        tokio::fs::write(&b, format!("includes: [\"{}\"]\n", a.display()))
            .await
            .unwrap();
        let err = ConfigGraph::load(&fetcher, a.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Cycle(_)));
    }

    #[tokio::test]
    async fn load_resolves_diamond_without_memoizing_merge() {
        let fetcher = Fetcher::new();
        let dir = tempfile::tempdir().unwrap();
        let leaf = dir.path().join("leaf.yaml");
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        let root = dir.path().join("root.yaml");

        tokio::fs::write(
            &leaf,
            "targets:\n  - identifier: shared\n    type: Hostname\n",
        )
        .await
        .unwrap();
        tokio::fs::write(&a, format!("includes: [\"{}\"]\n", leaf.display()))
            .await
            .unwrap();
        tokio::fs::write(&b, format!("includes: [\"{}\"]\n", leaf.display()))
            .await
            .unwrap();
        tokio::fs::write(
            &root,
            format!(
                "includes: [\"{}\", \"{}\"]\nchecktypes: [\"u\"]\n",
                a.display(),
                b.display()
            ),
        )
        .await
        .unwrap();

        let graph = ConfigGraph::load(&fetcher, root.to_str().unwrap())
            .await
            .unwrap();
        let resolved = graph.resolve().unwrap();
        // leaf's single target is reachable via both A and B, so it appears
        // twice in the resolved target list.
        assert_eq!(resolved.targets.len(), 2);
    }
}
