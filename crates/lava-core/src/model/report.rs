//! Per-check reports and the vulnerabilities they contain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal (or in-flight) status of one check's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Running,
    Finished,
    Failed,
    Inconclusive,
}

/// `{name, header, rows}` — one table of supporting evidence attached to a
/// vulnerability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub name: String,
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<HashMap<String, String>>,
}

/// One finding emitted by a check. May nest `sub_vulnerabilities`, which
/// carry identifier rewrites the same way the parent does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub impact_details: String,
    #[serde(default)]
    pub affected_resource: String,
    #[serde(default)]
    pub affected_resource_string: String,
    #[serde(default)]
    pub fingerprint: String,
    pub score: f64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceGroup>,
    #[serde(default)]
    pub sub_vulnerabilities: Vec<Vulnerability>,
}

impl Vulnerability {
    /// Apply `rewrite` to every string field that may carry the target
    /// identifier, recursing into `sub_vulnerabilities`. Used both to
    /// rewrite-in (before a check runs, never needed today) and to
    /// undo-rewrite (after a check finishes).
    pub fn map_identifiers(&mut self, rewrite: impl Fn(&str) -> String + Copy) {
        self.summary = rewrite(&self.summary);
        self.description = rewrite(&self.description);
        self.details = rewrite(&self.details);
        self.impact_details = rewrite(&self.impact_details);
        self.affected_resource = rewrite(&self.affected_resource);
        self.affected_resource_string = rewrite(&self.affected_resource_string);
        for group in &mut self.resources {
            group.map_identifiers(rewrite);
        }
        for sub in &mut self.sub_vulnerabilities {
            sub.map_identifiers(rewrite);
        }
    }
}

impl ResourceGroup {
    /// Apply `rewrite` to the group's name, header entries, and every row
    /// value — the same identifier-rewrite undo `Vulnerability` applies to
    /// its own text fields.
    pub fn map_identifiers(&mut self, rewrite: impl Fn(&str) -> String + Copy) {
        self.name = rewrite(&self.name);
        for header in &mut self.header {
            *header = rewrite(header);
        }
        for row in &mut self.rows {
            for value in row.values_mut() {
                *value = rewrite(value);
            }
        }
    }
}

/// The full result of running one check against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub check_id: Uuid,
    pub checktype_name: String,
    pub target: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
}
