//! Report store (C7): a thread-safe in-memory sink invoked by the agent
//! driver, accepting `reports` and `logs` uploads and exposing a live
//! summary plus the final per-check report map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lava_core::{CheckReport, CheckStatus, TargetMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ReportStoreError;

/// What a check is currently doing, for the live progress ticker.
#[derive(Debug, Clone)]
pub struct SummaryEntry {
    pub check_id: Uuid,
    pub checktype_name: String,
    pub target: String,
    pub start: DateTime<Utc>,
    pub status: CheckStatus,
}

impl SummaryEntry {
    pub fn line(&self) -> String {
        format!(
            "{} {} target={} status={:?} since={}",
            self.check_id, self.checktype_name, self.target, self.status, self.start
        )
    }
}

/// Thread-safe sink for check reports and progress state. Cloning shares
/// the underlying store — clone it freely into each dispatched task.
#[derive(Clone, Default)]
pub struct ReportStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    reports: HashMap<Uuid, CheckReport>,
    in_flight: HashMap<Uuid, SummaryEntry>,
    target_maps: HashMap<Uuid, TargetMap>,
}

impl ReportStore {
    pub fn new() -> ReportStore {
        ReportStore::default()
    }

    /// Register a check as started, for the live summary ticker.
    pub async fn start(&self, check_id: Uuid, checktype_name: &str, target: &str) {
        let mut inner = self.inner.lock().await;
        inner.in_flight.insert(
            check_id,
            SummaryEntry {
                check_id,
                checktype_name: checktype_name.to_string(),
                target: target.to_string(),
                start: Utc::now(),
                status: CheckStatus::Running,
            },
        );
    }

    /// The agent's `UploadCheckData(check_id, kind, payload) -> (link, error)`
    /// contract. `reports` payloads are parsed into a [`CheckReport`] and
    /// stored (last write wins); `logs` are accepted and discarded; any
    /// other kind is an error. The returned link is always empty — Lava
    /// does not persist artifacts off-process.
    pub async fn upload(
        &self,
        check_id: Uuid,
        kind: &str,
        payload: &[u8],
    ) -> Result<String, ReportStoreError> {
        match kind {
            "reports" => {
                let report: CheckReport = serde_json::from_slice(payload)
                    .map_err(|source| ReportStoreError::MalformedReport { check_id, source })?;
                let mut inner = self.inner.lock().await;
                if let Some(entry) = inner.in_flight.get_mut(&check_id) {
                    entry.status = report.status;
                }
                inner.reports.insert(check_id, report);
                Ok(String::new())
            }
            "logs" => Ok(String::new()),
            other => Err(ReportStoreError::UnknownKind(other.to_string())),
        }
    }

    pub async fn mark_status(&self, check_id: Uuid, status: CheckStatus) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.in_flight.get_mut(&check_id) {
            entry.status = status;
        }
    }

    /// Record the identifier rewrite the target server applied for this
    /// check, so it can be undone in the final report.
    pub async fn record_target_map(&self, target_map: TargetMap) {
        let mut inner = self.inner.lock().await;
        inner.target_maps.insert(target_map.check_id, target_map);
    }

    /// Final per-check report map, with every identifier rewrite recorded
    /// via [`ReportStore::record_target_map`] undone in place.
    pub async fn reports(&self) -> HashMap<Uuid, CheckReport> {
        let mut inner = self.inner.lock().await;
        for (check_id, target_map) in &inner.target_maps {
            if let Some(report) = inner.reports.get_mut(check_id) {
                report.target = target_map.undo_in(&report.target);
                for vuln in &mut report.vulnerabilities {
                    vuln.map_identifiers(|s| target_map.undo_in(s));
                }
            }
        }
        inner.reports.clone()
    }

    /// One line per currently tracked check, for the periodic summary log.
    pub async fn summary(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .in_flight
            .values()
            .map(SummaryEntry::line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_core::Vulnerability;

    fn report(check_id: Uuid, status: CheckStatus) -> Vec<u8> {
        let report = CheckReport {
            check_id,
            checktype_name: "trivy".into(),
            target: "example.com".into(),
            status,
            vulnerabilities: vec![Vulnerability {
                summary: "finding".into(),
                score: 5.0,
                ..Default::default()
            }],
        };
        serde_json::to_vec(&report).unwrap()
    }

    #[tokio::test]
    async fn upload_reports_last_write_wins() {
        let store = ReportStore::new();
        let check_id = Uuid::new_v4();
        store
            .upload(check_id, "reports", &report(check_id, CheckStatus::Running))
            .await
            .unwrap();
        store
            .upload(check_id, "reports", &report(check_id, CheckStatus::Finished))
            .await
            .unwrap();
        let reports = store.reports().await;
        assert_eq!(reports[&check_id].status, CheckStatus::Finished);
    }

    #[tokio::test]
    async fn logs_are_accepted_and_discarded() {
        let store = ReportStore::new();
        let link = store
            .upload(Uuid::new_v4(), "logs", b"some log line")
            .await
            .unwrap();
        assert!(link.is_empty());
        assert!(store.reports().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_kind_is_an_error() {
        let store = ReportStore::new();
        assert!(store.upload(Uuid::new_v4(), "metrics", b"{}").await.is_err());
    }

    #[tokio::test]
    async fn malformed_report_surfaces_as_error() {
        let store = ReportStore::new();
        let err = store
            .upload(Uuid::new_v4(), "reports", b"not json")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportStoreError::MalformedReport { .. }));
    }

    #[tokio::test]
    async fn reports_undoes_recorded_target_map() {
        use lava_core::{AddrPair, AssetType};

        let store = ReportStore::new();
        let check_id = Uuid::new_v4();
        let report = CheckReport {
            check_id,
            checktype_name: "gitleaks".into(),
            target: "127.0.0.1:9418".into(),
            status: CheckStatus::Finished,
            vulnerabilities: vec![Vulnerability {
                summary: "secret found in clone of 127.0.0.1:9418".into(),
                ..Default::default()
            }],
        };
        store
            .upload(check_id, "reports", &serde_json::to_vec(&report).unwrap())
            .await
            .unwrap();
        store
            .record_target_map(lava_core::TargetMap {
                check_id,
                old_identifier: ".".into(),
                new_identifier: "127.0.0.1:9418".into(),
                old_asset_type: AssetType::Path,
                new_asset_type: AssetType::GitRepository,
                addrs: AddrPair {
                    old: ".".into(),
                    new: "127.0.0.1:9418".into(),
                },
            })
            .await;

        let reports = store.reports().await;
        let report = &reports[&check_id];
        assert_eq!(report.target, ".");
        assert_eq!(
            report.vulnerabilities[0].summary,
            "secret found in clone of ."
        );
    }

    #[tokio::test]
    async fn summary_reflects_in_flight_checks() {
        let store = ReportStore::new();
        let check_id = Uuid::new_v4();
        store.start(check_id, "trivy", "example.com").await;
        let summary = store.summary().await;
        assert_eq!(summary.len(), 1);
        assert!(summary[0].contains("trivy"));
    }
}
