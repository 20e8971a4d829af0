//! Checks and jobs: the matrix-expansion output consumed by the agent.

use uuid::Uuid;

use super::asset_type::AssetType;
use crate::error::CatalogError;

/// One `(target, checktype)` pairing produced by matrix expansion, before
/// validation into a [`Job`].
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub check_id: Uuid,
    pub checktype_name: String,
    pub image: String,
    pub target_identifier: String,
    pub asset_type: AssetType,
    pub timeout_seconds: u64,
    pub options: serde_json::Map<String, serde_json::Value>,
    pub required_vars: Vec<String>,
}

impl Check {
    pub fn into_job(self) -> Result<Job, CatalogError> {
        let options_json = serde_json::Value::Object(self.options).to_string();
        Ok(Job {
            check_id: self.check_id,
            checktype_name: self.checktype_name,
            image: self.image,
            target_identifier: self.target_identifier,
            asset_type: self.asset_type,
            timeout_seconds: self.timeout_seconds,
            options_json,
            required_vars: self.required_vars,
        })
    }
}

/// A validated, agent-ready unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub check_id: Uuid,
    pub checktype_name: String,
    pub image: String,
    pub target_identifier: String,
    pub asset_type: AssetType,
    pub timeout_seconds: u64,
    pub options_json: String,
    pub required_vars: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_job_encodes_options_as_json() {
        let mut options = serde_json::Map::new();
        options.insert("depth".into(), serde_json::json!(2));
        let check = Check {
            check_id: Uuid::new_v4(),
            checktype_name: "trivy".into(),
            image: "trivy:latest".into(),
            target_identifier: "example.com".into(),
            asset_type: AssetType::DomainName,
            timeout_seconds: 600,
            options,
            required_vars: vec![],
        };
        let job = check.into_job().unwrap();
        assert_eq!(job.options_json, r#"{"depth":2}"#);
    }

    #[test]
    fn check_ids_are_distinct() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(a, b);
    }
}
