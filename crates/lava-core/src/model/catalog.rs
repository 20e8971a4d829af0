//! Catalog loading: fetch and merge checktype definitions from one or more
//! `checktype_urls`.

use std::collections::HashMap;

use lava_fetch::Fetcher;
use serde::Deserialize;

use super::checktype::Checktype;
use crate::error::CatalogError;

/// Wire envelope: `{"checktypes": [Checktype, ...]}`. `required_vars`
/// arrives typed-any and is validated to a string array before the entry
/// is deserialized into a [`Checktype`].
#[derive(Debug, Deserialize)]
struct RawCatalog {
    checktypes: Vec<serde_json::Value>,
}

/// A merged set of checktypes, keyed by name.
///
/// When the same checktype name is defined by more than one catalog URL,
/// the last URL in `checktype_urls` wins — catalogs are merged in list
/// order, each overwriting any checktype of the same name loaded before it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    checktypes: HashMap<String, Checktype>,
}

impl Catalog {
    pub fn get(&self, name: &str) -> Option<&Checktype> {
        self.checktypes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checktype> {
        self.checktypes.values()
    }

    pub fn len(&self) -> usize {
        self.checktypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checktypes.is_empty()
    }

    /// Load and merge the catalogs at `urls`, in order.
    pub async fn load(fetcher: &Fetcher, urls: &[String]) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::default();
        for url in urls {
            let bytes = fetcher
                .fetch(url)
                .await
                .map_err(|source| CatalogError::Fetch {
                    url: url.clone(),
                    source,
                })?;
            catalog.merge_from_bytes(url, &bytes)?;
        }
        Ok(catalog)
    }

    fn merge_from_bytes(&mut self, url: &str, bytes: &[u8]) -> Result<(), CatalogError> {
        let raw: RawCatalog =
            serde_json::from_slice(bytes).map_err(|source| CatalogError::Malformed {
                url: url.to_string(),
                source,
            })?;
        for mut entry in raw.checktypes {
            let name = entry
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("<unknown>")
                .to_string();

            if let Some(vars) = entry.get_mut("required_vars") {
                let items = vars.as_array().cloned().unwrap_or_default();
                let validated: Vec<serde_json::Value> = items
                    .into_iter()
                    .map(|item| {
                        item.as_str()
                            .map(|s| serde_json::Value::String(s.to_string()))
                            .ok_or_else(|| CatalogError::InvalidRequiredVar {
                                checktype: name.clone(),
                            })
                    })
                    .collect::<Result<_, _>>()?;
                *vars = serde_json::Value::Array(validated);
            }

            let checktype: Checktype =
                serde_json::from_value(entry).map_err(|source| CatalogError::Malformed {
                    url: url.to_string(),
                    source,
                })?;
            for var in &checktype.required_vars {
                if var.trim().is_empty() {
                    return Err(CatalogError::InvalidRequiredVar {
                        checktype: checktype.name.clone(),
                    });
                }
            }
            self.checktypes.insert(checktype.name.clone(), checktype);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_later_url_over_earlier() {
        let mut catalog = Catalog::default();
        catalog
            .merge_from_bytes(
                "a",
                br#"{"checktypes": [{"name": "nessus", "image": "nessus:1", "assets": ["IP"]}]}"#,
            )
            .unwrap();
        catalog
            .merge_from_bytes(
                "b",
                br#"{"checktypes": [{"name": "nessus", "image": "nessus:2", "assets": ["IP"]}]}"#,
            )
            .unwrap();
        assert_eq!(catalog.get("nessus").unwrap().image, "nessus:2");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn name_comes_from_entry_body() {
        let mut catalog = Catalog::default();
        catalog
            .merge_from_bytes(
                "a",
                br#"{"checktypes": [{"name": "trivy", "image": "trivy:latest"}]}"#,
            )
            .unwrap();
        assert_eq!(catalog.get("trivy").unwrap().name, "trivy");
    }

    #[test]
    fn rejects_empty_required_var() {
        let mut catalog = Catalog::default();
        let err = catalog
            .merge_from_bytes(
                "a",
                br#"{"checktypes": [{"name": "trivy", "image": "trivy:latest", "required_vars": [""]}]}"#,
            )
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRequiredVar { .. }));
    }

    #[test]
    fn rejects_non_string_required_var() {
        let mut catalog = Catalog::default();
        let err = catalog
            .merge_from_bytes(
                "a",
                br#"{"checktypes": [{"name": "trivy", "image": "trivy:latest", "required_vars": [42]}]}"#,
            )
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRequiredVar { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let mut catalog = Catalog::default();
        let err = catalog.merge_from_bytes("a", b"not json").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));
    }
}
