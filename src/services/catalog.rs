use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::Facility;

/// Errors that can occur when reading the facility catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Catalog returned error: {0}")]
    ApiError(String),

    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog format: {0}")]
    InvalidFormat(String),
}

/// Read-only source of facility snapshots
#[async_trait]
pub trait FacilityCatalog: Send + Sync {
    /// Current list of facilities; records that fail to parse are skipped
    async fn snapshot(&self) -> Result<Vec<Facility>, CatalogError>;
}

/// Turn one catalog record into a facility
///
/// Accepts the `{ "data": {...} }` document envelope and flat
/// `latitude`/`longitude` fields in place of a nested `coordinate`.
fn parse_document(doc: &Value) -> Option<Facility> {
    let mut data = doc.get("data").unwrap_or(doc).clone();

    if let Some(obj) = data.as_object_mut() {
        if !obj.contains_key("coordinate") {
            if let (Some(lat), Some(lon)) = (obj.remove("latitude"), obj.remove("longitude")) {
                obj.insert(
                    "coordinate".to_string(),
                    serde_json::json!({ "latitude": lat, "longitude": lon }),
                );
            }
        }
    }

    match serde_json::from_value::<Facility>(data) {
        Ok(facility) => Some(facility),
        Err(e) => {
            let id = doc.get("id").or_else(|| doc.get("$id"));
            tracing::warn!("Skipping unparseable catalog record {:?}: {}", id, e);
            None
        }
    }
}

/// Parse a catalog body: a bare array, or an object holding the array under
/// `facilities` or `documents`
fn parse_documents(body: &Value) -> Result<Vec<Facility>, CatalogError> {
    let documents = body
        .as_array()
        .or_else(|| body.get("facilities").and_then(Value::as_array))
        .or_else(|| body.get("documents").and_then(Value::as_array))
        .ok_or_else(|| CatalogError::InvalidFormat("Missing facilities array".into()))?;

    let facilities: Vec<Facility> = documents.iter().filter_map(parse_document).collect();

    tracing::debug!(
        "Parsed {} of {} catalog records",
        facilities.len(),
        documents.len()
    );

    Ok(facilities)
}

/// Catalog backed by a local JSON or TOML file, re-read on every snapshot
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn parse(&self, contents: &str) -> Result<Value, CatalogError> {
        let is_toml = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            let table: toml::Value = toml::from_str(contents)
                .map_err(|e| CatalogError::InvalidFormat(e.to_string()))?;
            serde_json::to_value(table).map_err(|e| CatalogError::InvalidFormat(e.to_string()))
        } else {
            serde_json::from_str(contents).map_err(|e| CatalogError::InvalidFormat(e.to_string()))
        }
    }
}

#[async_trait]
impl FacilityCatalog for FileCatalog {
    async fn snapshot(&self) -> Result<Vec<Facility>, CatalogError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.clone(),
                source,
            })?;

        parse_documents(&self.parse(&contents)?)
    }
}

/// Catalog served over HTTP as a JSON document list
pub struct HttpCatalog {
    url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpCatalog {
    /// Create a new catalog client
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { url, api_key, client })
    }
}

#[async_trait]
impl FacilityCatalog for HttpCatalog {
    async fn snapshot(&self) -> Result<Vec<Facility>, CatalogError> {
        tracing::debug!("Fetching facilities from: {}", self.url);

        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch facilities: {} - {}", status, body);
            return Err(CatalogError::ApiError(format!(
                "Failed to fetch facilities: {}",
                status
            )));
        }

        let json: Value = response.json().await?;
        parse_documents(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FacilityStatus;
    use serde_json::json;

    #[test]
    fn test_parse_flat_and_enveloped_documents() {
        let body = json!({
            "total": 2,
            "documents": [
                {
                    "$id": "doc1",
                    "data": {
                        "id": "bin-1",
                        "latitude": 28.63,
                        "longitude": 77.21,
                        "status": "active",
                        "acceptedCategories": ["battery"]
                    }
                },
                {
                    "id": "bin-2",
                    "coordinate": { "latitude": 19.07, "longitude": 72.87 },
                    "status": "maintenance"
                }
            ]
        });

        let facilities = parse_documents(&body).unwrap();
        assert_eq!(facilities.len(), 2);
        assert!(facilities[0].valid_coordinate().is_some());
        assert_eq!(facilities[1].status, FacilityStatus::Maintenance);
    }

    #[test]
    fn test_bad_record_skipped_not_fatal() {
        let body = json!([
            { "id": "ok", "status": "active" },
            { "id": "no-status" },
            { "id": "bad-lat", "latitude": null, "longitude": 1.0, "status": "active" },
            "not an object"
        ]);

        let facilities = parse_documents(&body).unwrap();
        let ids: Vec<_> = facilities.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn test_missing_array_is_error() {
        assert!(matches!(
            parse_documents(&json!({ "items": [] })),
            Err(CatalogError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_file_catalog_toml() {
        let dir = std::env::temp_dir().join(format!("bin-locator-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bins.toml");
        std::fs::write(
            &path,
            r#"
[[facilities]]
id = "bin-toml"
status = "full"
acceptedCategories = ["glass"]
operatingWindow = "24/7"
latitude = 12.97
longitude = 77.59
"#,
        )
        .unwrap();

        let catalog = FileCatalog::new(&path);
        let facilities = tokio_test::block_on(catalog.snapshot()).unwrap();

        assert_eq!(facilities.len(), 1);
        assert_eq!(facilities[0].id, "bin-toml");
        assert_eq!(facilities[0].status, FacilityStatus::Full);
        assert!(facilities[0].valid_coordinate().is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_catalog_missing_file() {
        let catalog = FileCatalog::new("/nonexistent/bins.json");
        let result = tokio_test::block_on(catalog.snapshot());
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
