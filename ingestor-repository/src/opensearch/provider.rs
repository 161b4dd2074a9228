//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate: index template, index creation with
//! write-optimized settings, bulk upserts, and settings restoration.

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesPutIndexTemplateParts, IndicesPutSettingsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{
    get_bulk_load_settings, get_index_template, get_restore_settings, IndexConfig,
};
use crate::types::{BulkItemFailure, BulkWriteSummary};
use ingestor_shared::{DocumentIdentity, PersonDocument};

/// OpenSearch provider implementation.
///
/// Exposes the three write-sink APIs the ingestion pipeline needs: the
/// index-template API, the index-create/settings API, and the bulk-write API.
///
/// # Example
///
/// ```ignore
/// use ingestor_repository::{IndexConfig, OpenSearchProvider, SearchIndexProvider};
/// let config = IndexConfig::new("persons");
/// let provider = OpenSearchProvider::new("http://localhost:9200", config)?;
/// provider.apply_template().await?;
/// provider.create_index().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing the index name
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Build the newline-delimited bulk body: one upsert-by-id `index` action
    /// per document. `index` with an explicit `_id` overwrites any existing
    /// document with the same identity, which is what keeps re-ingestion
    /// idempotent.
    fn build_bulk_body(
        batch: &[(DocumentIdentity, PersonDocument)],
    ) -> Result<Vec<JsonBody<Value>>, SearchIndexError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(batch.len() * 2);
        for (identity, doc) in batch {
            body.push(json!({ "index": { "_id": identity } }).into());
            let doc_value = serde_json::to_value(doc)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
            body.push(doc_value.into());
        }
        Ok(body)
    }

    /// Inspect a bulk response body and summarize per-item results.
    fn parse_bulk_response(total: usize, body: &Value) -> BulkWriteSummary {
        if !body["errors"].as_bool().unwrap_or(false) {
            return BulkWriteSummary::success(total);
        }

        let mut failures = Vec::new();
        if let Some(items) = body["items"].as_array() {
            for item in items {
                // Each item wraps the result under its action name.
                let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
                    continue;
                };
                let status = result["status"].as_u64().unwrap_or(0) as u16;
                if result.get("error").is_some() {
                    failures.push(BulkItemFailure {
                        id: result["_id"].as_str().unwrap_or_default().to_string(),
                        status,
                        error_type: result["error"]["type"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                        reason: result["error"]["reason"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    });
                }
            }
        }

        let failed = failures.len();
        BulkWriteSummary {
            total,
            succeeded: total.saturating_sub(failed),
            failed,
            failures,
        }
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchIndexError::connection(format!(
                "Ping failed with status {}",
                status
            )));
        }

        debug!("OpenSearch reachable");
        Ok(())
    }

    async fn apply_template(&self) -> Result<(), SearchIndexError> {
        let template_name = self.index_config.template_name();
        let response = self
            .client
            .indices()
            .put_index_template(IndicesPutIndexTemplateParts::Name(&template_name))
            .body(get_index_template(&self.index_config.name))
            .send()
            .await
            .map_err(|e| SearchIndexError::template(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::template(format!(
                "Template apply failed with status {}: {}",
                status, error_body
            )));
        }

        info!(template = %template_name, "Applied index template");
        Ok(())
    }

    async fn create_index(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index_config.name))
            .body(get_bulk_load_settings())
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(
                index = %self.index_config.name,
                "Created index with bulk-load settings"
            );
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        // Resumed runs hit an existing index; that is success, not failure.
        if error_body.contains("resource_already_exists_exception") {
            info!(index = %self.index_config.name, "Index already exists");
            return Ok(());
        }

        Err(SearchIndexError::index_creation(format!(
            "Index creation failed with status {}: {}",
            status, error_body
        )))
    }

    async fn bulk_upsert(
        &self,
        batch: &[(DocumentIdentity, PersonDocument)],
    ) -> Result<BulkWriteSummary, SearchIndexError> {
        if batch.is_empty() {
            return Ok(BulkWriteSummary::success(0));
        }

        let body = Self::build_bulk_body(batch)?;

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_write(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::bulk_write(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(batch.len(), &response_body);
        if summary.failed > 0 {
            warn!(
                total = summary.total,
                failed = summary.failed,
                "Bulk write completed with item failures"
            );
        } else {
            debug!(count = summary.total, "Bulk write succeeded");
        }

        Ok(summary)
    }

    async fn restore_settings(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[&self.index_config.name]))
            .body(get_restore_settings())
            .send()
            .await
            .map_err(|e| SearchIndexError::settings(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::settings(format!(
                "Settings restore failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %self.index_config.name, "Restored read-optimized index settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc(name: &str) -> PersonDocument {
        PersonDocument {
            mobile: "9000000001".to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_bulk_body_pairs_action_and_document() {
        let batch = vec![
            ("id-1".to_string(), sample_doc("Asha")),
            ("id-2".to_string(), sample_doc("Bala")),
        ];
        let body = OpenSearchProvider::build_bulk_body(&batch).unwrap();
        // One action line plus one document line per entry.
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_parse_bulk_response_all_success() {
        let body = json!({ "took": 3, "errors": false, "items": [] });
        let summary = OpenSearchProvider::parse_bulk_response(5, &body);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_parse_bulk_response_partial_failure() {
        let body = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": {
                    "_id": "b",
                    "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "bad field" }
                } },
                { "index": {
                    "_id": "c",
                    "status": 409,
                    "error": { "type": "version_conflict_engine_exception", "reason": "conflict" }
                } }
            ]
        });

        let summary = OpenSearchProvider::parse_bulk_response(3, &body);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert!(!summary.all_failures_benign());
        assert_eq!(summary.failures[0].error_type, "mapper_parsing_exception");
        assert_eq!(summary.failures[1].id, "c");
        assert!(summary.failures[1].is_benign());
    }

    #[test]
    fn test_parse_bulk_response_only_benign_failures() {
        let body = json!({
            "errors": true,
            "items": [
                { "index": {
                    "_id": "a",
                    "status": 409,
                    "error": { "type": "version_conflict_engine_exception", "reason": "conflict" }
                } }
            ]
        });

        let summary = OpenSearchProvider::parse_bulk_response(1, &body);
        assert_eq!(summary.failed, 1);
        assert!(summary.all_failures_benign());
    }
}
