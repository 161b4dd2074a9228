//! OpenSearch index configuration, template, and settings bodies.
//!
//! This module defines the field mappings for the person index and the two
//! settings profiles used around a bulk load: replicas and periodic refresh
//! are disabled while loading and restored afterwards.

use serde_json::{json, Value};

/// The default name of the person search index.
pub const DEFAULT_INDEX_NAME: &str = "persons";

/// Replica count restored after bulk load completes.
const READ_REPLICAS: u32 = 1;

/// Refresh interval restored after bulk load completes.
const READ_REFRESH_INTERVAL: &str = "1s";

/// Configuration for the person search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The index name used for all operations.
    pub name: String,
}

impl IndexConfig {
    /// Create a new index configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name under which the index template is registered.
    pub fn template_name(&self) -> String {
        format!("{}_template", self.name)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME)
    }
}

/// Index template body carrying the person document mapping.
///
/// Identifier-like fields (`mobile`, `id`, `oid`, `email`, `region`) are
/// keywords for exact lookups; names and addresses are analyzed text with a
/// `raw` keyword subfield for exact matching.
pub fn get_index_template(index_name: &str) -> Value {
    json!({
        "index_patterns": [format!("{}*", index_name)],
        "template": {
            "mappings": {
                "properties": {
                    "mobile": { "type": "keyword" },
                    "name": {
                        "type": "text",
                        "fields": { "raw": { "type": "keyword" } }
                    },
                    "fatherName": {
                        "type": "text",
                        "fields": { "raw": { "type": "keyword" } }
                    },
                    "address": { "type": "text" },
                    "altAddress": { "type": "text" },
                    "altMobile": { "type": "keyword" },
                    "id": { "type": "keyword" },
                    "oid": { "type": "keyword" },
                    "email": { "type": "keyword" },
                    "yearOfRegistration": { "type": "integer" },
                    "region": { "type": "keyword" }
                }
            }
        }
    })
}

/// Index creation body with write-optimized settings for bulk load.
///
/// Replicas are disabled so every write hits one shard copy, and periodic
/// refresh is disabled so segments are not rebuilt while hundreds of millions
/// of documents stream in.
pub fn get_bulk_load_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "refresh_interval": "-1"
        }
    })
}

/// Settings body restoring the read-optimized profile after bulk load.
pub fn get_restore_settings() -> Value {
    json!({
        "index": {
            "number_of_replicas": READ_REPLICAS,
            "refresh_interval": READ_REFRESH_INTERVAL
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_covers_all_document_fields() {
        let template = get_index_template(DEFAULT_INDEX_NAME);
        let properties = &template["template"]["mappings"]["properties"];

        for field in [
            "mobile",
            "name",
            "fatherName",
            "address",
            "altAddress",
            "altMobile",
            "id",
            "oid",
            "email",
            "yearOfRegistration",
            "region",
        ] {
            assert!(properties[field].is_object(), "missing mapping for {}", field);
        }

        assert_eq!(properties["mobile"]["type"], "keyword");
        assert_eq!(properties["name"]["type"], "text");
        assert_eq!(properties["yearOfRegistration"]["type"], "integer");
    }

    #[test]
    fn test_bulk_load_settings_disable_replicas_and_refresh() {
        let settings = get_bulk_load_settings();
        assert_eq!(settings["settings"]["number_of_replicas"], 0);
        assert_eq!(settings["settings"]["refresh_interval"], "-1");
    }

    #[test]
    fn test_restore_settings_reenable_replicas_and_refresh() {
        let settings = get_restore_settings();
        assert_eq!(settings["index"]["number_of_replicas"], 1);
        assert_eq!(settings["index"]["refresh_interval"], "1s");
    }

    #[test]
    fn test_template_name() {
        let config = IndexConfig::new("persons");
        assert_eq!(config.template_name(), "persons_template");
    }
}
