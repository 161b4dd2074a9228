//! Raw-record normalization and identity assignment.
//!
//! Maps heterogeneous raw fields onto the canonical document shape: alias
//! resolution, missing-field defaults, augmentation of registration year and
//! region, and a deterministic identity for upsert deduplication.

use serde_json::Value;
use tracing::debug;

use ingestor_shared::{
    content_hash_identity, random_registration_year, DocumentIdentity, PersonDocument, RawRecord,
};

/// Default region applied when a record carries none.
pub const DEFAULT_REGION: &str = "unknown";

/// Transformation settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Region applied to records that carry no region of their own.
    pub default_region: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
        }
    }
}

/// Maps raw records to canonical person documents.
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    config: TransformConfig,
}

impl RecordTransformer {
    pub fn new(config: TransformConfig) -> Self {
        debug!(default_region = %config.default_region, "Created record transformer");
        Self { config }
    }

    /// Normalize one raw record into a canonical person document.
    ///
    /// Missing or non-string fields become empty strings rather than errors.
    /// The registration year is taken from the record when present, otherwise
    /// drawn uniformly from the supported cohort years; the region falls back
    /// to the configured default.
    pub fn transform(&self, raw: &RawRecord) -> PersonDocument {
        let region = match string_field(raw, &["region", "state"]) {
            value if value.is_empty() => self.config.default_region.clone(),
            value => value,
        };

        PersonDocument {
            mobile: string_field(raw, &["mobile"]),
            name: string_field(raw, &["name"]),
            father_name: string_field(raw, &["fname", "fatherName", "father_name"]),
            address: string_field(raw, &["address"]),
            alt_address: string_field(raw, &["altAddress", "alt_address", "address2"]),
            alt_mobile: string_field(raw, &["altMobile", "alt_mobile", "mobile2"]),
            id: string_field(raw, &["id"]),
            oid: string_field(raw, &["oid", "_id"]),
            email: string_field(raw, &["email"]),
            year_of_registration: year_field(raw).unwrap_or_else(random_registration_year),
            region,
            internal_id: string_field(raw, &["internalId", "internal_id"]),
        }
    }

    /// Deterministic identity for upsert deduplication.
    ///
    /// A record carrying an explicit external `id` keeps it verbatim; all
    /// other records hash their ordered identity fields, so re-ingesting the
    /// same content always lands on the same document.
    pub fn identity(document: &PersonDocument) -> DocumentIdentity {
        if document.id.is_empty() {
            content_hash_identity(document.identity_fields())
        } else {
            document.id.clone()
        }
    }
}

/// First non-empty string value among the aliases, trimmed.
///
/// Values of unexpected types (numbers, objects, null) are treated as absent.
fn string_field(raw: &RawRecord, aliases: &[&str]) -> String {
    for alias in aliases {
        if let Some(Value::String(value)) = raw.get(*alias) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    String::new()
}

/// Registration year from the record, accepting numeric or string values.
fn year_field(raw: &RawRecord) -> Option<i32> {
    for alias in ["yearOfRegistration", "year_of_registration", "yor"] {
        match raw.get(alias) {
            Some(Value::Number(number)) => {
                if let Some(year) = number.as_i64() {
                    return i32::try_from(year).ok();
                }
            }
            Some(Value::String(value)) => {
                if let Ok(year) = value.trim().parse::<i32>() {
                    return Some(year);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestor_shared::REGISTRATION_YEARS;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        value.as_object().cloned().unwrap_or_default()
    }

    fn transformer() -> RecordTransformer {
        RecordTransformer::new(TransformConfig::default())
    }

    #[test]
    fn test_explicit_id_is_kept_as_identity() {
        let doc = transformer().transform(&raw(json!({
            "mobile": "9000000001",
            "name": "Asha",
            "id": "ID1"
        })));
        assert_eq!(RecordTransformer::identity(&doc), "ID1");
    }

    #[test]
    fn test_missing_id_falls_back_to_content_hash() {
        let doc = transformer().transform(&raw(json!({
            "mobile": "9000000002",
            "name": "Dev"
        })));
        let identity = RecordTransformer::identity(&doc);
        assert_eq!(identity.len(), 64);
        assert!(identity.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identity_is_deterministic_for_same_content() {
        let record = raw(json!({"mobile": "9000000002", "name": "Dev"}));
        let first = transformer().transform(&record);
        let second = transformer().transform(&record);
        assert_eq!(
            RecordTransformer::identity(&first),
            RecordTransformer::identity(&second)
        );
    }

    #[test]
    fn test_field_aliases_resolve() {
        let doc = transformer().transform(&raw(json!({
            "fname": "Ravi",
            "_id": "65aa0f",
            "alt_mobile": "9111111111"
        })));
        assert_eq!(doc.father_name, "Ravi");
        assert_eq!(doc.oid, "65aa0f");
        assert_eq!(doc.alt_mobile, "9111111111");
    }

    #[test]
    fn test_unexpected_types_are_absent() {
        let doc = transformer().transform(&raw(json!({
            "mobile": 9000000001u64,
            "name": {"first": "Asha"},
            "email": null
        })));
        assert_eq!(doc.mobile, "");
        assert_eq!(doc.name, "");
        assert_eq!(doc.email, "");
    }

    #[test]
    fn test_year_augmentation() {
        let explicit = transformer().transform(&raw(json!({"yearOfRegistration": 2021})));
        assert_eq!(explicit.year_of_registration, 2021);

        let from_string = transformer().transform(&raw(json!({"yor": "2019"})));
        assert_eq!(from_string.year_of_registration, 2019);

        let defaulted = transformer().transform(&raw(json!({})));
        assert!(REGISTRATION_YEARS.contains(&defaulted.year_of_registration));
    }

    #[test]
    fn test_region_defaulting() {
        let custom = RecordTransformer::new(TransformConfig {
            default_region: "south".to_string(),
        });
        assert_eq!(custom.transform(&raw(json!({}))).region, "south");
        assert_eq!(
            custom.transform(&raw(json!({"region": "north"}))).region,
            "north"
        );
        assert_eq!(
            custom.transform(&raw(json!({"state": "east"}))).region,
            "east"
        );
    }

    #[test]
    fn test_values_are_trimmed() {
        let doc = transformer().transform(&raw(json!({"name": "  Asha  "})));
        assert_eq!(doc.name, "Asha");
    }
}
