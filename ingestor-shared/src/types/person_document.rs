//! Canonical person document for the search index.
//!
//! This module defines the fixed-shape document produced by the record
//! transformer and indexed in the search engine, together with the
//! data-augmentation constants applied when a source omits a field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw, heterogeneous record as decoded from an input element.
///
/// Ephemeral: produced by the streaming decoder, consumed by the transformer,
/// never persisted directly.
pub type RawRecord = Map<String, Value>;

/// Fixed set of registration years used when a source does not supply one.
///
/// This is a deliberate data-augmentation policy of the ingestion system, not
/// a derived fact. Downstream consumers must not treat the value as ground
/// truth.
pub const REGISTRATION_YEARS: [i32; 4] = [2019, 2020, 2021, 2022];

/// Pick a registration year from [`REGISTRATION_YEARS`] at random.
pub fn random_registration_year() -> i32 {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..REGISTRATION_YEARS.len());
    REGISTRATION_YEARS[idx]
}

/// Canonical document representation for the person search index.
///
/// Every field defaults to empty/zero when absent from the raw record. The
/// `region` and `year_of_registration` fields are filled by augmentation
/// policies when the source does not supply them (see the transformer).
///
/// `internal_id` is a per-run bookkeeping value (e.g. a row ordinal assigned
/// by a decoder) that participates in identity derivation but is never
/// persisted to the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonDocument {
    pub mobile: String,
    pub name: String,
    pub father_name: String,
    pub address: String,
    pub alt_address: String,
    pub alt_mobile: String,
    pub id: String,
    pub oid: String,
    pub email: String,
    pub year_of_registration: i32,
    pub region: String,
    #[serde(skip)]
    pub internal_id: String,
}

impl PersonDocument {
    /// The ordered identity fields hashed when no external id is present.
    ///
    /// Order is significant: `oid` (falling back to `internal_id`), `mobile`,
    /// `name`, `father_name`, `address`, `alt_mobile`, `id`, `email`.
    pub fn identity_fields(&self) -> [&str; 8] {
        let oid = if self.oid.is_empty() {
            self.internal_id.as_str()
        } else {
            self.oid.as_str()
        };
        [
            oid,
            &self.mobile,
            &self.name,
            &self.father_name,
            &self.address,
            &self.alt_mobile,
            &self.id,
            &self.email,
        ]
    }
}
