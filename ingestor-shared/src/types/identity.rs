//! Deterministic document identity.
//!
//! A document's identity is either the explicit external id carried by the
//! raw record, or a content hash over a fixed, ordered field sequence. The
//! same logical record always yields the same identity, which is what makes
//! bulk re-submission idempotent (upsert-by-id) instead of append-only.

use sha2::{Digest, Sha256};

/// Deterministic identifier used as the bulk-write `_id` for a document.
pub type DocumentIdentity = String;

/// Separator joining identity fields before hashing.
const IDENTITY_SEPARATOR: &str = "|";

/// Compute a content-hash identity from an ordered field sequence.
///
/// Fields are case-normalized (lowercased), joined with a separator in the
/// given order, and hashed with SHA-256. Re-ingesting the same logical record
/// from any run yields the same identity.
pub fn content_hash_identity<'a, I>(fields: I) -> DocumentIdentity
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = fields
        .into_iter()
        .map(|f| f.to_lowercase())
        .collect::<Vec<_>>()
        .join(IDENTITY_SEPARATOR);

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = content_hash_identity(["9000000001", "Asha", "ID1"]);
        let b = content_hash_identity(["9000000001", "Asha", "ID1"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_is_case_normalized() {
        let a = content_hash_identity(["ASHA", "id1"]);
        let b = content_hash_identity(["asha", "ID1"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_content_hash_is_order_sensitive() {
        let a = content_hash_identity(["asha", "bala"]);
        let b = content_hash_identity(["bala", "asha"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_fields_still_hash() {
        let a = content_hash_identity(["", "", ""]);
        let b = content_hash_identity(["", ""]);
        assert_ne!(a, b);
    }
}
