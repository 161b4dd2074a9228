//! # Ingestor Shared
//!
//! This crate defines shared data structures and types used across the bulk
//! ingestor system. It includes the canonical person document indexed into the
//! search engine, the deterministic document identity, and the explicit
//! data-augmentation policies applied during transformation.

pub mod types;

pub use types::identity::{content_hash_identity, DocumentIdentity};
pub use types::person_document::{
    random_registration_year, PersonDocument, RawRecord, REGISTRATION_YEARS,
};
