//! Shared type definitions for the bulk ingestor.

pub mod identity;
pub mod person_document;
