//! Core domain types for the ingest pipeline.

pub mod ids;

pub use ids::{CanonicalKey, ContentId, JobId};
