//! Core types for Sift
//!
//! This crate defines the foundational types used throughout the system:
//! - Error: error type hierarchy for the query pipeline
//! - DocumentReference: raw hit identity (index + document id)
//! - FieldValue, GeoPoint, Document: stored field data
//! - IndexSchema, FieldDefinition, FieldType: per-index field declarations
//! - TimeoutPolicy, Deadline: fail-after / truncate-after enforcement
//! - SearchResultTotal: exact or lower-bound total hit count
//! - SearchConfig: `sift.toml` settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod schema;
pub mod timeout;
pub mod total;
pub mod types;

pub use config::SearchConfig;
pub use error::{Error, Result};
pub use schema::{FieldDefinition, FieldType, IndexSchema, IndexSchemaBuilder};
pub use timeout::{Deadline, TimeoutKind, TimeoutPolicy};
pub use total::SearchResultTotal;
pub use types::{Document, DocumentReference, FieldValue, GeoPoint};
