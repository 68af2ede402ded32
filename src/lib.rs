//! Sift - type-safe full-text query pipeline
//!
//! Sift turns a fluent, type-checked query DSL into executable queries that
//! can be fetched in windows, counted, or scrolled in chunks, with hits
//! mapped to projections and loaded entities.
//!
//! # Quick Start
//!
//! ```ignore
//! use sift::{Document, FieldDefinition, IndexSchema, InMemoryBackend, SearchScope};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! backend.create_index(
//!     IndexSchema::builder("books")
//!         .field("title", FieldDefinition::text())
//!         .build()?,
//! )?;
//!
//! let work = backend.work_executor("books")?;
//! work.add("1", |doc| {
//!     doc.add("title", "The Left Hand of Darkness");
//! })?;
//! work.flush();
//!
//! let scope = SearchScope::new(backend, &["books"])?;
//! let hits = scope
//!     .query()
//!     .where_(|f| f.match_().field("title").matching("darkness"))?
//!     .fetch_hits(None, Some(20))?;
//! ```
//!
//! # Architecture
//!
//! - `sift-core`: errors, references, field values, schemas, timeouts
//! - `sift-query`: DSL steps, executable queries, scroll, hit loading and
//!   the backend SPI
//! - `sift-engine`: the in-memory backend shipped with Sift
//!
//! Everything an application needs is re-exported from this crate. The
//! engine internals stay under [`engine`].

pub use sift_core::{
    Deadline, Document, DocumentReference, Error, FieldDefinition, FieldType, FieldValue,
    GeoPoint, IndexSchema, Result, SearchConfig, SearchResultTotal, TimeoutKind, TimeoutPolicy,
};
pub use sift_query::*;

pub use sift_engine::{InMemoryBackend, InMemoryExtension};

/// In-memory backend: indexes, work execution, scoring and extensions
pub mod engine {
    pub use sift_engine::*;
}
