//! In-memory search backend for Sift
//!
//! This crate implements the backend SPI of `sift-query`:
//! - tokenizer: text analysis for text fields and match values
//! - scorer: BM25 over per-field statistics
//! - index: staged writes published as immutable snapshots on flush
//! - eval: predicate evaluation and sort comparison
//! - collector: windowing, deadlines and early termination
//! - scroll: lazy index-order scroll and eager sorted scroll
//! - backend: the index registry implementing `SearchBackend`
//! - extension: in-memory specific predicates and query explanation
//!
//! Not a production engine: every search scans every document of the
//! targeted indexes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod collector;
mod eval;
pub mod extension;
pub mod index;
pub mod scorer;
pub mod scroll;
pub mod tokenizer;

pub use backend::{InMemoryBackend, BACKEND_NAME};
pub use extension::{
    Explanation, FilterPredicate, InMemoryExtension, InMemoryPredicateFactory,
    InMemorySearchQuery,
};
pub use index::{DocumentWorkExecutor, InMemoryIndex, IndexSnapshot};
pub use scroll::{IndexOrderScroll, SortedScroll};
