//! Error types for Sift
//!
//! Every failure surfaced by the query pipeline is a variant of [`Error`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | When |
//! |----------|----------|------|
//! | Configuration | `InvalidInput`, `UnknownIndex`, `UnknownField`, `FieldCapability`, `ConflictingTimeout`, `WindowTooLarge`, `NonUniqueHit`, `InvalidQueryString`, `TooManyClauses`, `ForeignPredicate` | Raised at the offending call |
//! | Extension | `UnsupportedExtension` | Raised at the `extension()` call |
//! | Timeout | `Timeout` | Fail-after policy only |
//! | Total count | `InexactHitCount` | `hit_count()` on a lower bound |
//! | State | `ScrollClosed`, `SessionClosed` | Using a released resource |
//! | System | `Config`, `Internal` | Infrastructure |
//!
//! Loading failures are deliberately absent: an entity that cannot be loaded
//! drops its hit from the result instead of failing the query.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Sift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the query pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    // ==================== Configuration ====================
    /// Invalid argument or option combination
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong
        reason: String,
    },

    /// Index is not known to the backend
    #[error("unknown index: '{index}'")]
    UnknownIndex {
        /// Requested index name
        index: String,
    },

    /// Field path does not exist in any targeted index
    #[error("unknown field '{field}' in indexes {indexes:?}")]
    UnknownField {
        /// Requested field path
        field: String,
        /// Indexes that were searched for the field
        indexes: Vec<String>,
    },

    /// Field exists but cannot be used this way
    #[error("field '{field}' cannot be used for {capability}")]
    FieldCapability {
        /// Field path
        field: String,
        /// The rejected usage (e.g. "sorting", "projection", "range predicates")
        capability: String,
    },

    /// A second timeout policy was requested on the same query
    #[error("conflicting timeout policies: {existing} is already set, cannot also apply {requested}")]
    ConflictingTimeout {
        /// Policy already configured
        existing: String,
        /// Policy rejected
        requested: String,
    },

    /// Requested result window exceeds the configured maximum
    #[error("result window too large: offset {offset} + limit {limit} exceeds the maximum of {max}; use scroll() to iterate large result sets")]
    WindowTooLarge {
        /// Requested offset
        offset: usize,
        /// Requested limit
        limit: usize,
        /// Configured `max_result_window`
        max: usize,
    },

    /// `fetch_single_hit()` matched more than one document
    #[error("expected at most one hit, but the query matched {count} or more")]
    NonUniqueHit {
        /// Number of hits observed (at least 2)
        count: usize,
    },

    /// Simple query string without any meaningful token
    #[error("invalid query string '{query}': {reason}")]
    InvalidQueryString {
        /// The rejected query string
        query: String,
        /// Why it was rejected
        reason: String,
    },

    /// Boolean predicate has more clauses than allowed
    #[error("too many clauses in boolean predicate: {count} exceeds the maximum of {max}")]
    TooManyClauses {
        /// Number of clauses
        count: usize,
        /// Configured `max_clause_count`
        max: usize,
    },

    /// Backend-native predicate handed to a different backend
    #[error("predicate was built for backend '{expected}' and cannot be executed by '{backend}'")]
    ForeignPredicate {
        /// Backend the predicate was built for
        expected: String,
        /// Backend executing the query
        backend: String,
    },

    // ==================== Extension ====================
    /// Extension negotiation reported no support
    #[error("extension '{extension}' is not supported by backend '{backend}'")]
    UnsupportedExtension {
        /// Extension type name
        extension: String,
        /// Backend name
        backend: String,
    },

    // ==================== Timeout ====================
    /// Fail-after timeout expired
    #[error("query exceeded the timeout of {timeout:?} (elapsed: {elapsed:?})")]
    Timeout {
        /// Configured timeout
        timeout: Duration,
        /// Time spent before giving up
        elapsed: Duration,
    },

    // ==================== Total count ====================
    /// Exact total requested but only a lower bound is known
    #[error("exact total hit count unavailable: only a lower bound of {lower_bound} is known; remove the total hit count threshold or the timeout, or use hit_count_lower_bound()")]
    InexactHitCount {
        /// The known lower bound
        lower_bound: u64,
    },

    // ==================== State ====================
    /// Scroll used after close
    #[error("scroll is closed")]
    ScrollClosed,

    /// Loading session no longer usable
    #[error("loading session is closed")]
    SessionClosed,

    // ==================== System ====================
    /// Configuration file could not be read or parsed
    #[error("configuration error: {reason}")]
    Config {
        /// What went wrong
        reason: String,
    },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Create an `InvalidInput` error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a `FieldCapability` error
    pub fn field_capability(field: impl Into<String>, capability: impl Into<String>) -> Self {
        Error::FieldCapability {
            field: field.into(),
            capability: capability.into(),
        }
    }

    /// Create an `Internal` error
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// Create a `Config` error
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Check if this error is a fail-after timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this error signals programmer error in query construction
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput { .. }
                | Error::UnknownIndex { .. }
                | Error::UnknownField { .. }
                | Error::FieldCapability { .. }
                | Error::ConflictingTimeout { .. }
                | Error::WindowTooLarge { .. }
                | Error::NonUniqueHit { .. }
                | Error::InvalidQueryString { .. }
                | Error::TooManyClauses { .. }
                | Error::ForeignPredicate { .. }
                | Error::UnsupportedExtension { .. }
        )
    }
}
