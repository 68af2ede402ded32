//! Portable predicate descriptions
//!
//! A [`SearchPredicate`] is what the predicate DSL produces and what a
//! backend evaluates. Field references inside a predicate are already
//! resolved against the scope's schemas, so backends can trust paths and
//! types.

use crate::query_string::SimpleQuery;
use sift_core::{FieldType, FieldValue, GeoPoint};
use std::any::Any;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

// ============================================================================
// FieldTarget
// ============================================================================

/// A resolved field reference with its per-field boost
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTarget {
    /// Dotted field path
    pub path: String,
    /// Field type, identical across every targeted index
    pub field_type: FieldType,
    /// Score multiplier for matches on this field
    pub boost: f32,
}

impl FieldTarget {
    /// Create a target with a neutral boost
    pub fn new(path: impl Into<String>, field_type: FieldType) -> Self {
        FieldTarget {
            path: path.into(),
            field_type,
            boost: 1.0,
        }
    }
}

// ============================================================================
// MinimumShouldMatch
// ============================================================================

/// Minimum number of `should` clauses a document must match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimumShouldMatch {
    /// Absolute count; negative means "all but n"
    Number(i32),
    /// Percentage of should clauses, rounded down; negative means "all but n%"
    Percent(i32),
}

impl MinimumShouldMatch {
    /// Number of should clauses required out of `should_count`
    pub fn required(&self, should_count: usize) -> usize {
        let count = should_count as i64;
        let required = match *self {
            MinimumShouldMatch::Number(n) if n >= 0 => n as i64,
            MinimumShouldMatch::Number(n) => count + n as i64,
            MinimumShouldMatch::Percent(p) if p >= 0 => count * p as i64 / 100,
            MinimumShouldMatch::Percent(p) => count - count * (-(p as i64)) / 100,
        };
        required.clamp(0, count) as usize
    }
}

// ============================================================================
// BoolPredicate
// ============================================================================

/// Boolean combination of predicates
///
/// # Semantics
///
/// - every `must` and `filter` clause must match; only `must` contributes to the score
/// - no `must_not` clause may match
/// - `should` clauses add to the score; when there is no `must`/`filter`
///   clause, at least one of them must match unless `minimum_should_match`
///   says otherwise
#[derive(Debug, Clone, Default)]
pub struct BoolPredicate {
    /// Required, scoring
    pub must: Vec<SearchPredicate>,
    /// Optional, scoring
    pub should: Vec<SearchPredicate>,
    /// Prohibited
    pub must_not: Vec<SearchPredicate>,
    /// Required, non-scoring
    pub filter: Vec<SearchPredicate>,
    /// Should-clause constraint
    pub minimum_should_match: Option<MinimumShouldMatch>,
}

impl BoolPredicate {
    /// Total number of clauses
    pub fn clause_count(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len() + self.filter.len()
    }

    /// Number of should clauses a document must match
    pub fn required_should(&self) -> usize {
        match self.minimum_should_match {
            Some(msm) => msm.required(self.should.len()),
            None if self.must.is_empty() && self.filter.is_empty() && !self.should.is_empty() => 1,
            None => 0,
        }
    }
}

// ============================================================================
// NativePredicate
// ============================================================================

/// Backend-specific predicate built through a DSL extension
///
/// Backends downcast through [`NativePredicate::as_any`] and reject
/// predicates built for another backend.
pub trait NativePredicate: Send + Sync + fmt::Debug {
    /// Name of the backend able to evaluate this predicate
    fn backend(&self) -> &str;

    /// Downcasting hook
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// SearchPredicate
// ============================================================================

/// A search condition
#[derive(Debug, Clone)]
pub enum SearchPredicate {
    /// Every document
    MatchAll,
    /// Documents with one of the given ids
    Id {
        /// Accepted ids
        ids: Vec<String>,
    },
    /// Value match on one or more fields; text fields are analyzed
    Match {
        /// Targeted fields
        fields: Vec<FieldTarget>,
        /// Value to match
        value: FieldValue,
    },
    /// Values within bounds
    Range {
        /// Targeted field
        field: FieldTarget,
        /// Lower bound
        lower: Bound<FieldValue>,
        /// Upper bound
        upper: Bound<FieldValue>,
    },
    /// Boolean combination
    Bool(BoolPredicate),
    /// Field (or object) has at least one value
    Exists {
        /// Field or object path
        path: String,
    },
    /// Geo point within a circle
    WithinCircle {
        /// Geo point field
        field: FieldTarget,
        /// Circle center
        center: GeoPoint,
        /// Radius in metres
        radius_meters: f64,
    },
    /// Geo point within a bounding box
    WithinBoundingBox {
        /// Geo point field
        field: FieldTarget,
        /// North-west corner
        top_left: GeoPoint,
        /// South-east corner
        bottom_right: GeoPoint,
    },
    /// Parsed simple query string
    SimpleQueryString {
        /// Targeted fields
        fields: Vec<FieldTarget>,
        /// Parsed query
        query: SimpleQuery,
    },
    /// Score multiplier around another predicate
    Boosted {
        /// Wrapped predicate
        predicate: Box<SearchPredicate>,
        /// Multiplier
        boost: f32,
    },
    /// Backend-specific predicate
    Native(Arc<dyn NativePredicate>),
}

impl SearchPredicate {
    /// Wrap in a boost, unless the boost is neutral
    pub fn boosted(self, boost: f32) -> SearchPredicate {
        if (boost - 1.0).abs() < f32::EPSILON {
            self
        } else {
            SearchPredicate::Boosted {
                predicate: Box::new(self),
                boost,
            }
        }
    }

    /// Check if this predicate matches every document regardless of content
    pub fn is_match_all(&self) -> bool {
        matches!(self, SearchPredicate::MatchAll)
    }
}
