//! Portable sort descriptions
//!
//! An absent sort means relevance score, descending. Ties under the default
//! sort are broken by the backend in an unspecified way; callers needing a
//! stable order must add an explicit tiebreaker clause.

use sift_core::{FieldValue, GeoPoint};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

impl SortOrder {
    /// Apply this order to an ascending comparison
    pub fn apply(&self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Placement of documents without a value for the sorted field
#[derive(Debug, Clone, PartialEq)]
pub enum MissingValue {
    /// Before every document with a value
    First,
    /// After every document with a value
    Last,
    /// As if the document held this value
    Use(FieldValue),
}

/// One sort criterion
#[derive(Debug, Clone, PartialEq)]
pub enum SortClause {
    /// Relevance score
    Score {
        /// Direction
        order: SortOrder,
    },
    /// Field value
    Field {
        /// Dotted field path
        path: String,
        /// Direction
        order: SortOrder,
        /// Missing value placement
        missing: MissingValue,
    },
    /// Distance from a point
    Distance {
        /// Geo point field path
        path: String,
        /// Reference point
        center: GeoPoint,
        /// Direction
        order: SortOrder,
    },
    /// Index order (insertion order)
    IndexOrder,
}

/// Ordered list of sort criteria
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSort {
    clauses: Vec<SortClause>,
}

impl SearchSort {
    /// Create a sort from clauses
    pub fn from_clauses(clauses: Vec<SortClause>) -> Self {
        SearchSort { clauses }
    }

    /// Clauses in priority order
    pub fn clauses(&self) -> &[SortClause] {
        &self.clauses
    }

    /// Check if documents are returned in index order
    pub fn is_index_order(&self) -> bool {
        matches!(self.clauses.first(), Some(SortClause::IndexOrder))
    }

    /// Check whether any clause needs relevance scores
    pub fn needs_score(&self) -> bool {
        self.clauses
            .iter()
            .any(|c| matches!(c, SortClause::Score { .. }))
    }
}
