//! Sort factory and steps
//!
//! Clauses compose with `then()`:
//!
//! ```ignore
//! .sort(|f| f.field("genre").asc().then().score().then().field("pages").desc())?
//! ```

use super::sortable_field;
use crate::extension::{negotiate, SearchExtension};
use crate::scope::SearchScope;
use crate::sort::{MissingValue, SearchSort, SortClause, SortOrder};
use sift_core::{Error, FieldType, FieldValue, GeoPoint, Result};

/// Final step of any sort definition
pub trait SortFinalStep {
    /// Produce the sort, or the first error met while building it
    fn to_sort(self) -> Result<SearchSort>;
}

impl SortFinalStep for SearchSort {
    fn to_sort(self) -> Result<SearchSort> {
        Ok(self)
    }
}

impl<T: SortFinalStep> SortFinalStep for Result<T> {
    fn to_sort(self) -> Result<SearchSort> {
        self.and_then(T::to_sort)
    }
}

/// Entry point for building sorts against a scope
///
/// A factory obtained through `then()` carries the clauses defined so far.
#[derive(Debug, Clone)]
pub struct SearchSortFactory {
    scope: SearchScope,
    clauses: Result<Vec<SortClause>>,
}

impl SearchSortFactory {
    pub(crate) fn new(scope: SearchScope) -> Self {
        SearchSortFactory {
            scope,
            clauses: Ok(Vec::new()),
        }
    }

    fn push(self, clause: Result<SortClause>) -> SortStep {
        let clauses = self.clauses.and_then(|mut clauses| {
            clauses.push(clause?);
            Ok(clauses)
        });
        SortStep {
            scope: self.scope,
            clauses,
        }
    }

    /// Relevance score, descending unless `asc()` is called
    pub fn score(self) -> ScoreSortStep {
        ScoreSortStep(self.push(Ok(SortClause::Score {
            order: SortOrder::Desc,
        })))
    }

    /// Field value, ascending unless `desc()` is called; missing values last
    pub fn field(self, path: &str) -> FieldSortStep {
        let clause = sortable_field(&self.scope, path).and_then(|def| {
            if def.field_type.is_ordered() {
                Ok(SortClause::Field {
                    path: path.to_string(),
                    order: SortOrder::Asc,
                    missing: MissingValue::Last,
                })
            } else {
                Err(Error::field_capability(path, "sorting"))
            }
        });
        FieldSortStep(self.push(clause))
    }

    /// Distance from `center` to a geo point field, ascending unless `desc()` is called
    pub fn distance(self, path: &str, center: GeoPoint) -> DistanceSortStep {
        let clause = sortable_field(&self.scope, path).and_then(|def| {
            if def.field_type == FieldType::GeoPoint {
                Ok(SortClause::Distance {
                    path: path.to_string(),
                    center,
                    order: SortOrder::Asc,
                })
            } else {
                Err(Error::field_capability(path, "distance sorting"))
            }
        });
        DistanceSortStep(self.push(clause))
    }

    /// Index (insertion) order
    pub fn index_order(self) -> SortStep {
        self.push(Ok(SortClause::IndexOrder))
    }

    /// Negotiate a backend-specific factory
    pub fn extension<X>(self, extension: &X) -> Result<X::Extended>
    where
        X: SearchExtension<SearchSortFactory>,
    {
        let backend = self.scope.backend().clone();
        negotiate(extension, self, backend.as_ref())
    }
}

/// A sort with at least one clause
#[derive(Debug)]
pub struct SortStep {
    scope: SearchScope,
    clauses: Result<Vec<SortClause>>,
}

impl SortStep {
    /// Add a tiebreaker clause
    pub fn then(self) -> SearchSortFactory {
        SearchSortFactory {
            scope: self.scope,
            clauses: self.clauses,
        }
    }

    fn set_order(mut self, order: SortOrder) -> Self {
        if let Ok(clauses) = &mut self.clauses {
            match clauses.last_mut() {
                Some(SortClause::Score { order: o })
                | Some(SortClause::Field { order: o, .. })
                | Some(SortClause::Distance { order: o, .. }) => *o = order,
                _ => {}
            }
        }
        self
    }
}

impl SortFinalStep for SortStep {
    fn to_sort(self) -> Result<SearchSort> {
        self.clauses.map(SearchSort::from_clauses)
    }
}

/// `score()` step
#[derive(Debug)]
pub struct ScoreSortStep(SortStep);

impl ScoreSortStep {
    /// Lowest score first
    pub fn asc(self) -> Self {
        ScoreSortStep(self.0.set_order(SortOrder::Asc))
    }

    /// Highest score first
    pub fn desc(self) -> Self {
        ScoreSortStep(self.0.set_order(SortOrder::Desc))
    }

    /// Add a tiebreaker clause
    pub fn then(self) -> SearchSortFactory {
        self.0.then()
    }
}

impl SortFinalStep for ScoreSortStep {
    fn to_sort(self) -> Result<SearchSort> {
        self.0.to_sort()
    }
}

/// `field()` step
#[derive(Debug)]
pub struct FieldSortStep(SortStep);

impl FieldSortStep {
    /// Smallest value first
    pub fn asc(self) -> Self {
        FieldSortStep(self.0.set_order(SortOrder::Asc))
    }

    /// Largest value first
    pub fn desc(self) -> Self {
        FieldSortStep(self.0.set_order(SortOrder::Desc))
    }

    fn set_missing(mut self, missing: MissingValue) -> Self {
        let step = &mut self.0;
        if let Ok(clauses) = &mut step.clauses {
            if let Some(SortClause::Field { missing: m, .. }) = clauses.last_mut() {
                *m = missing;
            }
        }
        self
    }

    /// Documents without a value come first
    pub fn missing_first(self) -> Self {
        self.set_missing(MissingValue::First)
    }

    /// Documents without a value come last
    pub fn missing_last(self) -> Self {
        self.set_missing(MissingValue::Last)
    }

    /// Documents without a value sort as if they held `value`
    pub fn missing_use(mut self, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        let path = match &self.0.clauses {
            Ok(clauses) => match clauses.last() {
                Some(SortClause::Field { path, .. }) => Some(path.clone()),
                _ => None,
            },
            Err(_) => None,
        };
        let Some(path) = path else {
            return self;
        };
        match self.0.scope.resolve_field(&path) {
            Ok(def) if def.field_type.accepts(&value) => {
                self.set_missing(MissingValue::Use(value))
            }
            Ok(_) => {
                self.0.clauses = Err(Error::invalid_input(format!(
                    "missing value of type {} does not fit sort field '{}'",
                    value.type_name(),
                    path
                )));
                self
            }
            Err(e) => {
                self.0.clauses = Err(e);
                self
            }
        }
    }

    /// Add a tiebreaker clause
    pub fn then(self) -> SearchSortFactory {
        self.0.then()
    }
}

impl SortFinalStep for FieldSortStep {
    fn to_sort(self) -> Result<SearchSort> {
        self.0.to_sort()
    }
}

/// `distance()` step
#[derive(Debug)]
pub struct DistanceSortStep(SortStep);

impl DistanceSortStep {
    /// Closest first
    pub fn asc(self) -> Self {
        DistanceSortStep(self.0.set_order(SortOrder::Asc))
    }

    /// Farthest first
    pub fn desc(self) -> Self {
        DistanceSortStep(self.0.set_order(SortOrder::Desc))
    }

    /// Add a tiebreaker clause
    pub fn then(self) -> SearchSortFactory {
        self.0.then()
    }
}

impl SortFinalStep for DistanceSortStep {
    fn to_sort(self) -> Result<SearchSort> {
        self.0.to_sort()
    }
}
