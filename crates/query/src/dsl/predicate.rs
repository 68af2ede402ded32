//! Predicate factory and steps
//!
//! ```ignore
//! scope.query().where_(|f| {
//!     f.bool_()
//!         .must(f.match_().field("title").matching("dune"))
//!         .filter(f.range().field("pages").at_least(100))
//!         .must_not(f.exists().field("retired"))
//! })?;
//! ```

use super::{check_value, searchable_field};
use crate::extension::{negotiate, SearchExtension};
use crate::predicate::{BoolPredicate, FieldTarget, MinimumShouldMatch, SearchPredicate};
use crate::query_string::{self, BooleanOperator};
use crate::scope::SearchScope;
use sift_core::{Error, FieldType, FieldValue, GeoPoint, Result};
use std::ops::Bound;

/// Final step of any predicate definition
pub trait PredicateFinalStep {
    /// Produce the predicate, or the first error met while building it
    fn to_predicate(self) -> Result<SearchPredicate>;
}

impl PredicateFinalStep for SearchPredicate {
    fn to_predicate(self) -> Result<SearchPredicate> {
        Ok(self)
    }
}

impl<T: PredicateFinalStep> PredicateFinalStep for Result<T> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        self.and_then(T::to_predicate)
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Entry point for building predicates against a scope
#[derive(Debug, Clone)]
pub struct SearchPredicateFactory {
    scope: SearchScope,
}

impl SearchPredicateFactory {
    pub(crate) fn new(scope: SearchScope) -> Self {
        SearchPredicateFactory { scope }
    }

    /// Scope the factory resolves fields against
    pub fn scope(&self) -> &SearchScope {
        &self.scope
    }

    /// Match every document
    pub fn match_all(&self) -> PredicateOptionsStep {
        PredicateOptionsStep::new(Ok(SearchPredicate::MatchAll))
    }

    /// Match documents by id
    pub fn id(&self) -> IdPredicateStep {
        IdPredicateStep
    }

    /// Match a value on one or more fields
    pub fn match_(&self) -> MatchPredicateFieldStep {
        MatchPredicateFieldStep {
            scope: self.scope.clone(),
        }
    }

    /// Match values within bounds
    pub fn range(&self) -> RangePredicateFieldStep {
        RangePredicateFieldStep {
            scope: self.scope.clone(),
        }
    }

    /// Combine predicates
    pub fn bool_(&self) -> BoolPredicateStep {
        BoolPredicateStep {
            max_clause_count: self.scope.config().max_clause_count,
            state: Ok(BoolPredicate::default()),
            boost: 1.0,
        }
    }

    /// Match documents holding a value for a field or object
    pub fn exists(&self) -> ExistsPredicateStep {
        ExistsPredicateStep {
            scope: self.scope.clone(),
        }
    }

    /// Spatial predicates
    pub fn spatial(&self) -> SpatialPredicateStep {
        SpatialPredicateStep {
            scope: self.scope.clone(),
        }
    }

    /// Parse a query string with a small, search-box friendly syntax
    pub fn simple_query_string(&self) -> SimpleQueryStringFieldStep {
        SimpleQueryStringFieldStep {
            scope: self.scope.clone(),
        }
    }

    /// Match every document not matching `predicate`
    pub fn not(&self, predicate: impl PredicateFinalStep) -> PredicateOptionsStep {
        let state = predicate.to_predicate().map(|p| {
            SearchPredicate::Bool(BoolPredicate {
                must: vec![SearchPredicate::MatchAll],
                must_not: vec![p],
                ..BoolPredicate::default()
            })
        });
        PredicateOptionsStep::new(state)
    }

    /// Negotiate a backend-specific factory
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedExtension` if the backend does not support it.
    pub fn extension<X>(&self, extension: &X) -> Result<X::Extended>
    where
        X: SearchExtension<SearchPredicateFactory>,
    {
        negotiate(extension, self.clone(), self.scope.backend().as_ref())
    }
}

// ============================================================================
// Shared options step
// ============================================================================

/// Last step of a leaf predicate: optional boost, then done
#[derive(Debug)]
pub struct PredicateOptionsStep {
    state: Result<SearchPredicate>,
    boost: f32,
}

impl PredicateOptionsStep {
    fn new(state: Result<SearchPredicate>) -> Self {
        PredicateOptionsStep { state, boost: 1.0 }
    }

    /// Multiply the score contribution of this predicate
    pub fn boost(mut self, boost: f32) -> Self {
        if !(boost.is_finite() && boost >= 0.0) && self.state.is_ok() {
            self.state = Err(Error::invalid_input(format!(
                "boost must be a finite, non-negative number, got {}",
                boost
            )));
        }
        self.boost = boost;
        self
    }
}

impl PredicateFinalStep for PredicateOptionsStep {
    fn to_predicate(self) -> Result<SearchPredicate> {
        let boost = self.boost;
        self.state.map(|p| p.boosted(boost))
    }
}

// ============================================================================
// id
// ============================================================================

/// `id()` step
#[derive(Debug)]
pub struct IdPredicateStep;

impl IdPredicateStep {
    /// Match a single id
    pub fn matching(self, id: impl Into<String>) -> PredicateOptionsStep {
        PredicateOptionsStep::new(Ok(SearchPredicate::Id {
            ids: vec![id.into()],
        }))
    }

    /// Match any of the given ids
    pub fn matching_any<I, S>(self, ids: I) -> PredicateOptionsStep
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PredicateOptionsStep::new(Ok(SearchPredicate::Id {
            ids: ids.into_iter().map(Into::into).collect(),
        }))
    }
}

// ============================================================================
// match
// ============================================================================

/// `match_()` step: choose fields
#[derive(Debug)]
pub struct MatchPredicateFieldStep {
    scope: SearchScope,
}

impl MatchPredicateFieldStep {
    /// Target one field
    pub fn field(self, path: &str) -> MatchPredicateFieldMoreStep {
        self.fields(&[path])
    }

    /// Target several fields; a match on any of them counts
    pub fn fields(self, paths: &[&str]) -> MatchPredicateFieldMoreStep {
        let fields = paths
            .iter()
            .map(|p| searchable_field(&self.scope, p))
            .collect::<Result<Vec<_>>>();
        MatchPredicateFieldMoreStep {
            scope: self.scope,
            fields,
        }
    }
}

/// `match_()` step: more fields, or the value
#[derive(Debug)]
pub struct MatchPredicateFieldMoreStep {
    scope: SearchScope,
    fields: Result<Vec<FieldTarget>>,
}

impl MatchPredicateFieldMoreStep {
    /// Target an additional field
    pub fn field(mut self, path: &str) -> Self {
        let target = searchable_field(&self.scope, path);
        self.fields = self.fields.and_then(|mut fields| {
            fields.push(target?);
            Ok(fields)
        });
        self
    }

    /// Boost matches on the most recently added field
    pub fn boost(mut self, boost: f32) -> Self {
        if let Ok(fields) = &mut self.fields {
            if let Some(last) = fields.last_mut() {
                last.boost = boost;
            }
        }
        self
    }

    /// Value to match; text fields are analyzed
    pub fn matching(self, value: impl Into<FieldValue>) -> PredicateOptionsStep {
        let value = value.into();
        let state = self.fields.and_then(|fields| {
            for target in &fields {
                check_value(target, &value)?;
                if target.field_type == FieldType::GeoPoint {
                    return Err(Error::field_capability(&target.path, "match predicates"));
                }
            }
            Ok(SearchPredicate::Match { fields, value })
        });
        PredicateOptionsStep::new(state)
    }
}

// ============================================================================
// range
// ============================================================================

/// `range()` step: choose the field
#[derive(Debug)]
pub struct RangePredicateFieldStep {
    scope: SearchScope,
}

impl RangePredicateFieldStep {
    /// Target a field; it must have an ordered type
    pub fn field(self, path: &str) -> RangePredicateLimitsStep {
        let field = searchable_field(&self.scope, path).and_then(|target| {
            if target.field_type.is_ordered() {
                Ok(target)
            } else {
                Err(Error::field_capability(path, "range predicates"))
            }
        });
        RangePredicateLimitsStep { field }
    }
}

/// `range()` step: bounds
#[derive(Debug)]
pub struct RangePredicateLimitsStep {
    field: Result<FieldTarget>,
}

impl RangePredicateLimitsStep {
    /// Inclusive on both ends
    pub fn between(
        self,
        lower: impl Into<FieldValue>,
        upper: impl Into<FieldValue>,
    ) -> PredicateOptionsStep {
        self.within(Bound::Included(lower.into()), Bound::Included(upper.into()))
    }

    /// `>= lower`
    pub fn at_least(self, lower: impl Into<FieldValue>) -> PredicateOptionsStep {
        self.within(Bound::Included(lower.into()), Bound::Unbounded)
    }

    /// `> lower`
    pub fn greater_than(self, lower: impl Into<FieldValue>) -> PredicateOptionsStep {
        self.within(Bound::Excluded(lower.into()), Bound::Unbounded)
    }

    /// `<= upper`
    pub fn at_most(self, upper: impl Into<FieldValue>) -> PredicateOptionsStep {
        self.within(Bound::Unbounded, Bound::Included(upper.into()))
    }

    /// `< upper`
    pub fn less_than(self, upper: impl Into<FieldValue>) -> PredicateOptionsStep {
        self.within(Bound::Unbounded, Bound::Excluded(upper.into()))
    }

    /// Arbitrary bounds
    pub fn within(self, lower: Bound<FieldValue>, upper: Bound<FieldValue>) -> PredicateOptionsStep {
        let state = self.field.and_then(|field| {
            for bound in [&lower, &upper] {
                if let Bound::Included(v) | Bound::Excluded(v) = bound {
                    check_value(&field, v)?;
                }
            }
            if matches!((&lower, &upper), (Bound::Unbounded, Bound::Unbounded)) {
                return Err(Error::invalid_input(format!(
                    "range predicate on '{}' needs at least one bound",
                    field.path
                )));
            }
            Ok(SearchPredicate::Range {
                field,
                lower,
                upper,
            })
        });
        PredicateOptionsStep::new(state)
    }
}

// ============================================================================
// bool
// ============================================================================

/// `bool_()` step: add clauses in any order
#[derive(Debug)]
pub struct BoolPredicateStep {
    max_clause_count: usize,
    state: Result<BoolPredicate>,
    boost: f32,
}

impl BoolPredicateStep {
    fn add(
        mut self,
        clause: impl PredicateFinalStep,
        slot: fn(&mut BoolPredicate) -> &mut Vec<SearchPredicate>,
    ) -> Self {
        let max = self.max_clause_count;
        self.state = self.state.and_then(|mut b| {
            let predicate = clause.to_predicate()?;
            if b.clause_count() >= max {
                return Err(Error::TooManyClauses {
                    count: b.clause_count() + 1,
                    max,
                });
            }
            slot(&mut b).push(predicate);
            Ok(b)
        });
        self
    }

    /// Required, scoring clause
    pub fn must(self, clause: impl PredicateFinalStep) -> Self {
        self.add(clause, |b| &mut b.must)
    }

    /// Optional, scoring clause
    pub fn should(self, clause: impl PredicateFinalStep) -> Self {
        self.add(clause, |b| &mut b.should)
    }

    /// Prohibited clause
    pub fn must_not(self, clause: impl PredicateFinalStep) -> Self {
        self.add(clause, |b| &mut b.must_not)
    }

    /// Required, non-scoring clause
    pub fn filter(self, clause: impl PredicateFinalStep) -> Self {
        self.add(clause, |b| &mut b.filter)
    }

    /// Require at least `n` should clauses; negative means all but `-n`
    pub fn minimum_should_match_number(mut self, n: i32) -> Self {
        if let Ok(b) = &mut self.state {
            b.minimum_should_match = Some(MinimumShouldMatch::Number(n));
        }
        self
    }

    /// Require a percentage of should clauses; negative means all but `-p`%
    pub fn minimum_should_match_percent(mut self, percent: i32) -> Self {
        if let Ok(b) = &mut self.state {
            b.minimum_should_match = Some(MinimumShouldMatch::Percent(percent));
        }
        self
    }

    /// Multiply the score of the whole boolean predicate
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl PredicateFinalStep for BoolPredicateStep {
    fn to_predicate(self) -> Result<SearchPredicate> {
        let boost = self.boost;
        self.state
            .map(|b| SearchPredicate::Bool(b).boosted(boost))
    }
}

// ============================================================================
// exists
// ============================================================================

/// `exists()` step
#[derive(Debug)]
pub struct ExistsPredicateStep {
    scope: SearchScope,
}

impl ExistsPredicateStep {
    /// Field or object path
    pub fn field(self, path: &str) -> PredicateOptionsStep {
        let state = if self.scope.is_known_path(path) {
            Ok(SearchPredicate::Exists {
                path: path.to_string(),
            })
        } else {
            Err(Error::UnknownField {
                field: path.to_string(),
                indexes: self.scope.indexes().to_vec(),
            })
        };
        PredicateOptionsStep::new(state)
    }
}

// ============================================================================
// spatial
// ============================================================================

/// `spatial()` step
#[derive(Debug)]
pub struct SpatialPredicateStep {
    scope: SearchScope,
}

impl SpatialPredicateStep {
    /// Points inside a shape
    pub fn within(self) -> SpatialWithinStep {
        SpatialWithinStep { scope: self.scope }
    }
}

/// `spatial().within()` step
#[derive(Debug)]
pub struct SpatialWithinStep {
    scope: SearchScope,
}

impl SpatialWithinStep {
    /// Geo point field
    pub fn field(self, path: &str) -> SpatialWithinShapeStep {
        let field = searchable_field(&self.scope, path).and_then(|target| {
            if target.field_type == FieldType::GeoPoint {
                Ok(target)
            } else {
                Err(Error::field_capability(path, "spatial predicates"))
            }
        });
        SpatialWithinShapeStep { field }
    }
}

/// `spatial().within().field()` step: the shape
#[derive(Debug)]
pub struct SpatialWithinShapeStep {
    field: Result<FieldTarget>,
}

impl SpatialWithinShapeStep {
    /// Circle around `center`
    pub fn circle(self, center: GeoPoint, radius_meters: f64) -> PredicateOptionsStep {
        let state = self.field.and_then(|field| {
            if !(radius_meters.is_finite() && radius_meters >= 0.0) {
                return Err(Error::invalid_input(format!(
                    "circle radius must be a finite, non-negative distance, got {}",
                    radius_meters
                )));
            }
            Ok(SearchPredicate::WithinCircle {
                field,
                center,
                radius_meters,
            })
        });
        PredicateOptionsStep::new(state)
    }

    /// Box between its north-west and south-east corners
    pub fn bounding_box(self, top_left: GeoPoint, bottom_right: GeoPoint) -> PredicateOptionsStep {
        let state = self.field.and_then(|field| {
            if top_left.latitude < bottom_right.latitude {
                return Err(Error::invalid_input(
                    "bounding box top-left corner must not be south of the bottom-right corner",
                ));
            }
            Ok(SearchPredicate::WithinBoundingBox {
                field,
                top_left,
                bottom_right,
            })
        });
        PredicateOptionsStep::new(state)
    }
}

// ============================================================================
// simple_query_string
// ============================================================================

/// `simple_query_string()` step: choose fields
#[derive(Debug)]
pub struct SimpleQueryStringFieldStep {
    scope: SearchScope,
}

fn text_field(scope: &SearchScope, path: &str) -> Result<FieldTarget> {
    searchable_field(scope, path).and_then(|target| match target.field_type {
        FieldType::Text | FieldType::Keyword => Ok(target),
        _ => Err(Error::field_capability(path, "query strings")),
    })
}

impl SimpleQueryStringFieldStep {
    /// Target one field
    pub fn field(self, path: &str) -> SimpleQueryStringFieldMoreStep {
        self.fields(&[path])
    }

    /// Target several fields
    pub fn fields(self, paths: &[&str]) -> SimpleQueryStringFieldMoreStep {
        let fields = paths
            .iter()
            .map(|p| text_field(&self.scope, p))
            .collect::<Result<Vec<_>>>();
        SimpleQueryStringFieldMoreStep {
            scope: self.scope,
            fields,
            default_operator: BooleanOperator::default(),
        }
    }
}

/// `simple_query_string()` step: more fields, options, or the query
#[derive(Debug)]
pub struct SimpleQueryStringFieldMoreStep {
    scope: SearchScope,
    fields: Result<Vec<FieldTarget>>,
    default_operator: BooleanOperator,
}

impl SimpleQueryStringFieldMoreStep {
    /// Target an additional field
    pub fn field(mut self, path: &str) -> Self {
        let target = text_field(&self.scope, path);
        self.fields = self.fields.and_then(|mut fields| {
            fields.push(target?);
            Ok(fields)
        });
        self
    }

    /// Boost matches on the most recently added field
    pub fn boost(mut self, boost: f32) -> Self {
        if let Ok(fields) = &mut self.fields {
            if let Some(last) = fields.last_mut() {
                last.boost = boost;
            }
        }
        self
    }

    /// Operator between terms without explicit `+`, `-` or `|`
    pub fn default_operator(mut self, operator: BooleanOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Query string
    ///
    /// A string without a single meaningful token is rejected.
    pub fn matching(self, query: &str) -> PredicateOptionsStep {
        let operator = self.default_operator;
        let state = self.fields.and_then(|fields| {
            let query = query_string::parse(query, operator)?;
            Ok(SearchPredicate::SimpleQueryString { fields, query })
        });
        PredicateOptionsStep::new(state)
    }
}
