//! Predicate evaluation and sort comparison
//!
//! A predicate either rejects a document (`None`) or matches it with a
//! score. Non-scoring predicates (ids, ranges, spatial, exists, native
//! filters) score a constant 1.0; `filter` clauses of a boolean predicate
//! contribute nothing.

use crate::extension::FilterPredicate;
use crate::index::{AnalyzedField, IndexSnapshot, IndexedDocument};
use crate::scorer::Bm25;
use crate::tokenizer::tokenize_unique;
use sift_core::{Document, Error, FieldType, FieldValue, GeoPoint, Result};
use sift_query::predicate::{BoolPredicate, FieldTarget};
use sift_query::query_string::{Occur, SimpleQuery, SimpleTerm};
use sift_query::{MissingValue, SearchPredicate, SearchSort, SortClause, SortOrder};
use std::cmp::Ordering;
use std::ops::Bound;
use std::sync::Arc;

const CONSTANT_SCORE: f32 = 1.0;

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates predicates against the documents of one snapshot
pub(crate) struct Evaluator<'a> {
    snapshot: &'a IndexSnapshot,
    backend: &'a str,
    bm25: Bm25,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(snapshot: &'a IndexSnapshot, backend: &'a str) -> Self {
        Evaluator {
            snapshot,
            backend,
            bm25: Bm25::default(),
        }
    }

    /// Score of `doc` under `predicate`, or `None` if it does not match
    ///
    /// # Errors
    ///
    /// Returns `ForeignPredicate` for a native predicate built for another backend.
    pub(crate) fn score(
        &self,
        predicate: &SearchPredicate,
        doc: &IndexedDocument,
    ) -> Result<Option<f32>> {
        let stored = doc.document();
        let score = match predicate {
            SearchPredicate::MatchAll => Some(CONSTANT_SCORE),
            SearchPredicate::Id { ids } => {
                constant(ids.iter().any(|id| id == doc.id()))
            }
            SearchPredicate::Match { fields, value } => best(
                fields
                    .iter()
                    .map(|field| self.match_field(field, value, doc)),
            ),
            SearchPredicate::Range {
                field,
                lower,
                upper,
            } => constant(
                stored
                    .values(&field.path)
                    .iter()
                    .any(|v| in_range(v, lower, upper)),
            ),
            SearchPredicate::Bool(b) => self.bool_score(b, doc)?,
            SearchPredicate::Exists { path } => {
                constant(stored.contains(path) || stored.has_object(path))
            }
            SearchPredicate::WithinCircle {
                field,
                center,
                radius_meters,
            } => constant(
                geo_points(stored, &field.path).any(|p| p.distance_to(center) <= *radius_meters),
            ),
            SearchPredicate::WithinBoundingBox {
                field,
                top_left,
                bottom_right,
            } => constant(
                geo_points(stored, &field.path).any(|p| p.is_within_box(top_left, bottom_right)),
            ),
            SearchPredicate::SimpleQueryString { fields, query } => {
                self.query_string_score(fields, query, doc)
            }
            SearchPredicate::Boosted { predicate, boost } => {
                self.score(predicate, doc)?.map(|s| s * boost)
            }
            SearchPredicate::Native(native) => {
                let filter = native
                    .as_any()
                    .downcast_ref::<FilterPredicate>()
                    .filter(|_| native.backend() == self.backend)
                    .ok_or_else(|| Error::ForeignPredicate {
                        expected: native.backend().to_string(),
                        backend: self.backend.to_string(),
                    })?;
                constant(filter.matches(stored))
            }
        };
        Ok(score)
    }

    fn bool_score(&self, b: &BoolPredicate, doc: &IndexedDocument) -> Result<Option<f32>> {
        if b.clause_count() == 0 {
            return Ok(None);
        }

        let mut score = 0.0;
        for clause in &b.must {
            match self.score(clause, doc)? {
                Some(s) => score += s,
                None => return Ok(None),
            }
        }
        for clause in &b.filter {
            if self.score(clause, doc)?.is_none() {
                return Ok(None);
            }
        }
        for clause in &b.must_not {
            if self.score(clause, doc)?.is_some() {
                return Ok(None);
            }
        }

        let mut matched_should = 0;
        for clause in &b.should {
            if let Some(s) = self.score(clause, doc)? {
                matched_should += 1;
                score += s;
            }
        }
        if matched_should < b.required_should() {
            return Ok(None);
        }

        // Only prohibitions: every other document matches
        if b.must.is_empty() && b.filter.is_empty() && b.should.is_empty() {
            score = CONSTANT_SCORE;
        }
        Ok(Some(score))
    }

    fn match_field(
        &self,
        field: &FieldTarget,
        value: &FieldValue,
        doc: &IndexedDocument,
    ) -> Option<f32> {
        match (field.field_type, value.as_text()) {
            (FieldType::Text, Some(text)) => {
                let analyzed = doc.analyzed(&field.path)?;
                let terms = tokenize_unique(text);
                let scores: Vec<f32> = terms
                    .iter()
                    .filter(|t| analyzed.term_freqs.contains_key(t.as_str()))
                    .map(|t| self.term_score(field, analyzed, t))
                    .collect();
                if scores.is_empty() {
                    None
                } else {
                    Some(scores.iter().sum())
                }
            }
            _ => doc
                .document()
                .values(&field.path)
                .iter()
                .any(|v| v.compare(value) == Some(Ordering::Equal))
                .then_some(CONSTANT_SCORE * field.boost),
        }
    }

    fn query_string_score(
        &self,
        fields: &[FieldTarget],
        query: &SimpleQuery,
        doc: &IndexedDocument,
    ) -> Option<f32> {
        let has_must = query.clauses.iter().any(|c| c.occur == Occur::Must);
        let mut score = 0.0;
        let mut should_total = 0;
        let mut should_matched = 0;

        for clause in &query.clauses {
            let matched = best(fields.iter().map(|f| self.term_in_field(f, &clause.term, doc)));
            match clause.occur {
                Occur::Must => score += matched?,
                Occur::MustNot if matched.is_some() => return None,
                Occur::MustNot => {}
                Occur::Should => {
                    should_total += 1;
                    if let Some(s) = matched {
                        should_matched += 1;
                        score += s;
                    }
                }
            }
        }

        if !has_must && should_total > 0 && should_matched == 0 {
            return None;
        }
        if query.is_purely_negative() {
            score = CONSTANT_SCORE;
        }
        Some(score)
    }

    fn term_in_field(
        &self,
        field: &FieldTarget,
        term: &SimpleTerm,
        doc: &IndexedDocument,
    ) -> Option<f32> {
        if field.field_type != FieldType::Text {
            let values = doc.document().values(&field.path);
            let hit = values.iter().filter_map(FieldValue::as_text).any(|v| match term {
                SimpleTerm::Prefix(p) => v.starts_with(p.as_str()),
                SimpleTerm::Word(w) | SimpleTerm::Phrase(w) => v == w.as_str(),
            });
            return hit.then_some(CONSTANT_SCORE * field.boost);
        }

        let analyzed = doc.analyzed(&field.path)?;
        match term {
            SimpleTerm::Prefix(p) => {
                let prefix = p.to_lowercase();
                analyzed
                    .term_freqs
                    .keys()
                    .filter(|t| t.starts_with(&prefix))
                    .map(|t| self.term_score(field, analyzed, t))
                    .reduce(f32::max)
            }
            // Phrases are approximated by requiring every term
            SimpleTerm::Word(text) | SimpleTerm::Phrase(text) => {
                let terms = tokenize_unique(text);
                if terms.is_empty() {
                    return None;
                }
                let mut score = 0.0;
                for t in &terms {
                    if !analyzed.term_freqs.contains_key(t.as_str()) {
                        return None;
                    }
                    score += self.term_score(field, analyzed, t);
                }
                Some(score)
            }
        }
    }

    fn term_score(&self, field: &FieldTarget, analyzed: &AnalyzedField, term: &str) -> f32 {
        let tf = analyzed.term_freqs.get(term).copied().unwrap_or(0);
        let score = match self.snapshot.field_stats(&field.path) {
            Some(stats) => self.bm25.term_score(
                tf,
                analyzed.len,
                stats.idf(term, self.snapshot.len()),
                stats.avg_len(),
            ),
            None => 0.0,
        };
        score * field.boost
    }
}

fn constant(matched: bool) -> Option<f32> {
    matched.then_some(CONSTANT_SCORE)
}

fn best(scores: impl Iterator<Item = Option<f32>>) -> Option<f32> {
    scores.flatten().reduce(f32::max)
}

fn geo_points<'d>(doc: &'d Document, path: &str) -> impl Iterator<Item = &'d GeoPoint> {
    doc.values(path).iter().filter_map(FieldValue::as_geo_point)
}

fn in_range(value: &FieldValue, lower: &Bound<FieldValue>, upper: &Bound<FieldValue>) -> bool {
    let above = match lower {
        Bound::Unbounded => true,
        Bound::Included(b) => matches!(value.compare(b), Some(Ordering::Greater | Ordering::Equal)),
        Bound::Excluded(b) => value.compare(b) == Some(Ordering::Greater),
    };
    let below = match upper {
        Bound::Unbounded => true,
        Bound::Included(b) => matches!(value.compare(b), Some(Ordering::Less | Ordering::Equal)),
        Bound::Excluded(b) => value.compare(b) == Some(Ordering::Less),
    };
    above && below
}

// ============================================================================
// Sorting
// ============================================================================

/// A matched document awaiting windowing
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    /// Position of the index in the request
    pub(crate) index: usize,
    /// Position of the document in index order
    pub(crate) position: usize,
    pub(crate) score: f32,
    pub(crate) doc: Arc<IndexedDocument>,
}

impl Candidate {
    fn index_order(&self, other: &Candidate) -> Ordering {
        (self.index, self.position).cmp(&(other.index, other.position))
    }
}

/// Compare two candidates; an absent sort means score, descending
///
/// Ties fall back to index order so that results are deterministic.
pub(crate) fn compare(sort: Option<&SearchSort>, a: &Candidate, b: &Candidate) -> Ordering {
    let primary = match sort {
        None => b.score.total_cmp(&a.score),
        Some(sort) => sort
            .clauses()
            .iter()
            .map(|clause| compare_clause(clause, a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
    };
    primary.then_with(|| a.index_order(b))
}

fn compare_clause(clause: &SortClause, a: &Candidate, b: &Candidate) -> Ordering {
    match clause {
        SortClause::Score { order } => order.apply(a.score.total_cmp(&b.score)),
        SortClause::Field {
            path,
            order,
            missing,
        } => {
            let va = sort_value(a.doc.document(), path, *order, missing);
            let vb = sort_value(b.doc.document(), path, *order, missing);
            match (va, vb) {
                (Some(x), Some(y)) => order.apply(x.compare(y).unwrap_or(Ordering::Equal)),
                (None, None) => Ordering::Equal,
                (None, Some(_)) if *missing == MissingValue::First => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) if *missing == MissingValue::First => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
            }
        }
        SortClause::Distance {
            path,
            center,
            order,
        } => {
            let da = min_distance(a.doc.document(), path, center);
            let db = min_distance(b.doc.document(), path, center);
            match (da, db) {
                (Some(x), Some(y)) => order.apply(x.total_cmp(&y)),
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
            }
        }
        SortClause::IndexOrder => a.index_order(b),
    }
}

/// Value used for sorting: the smallest value ascending, the largest descending
fn sort_value<'d>(
    doc: &'d Document,
    path: &str,
    order: SortOrder,
    missing: &'d MissingValue,
) -> Option<&'d FieldValue> {
    let values = doc.values(path).iter();
    let picked = match order {
        SortOrder::Asc => values.min_by(|x, y| x.compare(y).unwrap_or(Ordering::Equal)),
        SortOrder::Desc => values.max_by(|x, y| x.compare(y).unwrap_or(Ordering::Equal)),
    };
    match (picked, missing) {
        (None, MissingValue::Use(value)) => Some(value),
        (picked, _) => picked,
    }
}

pub(crate) fn min_distance(doc: &Document, path: &str, center: &GeoPoint) -> Option<f64> {
    geo_points(doc, path)
        .map(|p| p.distance_to(center))
        .reduce(f64::min)
}
