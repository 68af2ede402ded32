//! Fluent DSL
//!
//! Factories for predicates, sorts and projections, and the type-state step
//! chain leading from a [`SearchScope`](crate::SearchScope) to a compiled
//! [`SearchQuery`](crate::SearchQuery).
//!
//! # Architectural Rules
//!
//! - Every step is consumed by value; illegal sequences do not type-check
//! - Field paths are resolved against the scope when the step is built; the
//!   resulting error surfaces at the call consuming the final step
//!   (`where_`, `sort`, `select`)
//! - Factories hold a clone of the scope, never a borrow

pub mod predicate;
pub mod projection;
pub mod query;
pub mod sort;

use crate::predicate::FieldTarget;
use crate::scope::SearchScope;
use sift_core::{Error, FieldDefinition, FieldValue, Result};

/// Resolve a field usable in predicates
pub(crate) fn searchable_field(scope: &SearchScope, path: &str) -> Result<FieldTarget> {
    let def = scope.resolve_field(path)?;
    if !def.searchable {
        return Err(Error::field_capability(path, "predicates"));
    }
    Ok(FieldTarget::new(path, def.field_type))
}

/// Resolve a field usable in sorts
pub(crate) fn sortable_field(scope: &SearchScope, path: &str) -> Result<FieldDefinition> {
    let def = scope.resolve_field(path)?;
    if !def.sortable {
        return Err(Error::field_capability(path, "sorting"));
    }
    Ok(def)
}

/// Check a predicate value against the field type
pub(crate) fn check_value(target: &FieldTarget, value: &FieldValue) -> Result<()> {
    if target.field_type.accepts(value) {
        Ok(())
    } else {
        Err(Error::invalid_input(format!(
            "field '{}' has type {} and cannot be compared with a {} value",
            target.path,
            target.field_type,
            value.type_name()
        )))
    }
}
