//! Index schemas
//!
//! A schema declares which field paths an index holds, their type, and what
//! each field may be used for. The query DSL validates every field reference
//! against the schemas of the targeted indexes before a query is compiled.
//!
//! Object fields are dotted paths: declaring `author.name` implicitly
//! declares the object `author`.

use crate::error::{Error, Result};
use crate::types::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// FieldType
// ============================================================================

/// Type of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Analyzed full-text field
    Text,
    /// Exact-match string field
    Keyword,
    /// 64-bit integer
    Integer,
    /// 64-bit floating point
    Double,
    /// Boolean
    Boolean,
    /// Latitude/longitude point
    GeoPoint,
}

impl FieldType {
    /// Check if a value can be stored in a field of this type
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldType::Text, FieldValue::Text(_))
                | (FieldType::Keyword, FieldValue::Text(_))
                | (FieldType::Integer, FieldValue::Integer(_))
                | (FieldType::Double, FieldValue::Double(_))
                | (FieldType::Double, FieldValue::Integer(_))
                | (FieldType::Boolean, FieldValue::Boolean(_))
                | (FieldType::GeoPoint, FieldValue::GeoPoint(_))
        )
    }

    /// Check if values of this type have a total order usable in ranges and sorts
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            FieldType::Keyword | FieldType::Integer | FieldType::Double | FieldType::Boolean
        )
    }

    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Double)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::GeoPoint => "geo_point",
        };
        f.write_str(name)
    }
}

// ============================================================================
// FieldDefinition
// ============================================================================

/// Declaration of one field: type plus capabilities
///
/// Fields are searchable and projectable by default; sorting must be
/// requested explicitly, as it requires doc-values in real backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field type
    pub field_type: FieldType,
    /// Usable in predicates
    pub searchable: bool,
    /// Usable in sorts
    pub sortable: bool,
    /// Usable in field projections
    pub projectable: bool,
}

impl FieldDefinition {
    /// Create a definition with default capabilities
    pub fn new(field_type: FieldType) -> Self {
        FieldDefinition {
            field_type,
            searchable: true,
            sortable: false,
            projectable: true,
        }
    }

    /// Analyzed text field
    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    /// Keyword field
    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    /// Integer field
    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    /// Double field
    pub fn double() -> Self {
        Self::new(FieldType::Double)
    }

    /// Boolean field
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Geo point field
    pub fn geo_point() -> Self {
        Self::new(FieldType::GeoPoint)
    }

    /// Builder: allow sorting
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Builder: forbid projection
    pub fn not_projectable(mut self) -> Self {
        self.projectable = false;
        self
    }

    /// Builder: forbid predicates
    pub fn not_searchable(mut self) -> Self {
        self.searchable = false;
        self
    }
}

// ============================================================================
// IndexSchema
// ============================================================================

/// Schema of one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    name: String,
    fields: BTreeMap<String, FieldDefinition>,
}

impl IndexSchema {
    /// Start building a schema for the named index
    pub fn builder(name: impl Into<String>) -> IndexSchemaBuilder {
        IndexSchemaBuilder {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a field
    pub fn field(&self, path: &str) -> Option<&FieldDefinition> {
        self.fields.get(path)
    }

    /// Check whether some field lives under the given object path
    pub fn has_object(&self, path: &str) -> bool {
        let prefix = format!("{}.", path);
        self.fields.keys().any(|k| k.starts_with(&prefix))
    }

    /// Iterate over declared fields
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Validate a value against the declared field
    pub fn validate_value(&self, path: &str, value: &FieldValue) -> Result<()> {
        let def = self.field(path).ok_or_else(|| Error::UnknownField {
            field: path.to_string(),
            indexes: vec![self.name.clone()],
        })?;
        if !def.field_type.accepts(value) {
            return Err(Error::invalid_input(format!(
                "field '{}' of index '{}' has type {} and cannot hold a {} value",
                path,
                self.name,
                def.field_type,
                value.type_name()
            )));
        }
        Ok(())
    }
}

/// Builder for [`IndexSchema`]
#[derive(Debug, Clone)]
pub struct IndexSchemaBuilder {
    name: String,
    fields: BTreeMap<String, FieldDefinition>,
}

impl IndexSchemaBuilder {
    /// Declare a field
    pub fn field(mut self, path: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(path.into(), definition);
        self
    }

    /// Finish the schema
    ///
    /// # Errors
    ///
    /// Returns an error if the index name is empty, or if a path is both a
    /// field and an object (`author` and `author.name`).
    pub fn build(self) -> Result<IndexSchema> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("index name must not be empty"));
        }
        for path in self.fields.keys() {
            if path.is_empty() || path.starts_with('.') || path.ends_with('.') {
                return Err(Error::invalid_input(format!(
                    "invalid field path '{}' in index '{}'",
                    path, self.name
                )));
            }
            let prefix = format!("{}.", path);
            if self.fields.keys().any(|k| k.starts_with(&prefix)) {
                return Err(Error::invalid_input(format!(
                    "'{}' is declared both as a field and as an object in index '{}'",
                    path, self.name
                )));
            }
        }
        Ok(IndexSchema {
            name: self.name,
            fields: self.fields,
        })
    }
}
