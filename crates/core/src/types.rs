//! Core types for Sift
//!
//! This module defines the foundational types:
//! - DocumentReference: raw identity of an indexed document (index + id)
//! - GeoPoint: latitude/longitude pair with great-circle distance
//! - FieldValue: value stored in a document field
//! - Document: field path to values mapping, populated at indexing time

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Mean Earth radius used for distance computations, in metres
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

// ============================================================================
// DocumentReference
// ============================================================================

/// Raw reference to an indexed document
///
/// This is what a backend returns for every hit, before any reference
/// transformation or entity loading takes place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentReference {
    index: String,
    id: String,
}

impl DocumentReference {
    /// Create a new reference
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        DocumentReference {
            index: index.into(),
            id: id.into(),
        }
    }

    /// Name of the index holding the document
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Document identifier within its index
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.id)
    }
}

// ============================================================================
// GeoPoint
// ============================================================================

/// A point on the Earth's surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another point, in metres (haversine)
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Check whether this point lies in the box spanned by two corners
    pub fn is_within_box(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> bool {
        let lat_ok =
            self.latitude <= top_left.latitude && self.latitude >= bottom_right.latitude;
        let lon_ok = if top_left.longitude <= bottom_right.longitude {
            self.longitude >= top_left.longitude && self.longitude <= bottom_right.longitude
        } else {
            // Box crosses the antimeridian
            self.longitude >= top_left.longitude || self.longitude <= bottom_right.longitude
        };
        lat_ok && lon_ok
    }
}

// ============================================================================
// FieldValue
// ============================================================================

/// Value of a single document field
///
/// Numeric variants compare with each other; every other variant only
/// compares with itself. Geo points have no natural order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// UTF-8 text (analyzed or keyword depending on the field type)
    Text(String),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Double(f64),
    /// Boolean
    Boolean(bool),
    /// Geographic point
    GeoPoint(GeoPoint),
}

impl FieldValue {
    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::GeoPoint(_) => "geo_point",
        }
    }

    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Geo point content
    pub fn as_geo_point(&self) -> Option<&GeoPoint> {
        match self {
            FieldValue::GeoPoint(p) => Some(p),
            _ => None,
        }
    }

    /// Compare two values of compatible types
    ///
    /// Returns `None` for incomparable combinations (text vs number, geo points).
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Double(d) => write!(f, "{}", d),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::GeoPoint(p) => write!(f, "({}, {})", p.latitude, p.longitude),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i as i64)
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::Integer(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        FieldValue::Double(d)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<GeoPoint> for FieldValue {
    fn from(p: GeoPoint) -> Self {
        FieldValue::GeoPoint(p)
    }
}

// ============================================================================
// Document
// ============================================================================

/// Stored document: dotted field path to values
///
/// Object fields are flattened into dotted paths (`author.name`).
/// Multi-valued fields keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: BTreeMap<String, Vec<FieldValue>>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Document::default()
    }

    /// Append a value to a field
    pub fn add(&mut self, path: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.fields
            .entry(path.into())
            .or_default()
            .push(value.into());
        self
    }

    /// All values of a field (empty slice when absent)
    pub fn values(&self, path: &str) -> &[FieldValue] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of a field
    pub fn first(&self, path: &str) -> Option<&FieldValue> {
        self.values(path).first()
    }

    /// Check whether a field has at least one value
    pub fn contains(&self, path: &str) -> bool {
        !self.values(path).is_empty()
    }

    /// Check whether any field lives under an object path
    pub fn has_object(&self, path: &str) -> bool {
        let prefix = format!("{}.", path);
        self.fields
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .any(|(_, v)| !v.is_empty())
    }

    /// Iterate over all fields
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[FieldValue])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of populated fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
