//! Projections: what each hit turns into
//!
//! A projection runs in two phases so that entity loading can be batched
//! across the whole window:
//!
//! 1. `extract` reads the raw hit and plans any loading on the mapper,
//!    returning a [`PendingHit`]
//! 2. after a single `load` call, each pending hit is resolved against the
//!    [`LoadingResult`]
//!
//! A pending hit resolving to `None` means "drop this hit": its entity could
//! not be loaded. Composites drop the whole hit when any component drops.

use crate::backend::RawHit;
use crate::loading::{LoadingResult, ProjectionHitMapper};
use sift_core::{DocumentReference, FieldType, FieldValue, GeoPoint, Result};
use smallvec::SmallVec;
use std::marker::PhantomData;
use std::sync::Arc;

/// Second phase of a projection, resolved once entities are loaded
pub type PendingHit<E, P> = Box<dyn FnOnce(&LoadingResult<E>) -> Option<P> + Send>;

/// A projection over hits with reference type `R` and entity type `E`
pub trait ProjectionSpec<R, E>: Send + Sync {
    /// Value produced per hit
    type Output;

    /// First phase: read the hit and plan loading
    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, Self::Output>>;
}

/// Type-erased, shareable projection producing `P`
pub struct SearchProjection<R, E, P> {
    inner: Arc<dyn ProjectionSpec<R, E, Output = P>>,
}

impl<R, E, P> Clone for SearchProjection<R, E, P> {
    fn clone(&self) -> Self {
        SearchProjection {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, E, P> std::fmt::Debug for SearchProjection<R, E, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchProjection")
            .field("output", &std::any::type_name::<P>())
            .finish()
    }
}

impl<R, E, P> SearchProjection<R, E, P> {
    /// Erase a concrete projection
    pub fn new<S>(spec: S) -> Self
    where
        S: ProjectionSpec<R, E, Output = P> + 'static,
    {
        SearchProjection {
            inner: Arc::new(spec),
        }
    }
}

impl<R, E, P> ProjectionSpec<R, E> for SearchProjection<R, E, P> {
    type Output = P;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, P>> {
        self.inner.extract(hit, mapper)
    }
}

// ============================================================================
// FromFieldValue
// ============================================================================

/// Conversion from stored field values to projected Rust values
pub trait FromFieldValue: Sized + Send + 'static {
    /// Check whether fields of this type can be projected to `Self`
    fn accepts(field_type: FieldType) -> bool;

    /// Convert one value; `None` if it does not fit
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl FromFieldValue for String {
    fn accepts(field_type: FieldType) -> bool {
        matches!(field_type, FieldType::Text | FieldType::Keyword)
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

impl FromFieldValue for i64 {
    fn accepts(field_type: FieldType) -> bool {
        field_type == FieldType::Integer
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromFieldValue for i32 {
    fn accepts(field_type: FieldType) -> bool {
        field_type == FieldType::Integer
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(i) => i32::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromFieldValue for f64 {
    fn accepts(field_type: FieldType) -> bool {
        field_type.is_numeric()
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromFieldValue for bool {
    fn accepts(field_type: FieldType) -> bool {
        field_type == FieldType::Boolean
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromFieldValue for GeoPoint {
    fn accepts(field_type: FieldType) -> bool {
        field_type == FieldType::GeoPoint
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_geo_point().copied()
    }
}

impl FromFieldValue for FieldValue {
    fn accepts(_field_type: FieldType) -> bool {
        true
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        Some(value.clone())
    }
}

fn ready<E: 'static, P: Send + 'static>(value: P) -> PendingHit<E, P> {
    Box::new(move |_: &LoadingResult<E>| Some(value))
}

// ============================================================================
// Leaf projections
// ============================================================================

/// First value of a field
pub struct FieldProjection<T> {
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FieldProjection<T> {
    /// Create a projection on a resolved field path
    pub fn new(path: impl Into<String>) -> Self {
        FieldProjection {
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

impl<R, E: 'static, T: FromFieldValue> ProjectionSpec<R, E> for FieldProjection<T> {
    type Output = Option<T>;

    fn extract(
        &self,
        hit: &RawHit,
        _mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, Option<T>>> {
        let value = hit.document.first(&self.path).and_then(T::from_field_value);
        Ok(ready(value))
    }
}

/// Every value of a multi-valued field
pub struct MultiFieldProjection<T> {
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MultiFieldProjection<T> {
    /// Create a projection on a resolved field path
    pub fn new(path: impl Into<String>) -> Self {
        MultiFieldProjection {
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

impl<R, E: 'static, T: FromFieldValue> ProjectionSpec<R, E> for MultiFieldProjection<T> {
    type Output = Vec<T>;

    fn extract(
        &self,
        hit: &RawHit,
        _mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, Vec<T>>> {
        let values: Vec<T> = hit
            .document
            .values(&self.path)
            .iter()
            .filter_map(T::from_field_value)
            .collect();
        Ok(ready(values))
    }
}

/// Raw document reference
pub struct DocumentReferenceProjection;

impl<R, E: 'static> ProjectionSpec<R, E> for DocumentReferenceProjection {
    type Output = DocumentReference;

    fn extract(
        &self,
        hit: &RawHit,
        _mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, DocumentReference>> {
        Ok(ready(hit.reference.clone()))
    }
}

/// Document id
pub struct IdProjection;

impl<R, E: 'static> ProjectionSpec<R, E> for IdProjection {
    type Output = String;

    fn extract(
        &self,
        hit: &RawHit,
        _mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, String>> {
        Ok(ready(hit.reference.id().to_string()))
    }
}

/// Application reference, converted by the mapper
pub struct EntityReferenceProjection;

impl<R: Send + 'static, E: 'static> ProjectionSpec<R, E> for EntityReferenceProjection {
    type Output = R;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, R>> {
        Ok(ready(mapper.convert_reference(&hit.reference)))
    }
}

/// Loaded entity; drops the hit if loading fails
pub struct EntityProjection;

impl<R, E: Clone + 'static> ProjectionSpec<R, E> for EntityProjection {
    type Output = E;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, E>> {
        let key = mapper.plan_loading(&hit.reference);
        Ok(Box::new(move |loaded: &LoadingResult<E>| {
            loaded.get(key).cloned()
        }))
    }
}

/// Relevance score
pub struct ScoreProjection;

impl<R, E: 'static> ProjectionSpec<R, E> for ScoreProjection {
    type Output = f32;

    fn extract(
        &self,
        hit: &RawHit,
        _mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, f32>> {
        Ok(ready(hit.score))
    }
}

/// Distance in metres from a point to the closest value of a geo field
pub struct DistanceProjection {
    path: String,
    center: GeoPoint,
}

impl DistanceProjection {
    /// Create a projection on a resolved geo point field
    pub fn new(path: impl Into<String>, center: GeoPoint) -> Self {
        DistanceProjection {
            path: path.into(),
            center,
        }
    }
}

impl<R, E: 'static> ProjectionSpec<R, E> for DistanceProjection {
    type Output = Option<f64>;

    fn extract(
        &self,
        hit: &RawHit,
        _mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, Option<f64>>> {
        let distance = hit
            .document
            .values(&self.path)
            .iter()
            .filter_map(FieldValue::as_geo_point)
            .map(|p| self.center.distance_to(p))
            .fold(None, |min: Option<f64>, d| {
                Some(min.map_or(d, |m| m.min(d)))
            });
        Ok(ready(distance))
    }
}

/// Constant value, useful as a composite placeholder
pub struct ConstantProjection<P> {
    value: P,
}

impl<P> ConstantProjection<P> {
    /// Create a projection always producing `value`
    pub fn new(value: P) -> Self {
        ConstantProjection { value }
    }
}

impl<R, E: 'static, P: Clone + Send + Sync + 'static> ProjectionSpec<R, E> for ConstantProjection<P> {
    type Output = P;

    fn extract(
        &self,
        _hit: &RawHit,
        _mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, P>> {
        Ok(ready(self.value.clone()))
    }
}

// ============================================================================
// Composite projections
// ============================================================================

/// Projection of an object field, `None` when the document has no such object
pub struct ObjectProjection<R, E, P> {
    path: String,
    inner: SearchProjection<R, E, P>,
}

impl<R, E, P> ObjectProjection<R, E, P> {
    /// Wrap an inner projection on an object path
    pub fn new(path: impl Into<String>, inner: SearchProjection<R, E, P>) -> Self {
        ObjectProjection {
            path: path.into(),
            inner,
        }
    }
}

impl<R, E, P> ProjectionSpec<R, E> for ObjectProjection<R, E, P>
where
    R: 'static,
    E: 'static,
    P: Send + 'static,
{
    type Output = Option<P>;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, Option<P>>> {
        if !hit.document.has_object(&self.path) {
            return Ok(Box::new(|_: &LoadingResult<E>| Some(None)));
        }
        let pending = self.inner.extract(hit, mapper)?;
        Ok(Box::new(move |loaded: &LoadingResult<E>| {
            pending(loaded).map(Some)
        }))
    }
}

type ListTransformer<P, T> = Arc<dyn Fn(Vec<P>) -> T + Send + Sync>;

/// Homogeneous composite over any number of components
pub struct ListComposite<R, E, P, T> {
    components: Vec<SearchProjection<R, E, P>>,
    transform: ListTransformer<P, T>,
}

impl<R, E, P, T> ListComposite<R, E, P, T> {
    /// Combine components with a transformer
    pub fn new<F>(components: Vec<SearchProjection<R, E, P>>, transform: F) -> Self
    where
        F: Fn(Vec<P>) -> T + Send + Sync + 'static,
    {
        ListComposite {
            components,
            transform: Arc::new(transform),
        }
    }
}

impl<R, E, P, T> ProjectionSpec<R, E> for ListComposite<R, E, P, T>
where
    R: 'static,
    E: 'static,
    P: Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, T>> {
        let mut pending: SmallVec<[PendingHit<E, P>; 4]> = SmallVec::new();
        for component in &self.components {
            pending.push(component.extract(hit, mapper)?);
        }
        let transform = Arc::clone(&self.transform);
        Ok(Box::new(move |loaded: &LoadingResult<E>| {
            let mut values = Vec::with_capacity(pending.len());
            for p in pending {
                values.push(p(loaded)?);
            }
            Some(transform(values))
        }))
    }
}

/// Composite over one component
pub struct Composite1<R, E, A, T> {
    a: SearchProjection<R, E, A>,
    transform: Arc<dyn Fn(A) -> T + Send + Sync>,
}

impl<R, E, A, T> Composite1<R, E, A, T> {
    /// Combine one component with a transformer
    pub fn new<F>(a: SearchProjection<R, E, A>, transform: F) -> Self
    where
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Composite1 {
            a,
            transform: Arc::new(transform),
        }
    }
}

impl<R, E, A, T> ProjectionSpec<R, E> for Composite1<R, E, A, T>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, T>> {
        let a = self.a.extract(hit, mapper)?;
        let transform = Arc::clone(&self.transform);
        Ok(Box::new(move |loaded: &LoadingResult<E>| {
            Some(transform(a(loaded)?))
        }))
    }
}

/// Composite over two components
pub struct Composite2<R, E, A, B, T> {
    a: SearchProjection<R, E, A>,
    b: SearchProjection<R, E, B>,
    transform: Arc<dyn Fn(A, B) -> T + Send + Sync>,
}

impl<R, E, A, B, T> Composite2<R, E, A, B, T> {
    /// Combine two components with a transformer
    pub fn new<F>(a: SearchProjection<R, E, A>, b: SearchProjection<R, E, B>, transform: F) -> Self
    where
        F: Fn(A, B) -> T + Send + Sync + 'static,
    {
        Composite2 {
            a,
            b,
            transform: Arc::new(transform),
        }
    }
}

impl<R, E, A, B, T> ProjectionSpec<R, E> for Composite2<R, E, A, B, T>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    B: Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, T>> {
        let a = self.a.extract(hit, mapper)?;
        let b = self.b.extract(hit, mapper)?;
        let transform = Arc::clone(&self.transform);
        Ok(Box::new(move |loaded: &LoadingResult<E>| {
            Some(transform(a(loaded)?, b(loaded)?))
        }))
    }
}

/// Composite over three components
pub struct Composite3<R, E, A, B, C, T> {
    a: SearchProjection<R, E, A>,
    b: SearchProjection<R, E, B>,
    c: SearchProjection<R, E, C>,
    transform: Arc<dyn Fn(A, B, C) -> T + Send + Sync>,
}

impl<R, E, A, B, C, T> Composite3<R, E, A, B, C, T> {
    /// Combine three components with a transformer
    pub fn new<F>(
        a: SearchProjection<R, E, A>,
        b: SearchProjection<R, E, B>,
        c: SearchProjection<R, E, C>,
        transform: F,
    ) -> Self
    where
        F: Fn(A, B, C) -> T + Send + Sync + 'static,
    {
        Composite3 {
            a,
            b,
            c,
            transform: Arc::new(transform),
        }
    }
}

impl<R, E, A, B, C, T> ProjectionSpec<R, E> for Composite3<R, E, A, B, C, T>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn extract(
        &self,
        hit: &RawHit,
        mapper: &mut dyn ProjectionHitMapper<R, E>,
    ) -> Result<PendingHit<E, T>> {
        let a = self.a.extract(hit, mapper)?;
        let b = self.b.extract(hit, mapper)?;
        let c = self.c.extract(hit, mapper)?;
        let transform = Arc::clone(&self.transform);
        Ok(Box::new(move |loaded: &LoadingResult<E>| {
            Some(transform(a(loaded)?, b(loaded)?, c(loaded)?))
        }))
    }
}
