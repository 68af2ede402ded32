//! Projection factory and steps
//!
//! ```ignore
//! scope.query()
//!     .select(|f| {
//!         f.composite()
//!             .from3(f.field::<String>("title"), f.score(), f.entity_reference())
//!             .as_(|title, score, reference| Hit { title, score, reference })
//!     })?
//!     .where_(|f| f.match_all())?;
//! ```

use crate::extension::{negotiate, SearchExtension};
use crate::projection::{
    Composite1, Composite2, Composite3, ConstantProjection, DistanceProjection,
    DocumentReferenceProjection, EntityProjection, EntityReferenceProjection, FieldProjection,
    FromFieldValue, IdProjection, ListComposite, MultiFieldProjection, ObjectProjection,
    ScoreProjection, SearchProjection,
};
use crate::scope::SearchScope;
use sift_core::{DocumentReference, Error, FieldType, GeoPoint, Result};
use std::marker::PhantomData;

/// Final step of any projection definition
pub trait ProjectionFinalStep<R, E> {
    /// Value produced per hit
    type Output;

    /// Produce the projection, or the first error met while building it
    fn to_projection(self) -> Result<SearchProjection<R, E, Self::Output>>;
}

impl<R, E, P> ProjectionFinalStep<R, E> for SearchProjection<R, E, P> {
    type Output = P;

    fn to_projection(self) -> Result<SearchProjection<R, E, P>> {
        Ok(self)
    }
}

impl<R, E, P> ProjectionFinalStep<R, E> for Result<SearchProjection<R, E, P>> {
    type Output = P;

    fn to_projection(self) -> Result<SearchProjection<R, E, P>> {
        self
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Entry point for building projections over references `R` and entities `E`
pub struct SearchProjectionFactory<R, E> {
    scope: SearchScope,
    _marker: PhantomData<fn() -> (R, E)>,
}

impl<R, E> Clone for SearchProjectionFactory<R, E> {
    fn clone(&self) -> Self {
        SearchProjectionFactory {
            scope: self.scope.clone(),
            _marker: PhantomData,
        }
    }
}

impl<R, E> std::fmt::Debug for SearchProjectionFactory<R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchProjectionFactory")
            .field("scope", &self.scope)
            .finish()
    }
}

impl<R, E> SearchProjectionFactory<R, E>
where
    R: Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn new(scope: SearchScope) -> Self {
        SearchProjectionFactory {
            scope,
            _marker: PhantomData,
        }
    }

    /// Scope the factory resolves fields against
    pub fn scope(&self) -> &SearchScope {
        &self.scope
    }

    /// Value of a field, `None` when the document has none
    pub fn field<T: FromFieldValue>(&self, path: &str) -> FieldProjectionStep<T> {
        let path = self.scope.resolve_field(path).and_then(|def| {
            if !def.projectable {
                return Err(Error::field_capability(path, "projections"));
            }
            if !T::accepts(def.field_type) {
                return Err(Error::invalid_input(format!(
                    "field '{}' has type {} and cannot be projected to {}",
                    path,
                    def.field_type,
                    std::any::type_name::<T>()
                )));
            }
            Ok(path.to_string())
        });
        FieldProjectionStep {
            path,
            _marker: PhantomData,
        }
    }

    /// Raw document reference
    pub fn document_reference(&self) -> SearchProjection<R, E, DocumentReference> {
        SearchProjection::new(DocumentReferenceProjection)
    }

    /// Document id
    pub fn id(&self) -> SearchProjection<R, E, String> {
        SearchProjection::new(IdProjection)
    }

    /// Application reference produced by the loading context
    pub fn entity_reference(&self) -> SearchProjection<R, E, R> {
        SearchProjection::new(EntityReferenceProjection)
    }

    /// Loaded entity; hits whose entity cannot be loaded are dropped
    pub fn entity(&self) -> SearchProjection<R, E, E> {
        SearchProjection::new(EntityProjection)
    }

    /// Relevance score
    pub fn score(&self) -> SearchProjection<R, E, f32> {
        SearchProjection::new(ScoreProjection)
    }

    /// Distance in metres from `center` to a geo point field
    pub fn distance(
        &self,
        path: &str,
        center: GeoPoint,
    ) -> Result<SearchProjection<R, E, Option<f64>>> {
        let def = self.scope.resolve_field(path)?;
        if def.field_type != FieldType::GeoPoint || !def.projectable {
            return Err(Error::field_capability(path, "distance projections"));
        }
        Ok(SearchProjection::new(DistanceProjection::new(path, center)))
    }

    /// Constant value
    pub fn constant<P>(&self, value: P) -> SearchProjection<R, E, P>
    where
        P: Clone + Send + Sync + 'static,
    {
        SearchProjection::new(ConstantProjection::new(value))
    }

    /// Combine several projections into one value per hit
    pub fn composite(&self) -> CompositeProjectionStep<R, E> {
        CompositeProjectionStep {
            _marker: PhantomData,
        }
    }

    /// Apply `inner` within an object; `None` when the document lacks the object
    pub fn object<S>(&self, path: &str, inner: S) -> Result<SearchProjection<R, E, Option<S::Output>>>
    where
        S: ProjectionFinalStep<R, E>,
        S::Output: Send + 'static,
    {
        self.scope.resolve_object(path)?;
        let inner = inner.to_projection()?;
        Ok(SearchProjection::new(ObjectProjection::new(path, inner)))
    }

    /// Negotiate a backend-specific factory
    pub fn extension<X>(&self, extension: &X) -> Result<X::Extended>
    where
        X: SearchExtension<SearchProjectionFactory<R, E>>,
    {
        negotiate(extension, self.clone(), self.scope.backend().as_ref())
    }
}

// ============================================================================
// field
// ============================================================================

/// `field::<T>()` step
#[derive(Debug)]
pub struct FieldProjectionStep<T> {
    path: Result<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromFieldValue> FieldProjectionStep<T> {
    /// Every value of the field, in stored order
    pub fn multi(self) -> MultiFieldProjectionStep<T> {
        MultiFieldProjectionStep {
            path: self.path,
            _marker: PhantomData,
        }
    }
}

impl<R, E: 'static, T: FromFieldValue> ProjectionFinalStep<R, E> for FieldProjectionStep<T> {
    type Output = Option<T>;

    fn to_projection(self) -> Result<SearchProjection<R, E, Option<T>>> {
        let path = self.path?;
        Ok(SearchProjection::new(FieldProjection::<T>::new(path)))
    }
}

/// `field::<T>().multi()` step
#[derive(Debug)]
pub struct MultiFieldProjectionStep<T> {
    path: Result<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<R, E: 'static, T: FromFieldValue> ProjectionFinalStep<R, E> for MultiFieldProjectionStep<T> {
    type Output = Vec<T>;

    fn to_projection(self) -> Result<SearchProjection<R, E, Vec<T>>> {
        let path = self.path?;
        Ok(SearchProjection::new(MultiFieldProjection::<T>::new(path)))
    }
}

// ============================================================================
// composite
// ============================================================================

/// `composite()` step: choose components
pub struct CompositeProjectionStep<R, E> {
    _marker: PhantomData<fn() -> (R, E)>,
}

impl<R: 'static, E: 'static> CompositeProjectionStep<R, E> {
    /// One component
    pub fn from<A>(self, a: A) -> CompositeFrom1Step<R, E, A::Output>
    where
        A: ProjectionFinalStep<R, E>,
    {
        CompositeFrom1Step {
            a: a.to_projection(),
        }
    }

    /// Two components
    pub fn from2<A, B>(self, a: A, b: B) -> CompositeFrom2Step<R, E, A::Output, B::Output>
    where
        A: ProjectionFinalStep<R, E>,
        B: ProjectionFinalStep<R, E>,
    {
        CompositeFrom2Step {
            a: a.to_projection(),
            b: b.to_projection(),
        }
    }

    /// Three components
    pub fn from3<A, B, C>(
        self,
        a: A,
        b: B,
        c: C,
    ) -> CompositeFrom3Step<R, E, A::Output, B::Output, C::Output>
    where
        A: ProjectionFinalStep<R, E>,
        B: ProjectionFinalStep<R, E>,
        C: ProjectionFinalStep<R, E>,
    {
        CompositeFrom3Step {
            a: a.to_projection(),
            b: b.to_projection(),
            c: c.to_projection(),
        }
    }

    /// Any number of components of the same type
    pub fn from_list<S, I>(self, components: I) -> CompositeFromListStep<R, E, S::Output>
    where
        I: IntoIterator<Item = S>,
        S: ProjectionFinalStep<R, E>,
    {
        CompositeFromListStep {
            components: components
                .into_iter()
                .map(ProjectionFinalStep::to_projection)
                .collect(),
        }
    }
}

/// Composite over one component
pub struct CompositeFrom1Step<R, E, A> {
    a: Result<SearchProjection<R, E, A>>,
}

impl<R: 'static, E: 'static, A: Send + 'static> CompositeFrom1Step<R, E, A> {
    /// Transform the component value
    pub fn as_<T, F>(self, transform: F) -> Result<SearchProjection<R, E, T>>
    where
        F: Fn(A) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        Ok(SearchProjection::new(Composite1::new(self.a?, transform)))
    }
}

/// Composite over two components
pub struct CompositeFrom2Step<R, E, A, B> {
    a: Result<SearchProjection<R, E, A>>,
    b: Result<SearchProjection<R, E, B>>,
}

impl<R, E, A, B> CompositeFrom2Step<R, E, A, B>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    B: Send + 'static,
{
    /// Transform the component values, in declaration order
    pub fn as_<T, F>(self, transform: F) -> Result<SearchProjection<R, E, T>>
    where
        F: Fn(A, B) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        Ok(SearchProjection::new(Composite2::new(
            self.a?, self.b?, transform,
        )))
    }
}

/// Composite over three components
pub struct CompositeFrom3Step<R, E, A, B, C> {
    a: Result<SearchProjection<R, E, A>>,
    b: Result<SearchProjection<R, E, B>>,
    c: Result<SearchProjection<R, E, C>>,
}

impl<R, E, A, B, C> CompositeFrom3Step<R, E, A, B, C>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    /// Transform the component values, in declaration order
    pub fn as_<T, F>(self, transform: F) -> Result<SearchProjection<R, E, T>>
    where
        F: Fn(A, B, C) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        Ok(SearchProjection::new(Composite3::new(
            self.a?, self.b?, self.c?, transform,
        )))
    }
}

/// Composite over a list of components
pub struct CompositeFromListStep<R, E, P> {
    components: Result<Vec<SearchProjection<R, E, P>>>,
}

impl<R: 'static, E: 'static, P: Send + 'static> CompositeFromListStep<R, E, P> {
    /// Transform the list of component values
    pub fn as_<T, F>(self, transform: F) -> Result<SearchProjection<R, E, T>>
    where
        F: Fn(Vec<P>) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        Ok(SearchProjection::new(ListComposite::new(
            self.components?,
            transform,
        )))
    }

    /// Keep the component values as a list
    pub fn as_list(self) -> Result<SearchProjection<R, E, Vec<P>>> {
        self.as_(|values| values)
    }
}
