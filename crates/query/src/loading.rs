//! Loading contexts and projection hit mappers
//!
//! Turning raw hits into caller-visible values takes up to three stages:
//!
//! ```text
//! DocumentReference ──convert_reference──▶ Reference ──load (batched)──▶ Entity
//! ```
//!
//! The mapper layer owns these stages through three traits:
//! - [`LoadingContextBuilder`]: mutable, carries caller options; built once by `to_query()`
//! - [`LoadingContext`]: held by the compiled query; hands out a fresh mapper per execution
//! - [`ProjectionHitMapper`]: lives for one execution (or one scroll chunk)
//!
//! # Silent drop
//!
//! An entity that cannot be loaded is absent from the [`LoadingResult`];
//! the hit referring to it is then dropped from the result list. This is not
//! an error.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sift_core::{Deadline, DocumentReference, Error, Result};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Keys and results
// ============================================================================

/// Handle to an entity planned for loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadingKey(usize);

impl LoadingKey {
    /// Create a key from a slot position
    pub fn new(slot: usize) -> Self {
        LoadingKey(slot)
    }

    /// Slot position
    pub fn slot(&self) -> usize {
        self.0
    }
}

/// Entities loaded for one execution, addressed by [`LoadingKey`]
#[derive(Debug, Clone)]
pub struct LoadingResult<E> {
    slots: Vec<Option<E>>,
}

impl<E> LoadingResult<E> {
    /// Create a result from slots, one per planned key
    pub fn new(slots: Vec<Option<E>>) -> Self {
        LoadingResult { slots }
    }

    /// Result of an execution that planned nothing
    pub fn empty() -> Self {
        LoadingResult { slots: Vec::new() }
    }

    /// Loaded entity, or `None` if it could not be loaded
    pub fn get(&self, key: LoadingKey) -> Option<&E> {
        self.slots.get(key.0).and_then(Option::as_ref)
    }

    /// Number of planned slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing was planned
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots that could not be loaded
    pub fn missing(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Per-execution coordinator of reference conversion and entity loading
///
/// Projections call `convert_reference` and `plan_loading` while extracting
/// hits; the pipeline then calls `load` exactly once with every planned
/// reference of the window.
pub trait ProjectionHitMapper<R, E> {
    /// Turn a raw reference into the application reference type
    fn convert_reference(&mut self, reference: &DocumentReference) -> R;

    /// Register a reference for loading
    fn plan_loading(&mut self, reference: &DocumentReference) -> LoadingKey;

    /// Load every planned reference at once
    fn load(&mut self, deadline: Option<&Deadline>) -> Result<LoadingResult<E>>;
}

/// Loading side of a compiled query
///
/// # Fresh mapper per execution
///
/// `create_projection_hit_mapper` is called by every `fetch*` call and every
/// scroll chunk. Implementations re-validate session state there; the query
/// never caches a mapper.
pub trait LoadingContext: Send + Sync {
    /// Application reference type
    type Reference: Send + 'static;
    /// Loaded entity type
    type Entity: Clone + Send + 'static;

    /// Create a mapper for one execution
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` (or any other error) if loading is no
    /// longer possible.
    fn create_projection_hit_mapper(
        &self,
    ) -> Result<Box<dyn ProjectionHitMapper<Self::Reference, Self::Entity> + '_>>;
}

/// Mutable loading configuration attached to a query under construction
pub trait LoadingContextBuilder {
    /// Context produced by `build`
    type Context: LoadingContext;
    /// Caller-visible options
    type Options;

    /// Options exposed to `loading(|options| ...)`
    fn options_mut(&mut self) -> &mut Self::Options;

    /// Freeze options into a context; called by `to_query()`
    fn build(self) -> Self::Context;
}

/// Reference type produced by a loading builder
pub type ReferenceOf<L> = <<L as LoadingContextBuilder>::Context as LoadingContext>::Reference;

/// Entity type produced by a loading builder
pub type EntityOf<L> = <<L as LoadingContextBuilder>::Context as LoadingContext>::Entity;

// ============================================================================
// LoadingOptions
// ============================================================================

/// Free-form options bag handed to entity loaders
///
/// The pipeline never interprets these options; only loaders do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadingOptions {
    values: Map<String, Value>,
}

/// Well-known key: preferred batch size for loaders that fetch in batches
pub const FETCH_SIZE: &str = "fetch_size";

impl LoadingOptions {
    /// Create an empty bag
    pub fn new() -> Self {
        LoadingOptions::default()
    }

    /// Set an option
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Raw option value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Option value deserialized into `T`; `None` if absent or of another shape
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set the preferred loader batch size
    pub fn fetch_size(&mut self, size: usize) -> &mut Self {
        self.set(FETCH_SIZE, size)
    }

    /// Preferred loader batch size
    pub fn fetch_size_value(&self) -> Option<usize> {
        self.get_as(FETCH_SIZE)
    }

    /// Check if no option was set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// NoLoading
// ============================================================================

/// Loading builder for scopes without a mapper layer
///
/// References and entities are both the raw [`DocumentReference`]; nothing
/// is ever dropped.
#[derive(Debug, Clone, Default)]
pub struct NoLoading {
    options: LoadingOptions,
}

impl NoLoading {
    /// Create a builder
    pub fn new() -> Self {
        NoLoading::default()
    }
}

/// Context built from [`NoLoading`]
#[derive(Debug, Clone, Default)]
pub struct NoLoadingContext {
    options: LoadingOptions,
}

impl NoLoadingContext {
    /// Options frozen at `to_query()`
    pub fn options(&self) -> &LoadingOptions {
        &self.options
    }
}

impl LoadingContextBuilder for NoLoading {
    type Context = NoLoadingContext;
    type Options = LoadingOptions;

    fn options_mut(&mut self) -> &mut LoadingOptions {
        &mut self.options
    }

    fn build(self) -> NoLoadingContext {
        NoLoadingContext {
            options: self.options,
        }
    }
}

impl LoadingContext for NoLoadingContext {
    type Reference = DocumentReference;
    type Entity = DocumentReference;

    fn create_projection_hit_mapper(
        &self,
    ) -> Result<Box<dyn ProjectionHitMapper<DocumentReference, DocumentReference> + '_>> {
        Ok(Box::new(ReferenceHitMapper::default()))
    }
}

#[derive(Debug, Default)]
struct ReferenceHitMapper {
    planned: Vec<DocumentReference>,
}

impl ProjectionHitMapper<DocumentReference, DocumentReference> for ReferenceHitMapper {
    fn convert_reference(&mut self, reference: &DocumentReference) -> DocumentReference {
        reference.clone()
    }

    fn plan_loading(&mut self, reference: &DocumentReference) -> LoadingKey {
        self.planned.push(reference.clone());
        LoadingKey(self.planned.len() - 1)
    }

    fn load(&mut self, _deadline: Option<&Deadline>) -> Result<LoadingResult<DocumentReference>> {
        let planned = std::mem::take(&mut self.planned);
        Ok(LoadingResult::new(planned.into_iter().map(Some).collect()))
    }
}

// ============================================================================
// MapperLoading
// ============================================================================

/// Batch entity loader supplied by the mapper layer
///
/// Receives every reference planned in the current window or chunk at once
/// and returns the entities it found. References missing from the map drop
/// their hits.
pub trait EntityLoader<R, E>: Send + Sync {
    /// Load a batch of references
    fn load(
        &self,
        references: &[R],
        options: &LoadingOptions,
        deadline: Option<&Deadline>,
    ) -> Result<HashMap<R, E>>;
}

impl<R, E, F> EntityLoader<R, E> for F
where
    F: Fn(&[R], &LoadingOptions, Option<&Deadline>) -> Result<HashMap<R, E>> + Send + Sync,
{
    fn load(
        &self,
        references: &[R],
        options: &LoadingOptions,
        deadline: Option<&Deadline>,
    ) -> Result<HashMap<R, E>> {
        self(references, options, deadline)
    }
}

/// Liveness flag of a mapper-layer session
///
/// Cloning shares the flag. Once closed, every loading context built from
/// the session refuses to create hit mappers.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    open: Arc<AtomicBool>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    /// Create an open session
    pub fn new() -> Self {
        SessionHandle {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Check if the session is open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the session
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

type ReferenceTransformer<R> = Arc<dyn Fn(&DocumentReference) -> R + Send + Sync>;

/// Loading builder backed by a reference transformer and a batch loader
pub struct MapperLoading<R, E> {
    session: SessionHandle,
    transformer: ReferenceTransformer<R>,
    loader: Arc<dyn EntityLoader<R, E>>,
    options: LoadingOptions,
}

impl<R, E> MapperLoading<R, E> {
    /// Create a builder
    pub fn new<T, L>(session: SessionHandle, transformer: T, loader: L) -> Self
    where
        T: Fn(&DocumentReference) -> R + Send + Sync + 'static,
        L: EntityLoader<R, E> + 'static,
    {
        MapperLoading {
            session,
            transformer: Arc::new(transformer),
            loader: Arc::new(loader),
            options: LoadingOptions::default(),
        }
    }

    /// Create a builder sharing an existing loader
    pub fn with_shared_loader<T>(
        session: SessionHandle,
        transformer: T,
        loader: Arc<dyn EntityLoader<R, E>>,
    ) -> Self
    where
        T: Fn(&DocumentReference) -> R + Send + Sync + 'static,
    {
        MapperLoading {
            session,
            transformer: Arc::new(transformer),
            loader,
            options: LoadingOptions::default(),
        }
    }
}

/// Context built from [`MapperLoading`]
pub struct MapperLoadingContext<R, E> {
    session: SessionHandle,
    transformer: ReferenceTransformer<R>,
    loader: Arc<dyn EntityLoader<R, E>>,
    options: LoadingOptions,
}

impl<R, E> MapperLoadingContext<R, E> {
    /// Options frozen at `to_query()`
    pub fn options(&self) -> &LoadingOptions {
        &self.options
    }
}

impl<R, E> LoadingContextBuilder for MapperLoading<R, E>
where
    R: Clone + Eq + Hash + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    type Context = MapperLoadingContext<R, E>;
    type Options = LoadingOptions;

    fn options_mut(&mut self) -> &mut LoadingOptions {
        &mut self.options
    }

    fn build(self) -> MapperLoadingContext<R, E> {
        MapperLoadingContext {
            session: self.session,
            transformer: self.transformer,
            loader: self.loader,
            options: self.options,
        }
    }
}

impl<R, E> LoadingContext for MapperLoadingContext<R, E>
where
    R: Clone + Eq + Hash + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    type Reference = R;
    type Entity = E;

    fn create_projection_hit_mapper(&self) -> Result<Box<dyn ProjectionHitMapper<R, E> + '_>> {
        if !self.session.is_open() {
            return Err(Error::SessionClosed);
        }
        Ok(Box::new(MapperHitMapper {
            context: self,
            planned: Vec::new(),
        }))
    }
}

struct MapperHitMapper<'c, R, E> {
    context: &'c MapperLoadingContext<R, E>,
    planned: Vec<R>,
}

impl<'c, R, E> ProjectionHitMapper<R, E> for MapperHitMapper<'c, R, E>
where
    R: Clone + Eq + Hash + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    fn convert_reference(&mut self, reference: &DocumentReference) -> R {
        (self.context.transformer)(reference)
    }

    fn plan_loading(&mut self, reference: &DocumentReference) -> LoadingKey {
        let converted = (self.context.transformer)(reference);
        self.planned.push(converted);
        LoadingKey(self.planned.len() - 1)
    }

    fn load(&mut self, deadline: Option<&Deadline>) -> Result<LoadingResult<E>> {
        let planned = std::mem::take(&mut self.planned);
        if planned.is_empty() {
            return Ok(LoadingResult::empty());
        }
        if !self.context.session.is_open() {
            return Err(Error::SessionClosed);
        }

        let loaded = match self
            .context
            .loader
            .load(&planned, &self.context.options, deadline)
        {
            Ok(map) => map,
            Err(e) if e.is_timeout() => return Err(e),
            Err(e) => {
                warn!(
                    target: "sift::query",
                    error = %e,
                    references = planned.len(),
                    "Entity loading failed, dropping affected hits"
                );
                HashMap::new()
            }
        };

        let slots: Vec<Option<E>> = planned.iter().map(|r| loaded.get(r).cloned()).collect();
        let result = LoadingResult::new(slots);
        debug!(
            target: "sift::query",
            planned = result.len(),
            missing = result.missing(),
            "Loaded entities"
        );
        Ok(result)
    }
}
