//! Hit mapping: raw hits to projected values
//!
//! Shared by `fetch*` and scroll chunks. Every call obtains a fresh mapper
//! from the loading context, extracts all hits, loads once, then resolves.

use crate::backend::RawHit;
use crate::loading::LoadingContext;
use crate::projection::{ProjectionSpec, SearchProjection};
use sift_core::{Deadline, Result};
use tracing::debug;

/// Map a window of raw hits through a projection
///
/// Hits whose projection resolves to nothing (unloadable entities) are
/// silently dropped; relative order of the remaining hits is preserved.
///
/// # Errors
///
/// - errors from `create_projection_hit_mapper` (e.g. `SessionClosed`)
/// - `Error::Timeout` if a fail-after deadline expires during loading
pub(crate) fn map_hits<C, P>(
    projection: &SearchProjection<C::Reference, C::Entity, P>,
    context: &C,
    hits: &[RawHit],
    deadline: Option<&Deadline>,
) -> Result<Vec<P>>
where
    C: LoadingContext,
{
    let mut mapper = context.create_projection_hit_mapper()?;
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let mut pending = Vec::with_capacity(hits.len());
    for hit in hits {
        pending.push(projection.extract(hit, mapper.as_mut())?);
    }

    let loaded = mapper.load(deadline)?;
    if let Some(deadline) = deadline {
        if deadline.is_expired() && deadline.fails_on_expiration() {
            return Err(deadline.to_error());
        }
    }

    let mut values = Vec::with_capacity(pending.len());
    for resolve in pending {
        if let Some(value) = resolve(&loaded) {
            values.push(value);
        }
    }

    let dropped = hits.len() - values.len();
    if dropped > 0 {
        debug!(
            target: "sift::query",
            dropped,
            kept = values.len(),
            "Dropped hits whose entities could not be loaded"
        );
    }
    Ok(values)
}
