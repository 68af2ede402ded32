//! Backend extension negotiation
//!
//! Any DSL object (factory, step, query) can be handed to an extension,
//! which inspects the backend and either produces a richer, backend-specific
//! variant or declines. Declining is always reported as
//! `Error::UnsupportedExtension` at the `extension()` call; there is no
//! fallback to the portable object.

use crate::backend::SearchBackend;
use sift_core::{Error, Result};

/// Outcome of an extension negotiation
pub enum Negotiation<X, O> {
    /// The backend supports the extension
    Supported(X),
    /// The backend does not; the original object is handed back
    Unsupported(O),
}

/// A backend-specific extension of a portable DSL object `O`
pub trait SearchExtension<O> {
    /// Extended variant of `O`
    type Extended;

    /// Try to extend `original` for `backend`
    fn extend_optional(&self, original: O, backend: &dyn SearchBackend)
        -> Negotiation<Self::Extended, O>;
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Negotiate and turn a refusal into an error
pub(crate) fn negotiate<O, X>(
    extension: &X,
    original: O,
    backend: &dyn SearchBackend,
) -> Result<X::Extended>
where
    X: SearchExtension<O>,
{
    match extension.extend_optional(original, backend) {
        Negotiation::Supported(extended) => Ok(extended),
        Negotiation::Unsupported(_) => Err(Error::UnsupportedExtension {
            extension: short_type_name::<X>().to_string(),
            backend: backend.name().to_string(),
        }),
    }
}
