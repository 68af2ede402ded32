//! Total hit count
//!
//! A backend may stop counting exactly once a total-hit-count threshold is
//! exceeded, or when a truncating timeout expires. The total is then only a
//! lower bound, and asking for the exact value is an error: callers must
//! check [`SearchResultTotal::is_hit_count_exact`] first or use
//! [`SearchResultTotal::hit_count_lower_bound`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Total number of hits matched by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultTotal {
    count: u64,
    exact: bool,
}

impl SearchResultTotal {
    /// An exact total
    pub fn exact(count: u64) -> Self {
        SearchResultTotal { count, exact: true }
    }

    /// A lower bound on the total
    pub fn lower_bound(count: u64) -> Self {
        SearchResultTotal {
            count,
            exact: false,
        }
    }

    /// The exact total
    ///
    /// # Errors
    ///
    /// Returns [`Error::InexactHitCount`] if only a lower bound is known.
    pub fn hit_count(&self) -> Result<u64> {
        if self.exact {
            Ok(self.count)
        } else {
            Err(Error::InexactHitCount {
                lower_bound: self.count,
            })
        }
    }

    /// A lower bound on the total; equal to the total when exact
    pub fn hit_count_lower_bound(&self) -> u64 {
        self.count
    }

    /// Check whether the total is exact
    pub fn is_hit_count_exact(&self) -> bool {
        self.exact
    }

    /// Check whether the total is only a lower bound
    pub fn is_hit_count_lower_bound(&self) -> bool {
        !self.exact
    }
}
