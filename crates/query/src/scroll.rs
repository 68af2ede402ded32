//! Scroll cursor
//!
//! # State machine
//!
//! ```text
//! Open ──next() returns no hits──▶ Exhausted
//!   │                                  │
//!   └────────close() / drop───────────┴──▶ Closed
//! ```
//!
//! `next()` on a closed scroll fails with `Error::ScrollClosed`. On an
//! exhausted scroll it keeps returning empty chunks. A chunk left empty by a
//! truncate-after timeout is flagged `timed_out` and keeps the scroll open.
//!
//! # Total hit count
//!
//! Each chunk reports the best known total:
//! - once exact, the total stays exact
//! - otherwise it is a lower bound, never below the previous bound nor below
//!   the number of hits delivered so far

use crate::backend::BackendScroll;
use crate::loading::LoadingContext;
use crate::mapping::map_hits;
use crate::query::SearchQuery;
use sift_core::{Error, Result, SearchResultTotal};
use std::time::{Duration, Instant};
use tracing::debug;

/// Lifecycle state of a scroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    /// More chunks may follow
    Open,
    /// The last `next()` returned no hits
    Exhausted,
    /// Backend resources released
    Closed,
}

/// One chunk of a scroll
#[derive(Debug, Clone)]
pub struct SearchScrollResult<P> {
    hits: Vec<P>,
    total: SearchResultTotal,
    took: Duration,
    timed_out: bool,
}

impl<P> SearchScrollResult<P> {
    /// Hits of this chunk
    pub fn hits(&self) -> &[P] {
        &self.hits
    }

    /// Take ownership of the hits
    pub fn into_hits(self) -> Vec<P> {
        self.hits
    }

    /// Whether this chunk holds any hit
    ///
    /// `false` marks the end of the scroll unless the chunk `timed_out()`.
    pub fn has_hits(&self) -> bool {
        !self.hits.is_empty()
    }

    /// Best known total after this chunk
    pub fn total(&self) -> &SearchResultTotal {
        &self.total
    }

    /// Time spent fetching this chunk
    pub fn took(&self) -> Duration {
        self.took
    }

    /// Whether a truncate-after timeout cut this chunk short
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

/// Cursor over every hit of a query
///
/// Not meant for concurrent use: `next()` takes `&mut self`.
pub struct SearchScroll<'q, C: LoadingContext, P> {
    query: &'q SearchQuery<C, P>,
    handle: Box<dyn BackendScroll>,
    chunk_size: usize,
    state: ScrollState,
    total: Option<SearchResultTotal>,
    delivered: u64,
}

impl<'q, C: LoadingContext, P: Send + 'static> SearchScroll<'q, C, P> {
    pub(crate) fn new(
        query: &'q SearchQuery<C, P>,
        handle: Box<dyn BackendScroll>,
        chunk_size: usize,
    ) -> Self {
        debug!(target: "sift::scroll", chunk_size, "Opened scroll");
        SearchScroll {
            query,
            handle,
            chunk_size,
            state: ScrollState::Open,
            total: None,
            delivered: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Hits requested per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn merge_total(&mut self, reported: SearchResultTotal) -> SearchResultTotal {
        let merged = match self.total {
            Some(previous) if previous.is_hit_count_exact() => previous,
            _ if reported.is_hit_count_exact() => reported,
            previous => {
                let bound = previous
                    .map_or(0, |p| p.hit_count_lower_bound())
                    .max(reported.hit_count_lower_bound())
                    .max(self.delivered);
                SearchResultTotal::lower_bound(bound)
            }
        };
        self.total = Some(merged);
        merged
    }

    /// Fetch the next chunk
    ///
    /// # Errors
    ///
    /// - `ScrollClosed` after `close()`
    /// - `Timeout` if the chunk exceeds a fail-after timeout
    /// - loading context errors such as `SessionClosed`
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<SearchScrollResult<P>> {
        if self.state == ScrollState::Closed {
            return Err(Error::ScrollClosed);
        }

        let started = Instant::now();
        let deadline = self.query.timeout().map(|t| t.start());
        let raw = self.handle.next_chunk(deadline)?;
        let hits = map_hits(
            self.query.projection(),
            self.query.loading_context(),
            &raw.hits,
            deadline.as_ref(),
        )?;

        self.delivered += raw.hits.len() as u64;
        let total = self.merge_total(raw.total);
        if raw.hits.is_empty() && !raw.timed_out {
            self.state = ScrollState::Exhausted;
        }

        debug!(
            target: "sift::scroll",
            hits = hits.len(),
            delivered = self.delivered,
            total = total.hit_count_lower_bound(),
            exact = total.is_hit_count_exact(),
            timed_out = raw.timed_out,
            "Fetched scroll chunk"
        );

        Ok(SearchScrollResult {
            hits,
            total,
            took: started.elapsed(),
            timed_out: raw.timed_out,
        })
    }

    /// Release backend resources; idempotent
    pub fn close(&mut self) {
        if self.state != ScrollState::Closed {
            self.handle.close();
            self.state = ScrollState::Closed;
            debug!(
                target: "sift::scroll",
                delivered = self.delivered,
                "Closed scroll"
            );
        }
    }
}

impl<'q, C: LoadingContext, P> Drop for SearchScroll<'q, C, P> {
    fn drop(&mut self) {
        if self.state != ScrollState::Closed {
            self.handle.close();
            self.state = ScrollState::Closed;
        }
    }
}
