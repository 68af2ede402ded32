//! Backend scrolls
//!
//! Two strategies, chosen when the scroll is opened:
//! - [`IndexOrderScroll`]: lazy; each chunk resumes the scan where the
//!   previous one stopped. Under a threshold the total starts as a lower
//!   bound and graduates to exact once the scan reaches the end of the last
//!   index.
//! - [`SortedScroll`]: eager; every match is collected and sorted at open,
//!   chunks are slices of that list and the total is always exact.
//!
//! Both read the snapshots taken at open and never observe later flushes.
//! The work done at open runs under the request deadline: a fail-after
//! expiration fails the open, a truncate-after one leaves a lower-bound
//! total and flags the first chunk as timed out.

use crate::collector::{scan, to_raw_hit, ScanCursor, ScanOutcome};
use crate::eval::{compare, Candidate};
use crate::index::IndexSnapshot;
use sift_core::{Deadline, Error, Result, SearchResultTotal};
use sift_query::{
    BackendScroll, RawHit, RawSearchResult, SearchPredicate, SearchRequest, TotalHitCountTracking,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

// ============================================================================
// IndexOrderScroll
// ============================================================================

/// Lazy scroll over documents in index order
pub struct IndexOrderScroll {
    snapshots: Vec<Arc<IndexSnapshot>>,
    predicate: SearchPredicate,
    backend: String,
    cursor: ScanCursor,
    chunk_size: usize,
    counted: SearchResultTotal,
    delivered: u64,
    truncated_at_open: bool,
    finished: bool,
    closed: bool,
}

impl IndexOrderScroll {
    pub(crate) fn open(
        snapshots: Vec<Arc<IndexSnapshot>>,
        request: SearchRequest,
        backend: &str,
        chunk_size: usize,
    ) -> Result<Self> {
        let limit = match request.total_tracking {
            TotalHitCountTracking::Exact => Some(usize::MAX),
            TotalHitCountTracking::Threshold(t) => {
                Some(usize::try_from(t).unwrap_or(usize::MAX).saturating_add(1))
            }
            TotalHitCountTracking::Skip => None,
        };

        let mut truncated_at_open = false;
        let counted = match limit {
            Some(limit) => {
                let mut count = 0usize;
                let outcome = scan(
                    &snapshots,
                    &request.predicate,
                    backend,
                    &mut ScanCursor::default(),
                    request.deadline.as_ref(),
                    |_| {
                        count += 1;
                        count < limit
                    },
                )?;
                truncated_at_open = outcome == ScanOutcome::TimedOut;
                if outcome == ScanOutcome::Finished {
                    SearchResultTotal::exact(count as u64)
                } else {
                    SearchResultTotal::lower_bound(count as u64)
                }
            }
            None => SearchResultTotal::lower_bound(0),
        };

        debug!(
            target: "sift::engine",
            chunk_size,
            counted = counted.hit_count_lower_bound(),
            exact = counted.is_hit_count_exact(),
            truncated = truncated_at_open,
            "Opened index-order scroll"
        );

        Ok(IndexOrderScroll {
            snapshots,
            predicate: request.predicate,
            backend: backend.to_string(),
            cursor: ScanCursor::default(),
            chunk_size,
            counted,
            delivered: 0,
            truncated_at_open,
            finished: false,
            closed: false,
        })
    }

    fn total(&self) -> SearchResultTotal {
        if self.finished {
            SearchResultTotal::exact(self.delivered)
        } else if self.counted.is_hit_count_exact() {
            self.counted
        } else {
            SearchResultTotal::lower_bound(self.counted.hit_count_lower_bound().max(self.delivered))
        }
    }
}

impl BackendScroll for IndexOrderScroll {
    fn next_chunk(&mut self, deadline: Option<Deadline>) -> Result<RawSearchResult> {
        if self.closed {
            return Err(Error::ScrollClosed);
        }
        let started = Instant::now();
        let mut chunk: Vec<Candidate> = Vec::new();
        let mut timed_out = std::mem::take(&mut self.truncated_at_open);

        if !self.finished {
            let chunk_size = self.chunk_size;
            let outcome = scan(
                &self.snapshots,
                &self.predicate,
                &self.backend,
                &mut self.cursor,
                deadline.as_ref(),
                |candidate| {
                    chunk.push(candidate);
                    chunk.len() < chunk_size
                },
            )?;
            self.delivered += chunk.len() as u64;
            match outcome {
                ScanOutcome::Finished => {
                    self.finished = true;
                    debug!(
                        target: "sift::engine",
                        total = self.delivered,
                        "Index-order scroll reached the end"
                    );
                }
                ScanOutcome::TimedOut => timed_out = true,
                ScanOutcome::Stopped => {}
            }
        }

        let hits: Vec<RawHit> = chunk.iter().map(|c| to_raw_hit(&self.snapshots, c)).collect();
        Ok(RawSearchResult {
            hits,
            total: self.total(),
            took: started.elapsed(),
            timed_out,
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(target: "sift::engine", delivered = self.delivered, "Closed index-order scroll");
        }
    }
}

// ============================================================================
// SortedScroll
// ============================================================================

/// Eager scroll over every match, sorted at open
pub struct SortedScroll {
    hits: Vec<RawHit>,
    position: usize,
    chunk_size: usize,
    total: SearchResultTotal,
    truncated_at_open: bool,
    closed: bool,
}

impl SortedScroll {
    pub(crate) fn open(
        snapshots: Vec<Arc<IndexSnapshot>>,
        request: SearchRequest,
        backend: &str,
        chunk_size: usize,
    ) -> Result<Self> {
        let mut matches: Vec<Candidate> = Vec::new();
        let outcome = scan(
            &snapshots,
            &request.predicate,
            backend,
            &mut ScanCursor::default(),
            request.deadline.as_ref(),
            |candidate| {
                matches.push(candidate);
                true
            },
        )?;
        matches.sort_by(|a, b| compare(request.sort.as_ref(), a, b));
        let hits: Vec<RawHit> = matches.iter().map(|c| to_raw_hit(&snapshots, c)).collect();

        // a truncated collection only knows the matches it reached
        let truncated_at_open = outcome == ScanOutcome::TimedOut;
        let total = if truncated_at_open {
            SearchResultTotal::lower_bound(hits.len() as u64)
        } else {
            SearchResultTotal::exact(hits.len() as u64)
        };

        debug!(
            target: "sift::engine",
            chunk_size,
            total = hits.len(),
            truncated = truncated_at_open,
            "Opened sorted scroll"
        );

        Ok(SortedScroll {
            hits,
            position: 0,
            chunk_size,
            total,
            truncated_at_open,
            closed: false,
        })
    }
}

impl BackendScroll for SortedScroll {
    fn next_chunk(&mut self, deadline: Option<Deadline>) -> Result<RawSearchResult> {
        if self.closed {
            return Err(Error::ScrollClosed);
        }
        if let Some(deadline) = deadline.filter(|d| d.is_expired() && d.fails_on_expiration()) {
            return Err(deadline.to_error());
        }
        let started = Instant::now();
        let end = self.position.saturating_add(self.chunk_size).min(self.hits.len());
        let hits = self.hits[self.position..end].to_vec();
        self.position = end;
        Ok(RawSearchResult {
            hits,
            total: self.total,
            took: started.elapsed(),
            timed_out: std::mem::take(&mut self.truncated_at_open),
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(target: "sift::engine", position = self.position, "Closed sorted scroll");
        }
    }
}
