//! Windowed hit collection
//!
//! Documents are scanned in index order, index by index, and matches are
//! fed to a visitor. The deadline is polled every
//! [`DEADLINE_CHECK_INTERVAL`] documents: a fail-after deadline aborts with
//! `Error::Timeout`, a truncate-after deadline stops the scan and keeps what
//! was collected.
//!
//! # Early termination
//!
//! When the request sorts by index order, collection order is result order
//! and scanning may stop once the window is filled:
//! - `Skip`: as soon as `offset + limit` matches are found
//! - `Threshold(t)`: once the window is filled and more than `t` matches
//!   were counted; the total becomes a lower bound
//! - `Exact`: never

use crate::eval::{compare, Candidate, Evaluator};
use crate::index::IndexSnapshot;
use sift_core::{Deadline, DocumentReference, Result, SearchResultTotal};
use sift_query::{RawHit, RawSearchResult, SearchPredicate, SearchRequest, TotalHitCountTracking};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Number of documents scanned between two deadline checks
pub const DEADLINE_CHECK_INTERVAL: usize = 16;

/// Position of a scan across the indexes of a request
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ScanCursor {
    index: usize,
    position: usize,
}

/// Why a scan returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanOutcome {
    /// Every document was visited
    Finished,
    /// The visitor asked to stop
    Stopped,
    /// A truncate-after deadline expired
    TimedOut,
}

/// Scan from `cursor`, feeding matches to `visit` until it returns `false`
pub(crate) fn scan<F>(
    snapshots: &[Arc<IndexSnapshot>],
    predicate: &SearchPredicate,
    backend: &str,
    cursor: &mut ScanCursor,
    deadline: Option<&Deadline>,
    mut visit: F,
) -> Result<ScanOutcome>
where
    F: FnMut(Candidate) -> bool,
{
    let mut scanned = 0usize;
    while let Some(snapshot) = snapshots.get(cursor.index) {
        let evaluator = Evaluator::new(snapshot, backend);
        while let Some(doc) = snapshot.documents().get(cursor.position) {
            if scanned % DEADLINE_CHECK_INTERVAL == 0 {
                if let Some(deadline) = deadline.filter(|d| d.is_expired()) {
                    if deadline.fails_on_expiration() {
                        debug!(target: "sift::engine", scanned, "Search exceeded fail-after timeout");
                        return Err(deadline.to_error());
                    }
                    debug!(target: "sift::engine", scanned, "Search truncated by timeout");
                    return Ok(ScanOutcome::TimedOut);
                }
            }
            scanned += 1;

            let position = cursor.position;
            cursor.position += 1;
            if let Some(score) = evaluator.score(predicate, doc)? {
                let candidate = Candidate {
                    index: cursor.index,
                    position,
                    score,
                    doc: Arc::clone(doc),
                };
                if !visit(candidate) {
                    return Ok(ScanOutcome::Stopped);
                }
            }
        }
        cursor.index += 1;
        cursor.position = 0;
    }
    Ok(ScanOutcome::Finished)
}

/// Convert a candidate into the hit handed to the pipeline
pub(crate) fn to_raw_hit(snapshots: &[Arc<IndexSnapshot>], candidate: &Candidate) -> RawHit {
    let index = snapshots
        .get(candidate.index)
        .map_or("", |s| s.name());
    RawHit {
        reference: DocumentReference::new(index, candidate.doc.id()),
        score: candidate.score,
        document: Arc::clone(candidate.doc.document()),
    }
}

fn early_termination(request: &SearchRequest) -> Option<usize> {
    if !request.is_index_order() {
        return None;
    }
    let window_end = request.window_end()?;
    match request.total_tracking {
        TotalHitCountTracking::Exact => None,
        TotalHitCountTracking::Skip => Some(window_end),
        TotalHitCountTracking::Threshold(threshold) => {
            let beyond = usize::try_from(threshold).unwrap_or(usize::MAX).saturating_add(1);
            Some(window_end.max(beyond))
        }
    }
}

/// Execute a request against snapshots taken by the caller
pub(crate) fn collect(
    snapshots: &[Arc<IndexSnapshot>],
    request: &SearchRequest,
    backend: &str,
) -> Result<RawSearchResult> {
    let started = Instant::now();
    let stop_after = early_termination(request);
    let mut matches: Vec<Candidate> = Vec::new();
    let mut cursor = ScanCursor::default();

    let outcome = scan(
        snapshots,
        &request.predicate,
        backend,
        &mut cursor,
        request.deadline.as_ref(),
        |candidate| {
            matches.push(candidate);
            stop_after.map_or(true, |n| matches.len() < n)
        },
    )?;

    let matched = matches.len() as u64;
    let total = match outcome {
        ScanOutcome::Finished => SearchResultTotal::exact(matched),
        ScanOutcome::Stopped | ScanOutcome::TimedOut => SearchResultTotal::lower_bound(matched),
    };
    if !request.is_index_order() {
        matches.sort_by(|a, b| compare(request.sort.as_ref(), a, b));
    }

    let hits: Vec<RawHit> = matches
        .iter()
        .skip(request.offset)
        .take(request.limit.unwrap_or(usize::MAX))
        .map(|c| to_raw_hit(snapshots, c))
        .collect();

    debug!(
        target: "sift::engine",
        matched,
        returned = hits.len(),
        outcome = ?outcome,
        "Collected hits"
    );

    Ok(RawSearchResult {
        hits,
        total,
        took: started.elapsed(),
        timed_out: outcome == ScanOutcome::TimedOut,
    })
}
