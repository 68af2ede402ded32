//! Timeout policies and deadlines
//!
//! A query carries at most one [`TimeoutPolicy`]:
//! - `Fail`: expiration raises [`Error::Timeout`]; partial work is discarded
//! - `Truncate`: expiration returns what was collected so far, flagged `timed_out`
//!
//! Each execution turns the policy into a [`Deadline`] started at the
//! beginning of that execution.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// What happens when the timeout expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutKind {
    /// Raise a timeout error
    Fail,
    /// Return partial results with `timed_out` set
    Truncate,
}

/// Timeout configured on a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    /// Time allowed for one execution
    pub duration: Duration,
    /// Behaviour on expiration
    pub kind: TimeoutKind,
}

impl TimeoutPolicy {
    /// Fail after the given duration
    pub fn fail_after(duration: Duration) -> Self {
        TimeoutPolicy {
            duration,
            kind: TimeoutKind::Fail,
        }
    }

    /// Truncate after the given duration
    pub fn truncate_after(duration: Duration) -> Self {
        TimeoutPolicy {
            duration,
            kind: TimeoutKind::Truncate,
        }
    }

    /// Start a deadline for one execution
    pub fn start(&self) -> Deadline {
        Deadline {
            policy: *self,
            started: Instant::now(),
        }
    }
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TimeoutKind::Fail => write!(f, "fail_after({:?})", self.duration),
            TimeoutKind::Truncate => write!(f, "truncate_after({:?})", self.duration),
        }
    }
}

/// A running timeout for one execution
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    policy: TimeoutPolicy,
    started: Instant,
}

impl Deadline {
    /// The policy this deadline enforces
    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Time elapsed since the execution started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiration (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.policy.duration.saturating_sub(self.elapsed())
    }

    /// Check whether the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.policy.duration
    }

    /// Check whether expiration should fail the execution
    pub fn fails_on_expiration(&self) -> bool {
        self.policy.kind == TimeoutKind::Fail
    }

    /// Error to raise on expiration under the fail policy
    pub fn to_error(&self) -> Error {
        Error::Timeout {
            timeout: self.policy.duration,
            elapsed: self.elapsed(),
        }
    }
}
