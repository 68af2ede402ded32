//! Query pipeline configuration via `sift.toml`
//!
//! All keys are optional; a missing file or an empty file yields the
//! defaults. Unknown keys are rejected so that typos do not silently fall
//! back to defaults.

use crate::error::{Error, Result};
use crate::timeout::{TimeoutKind, TimeoutPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sift.toml";

/// Default maximum for `offset + limit`
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

/// Default maximum number of clauses in one boolean predicate
pub const DEFAULT_MAX_CLAUSE_COUNT: usize = 1024;

/// Query pipeline configuration
///
/// # Example
///
/// ```toml
/// max_result_window = 10000
/// max_clause_count = 1024
/// # default_total_hit_count_threshold = 1000
/// # default_timeout_ms = 500
/// # default_timeout_kind = "truncate"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Upper bound for `offset + limit` in a single fetch
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,
    /// Upper bound for clauses in a single boolean predicate
    #[serde(default = "default_max_clause_count")]
    pub max_clause_count: usize,
    /// Threshold applied when a query does not set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_total_hit_count_threshold: Option<u64>,
    /// Timeout applied when a query does not set one, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    /// Behaviour of the default timeout: `"fail"` or `"truncate"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_kind: Option<TimeoutKind>,
}

fn default_max_result_window() -> usize {
    DEFAULT_MAX_RESULT_WINDOW
}

fn default_max_clause_count() -> usize {
    DEFAULT_MAX_CLAUSE_COUNT
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
            max_clause_count: DEFAULT_MAX_CLAUSE_COUNT,
            default_total_hit_count_threshold: None,
            default_timeout_ms: None,
            default_timeout_kind: None,
        }
    }
}

impl SearchConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on syntax errors, unknown keys, or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SearchConfig =
            toml::from_str(text).map_err(|e| Error::config(format!("invalid {}: {}", CONFIG_FILE_NAME, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(SearchConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_result_window == 0 {
            return Err(Error::config("max_result_window must be greater than zero"));
        }
        if self.max_clause_count == 0 {
            return Err(Error::config("max_clause_count must be greater than zero"));
        }
        if self.default_timeout_kind.is_some() && self.default_timeout_ms.is_none() {
            return Err(Error::config(
                "default_timeout_kind is set but default_timeout_ms is missing",
            ));
        }
        Ok(())
    }

    /// Timeout policy applied to queries that do not configure one
    ///
    /// The kind defaults to `fail` when only the duration is given.
    pub fn default_timeout(&self) -> Option<TimeoutPolicy> {
        self.default_timeout_ms.map(|ms| TimeoutPolicy {
            duration: Duration::from_millis(ms),
            kind: self.default_timeout_kind.unwrap_or(TimeoutKind::Fail),
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Sift query configuration
#
# Maximum value of offset + limit for a single fetch (default: 10000).
# Larger windows must be iterated with scroll().
max_result_window = 10000

# Maximum number of clauses in a single boolean predicate (default: 1024).
max_clause_count = 1024

# Stop counting hits exactly past this many matches (default: unset, always exact).
# default_total_hit_count_threshold = 1000

# Timeout applied to every query that does not set its own (default: unset).
# default_timeout_ms = 500
# default_timeout_kind = "truncate"   # or "fail"
"#
    }
}
