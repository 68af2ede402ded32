//! Query Pipeline Test Suite
//!
//! End-to-end tests of the query pipeline against the in-memory backend.
//!
//! ## Test Tier Structure
//!
//! - **Tier 1: DSL Validation** (errors at the step that introduced them)
//! - **Tier 2: Fetch Semantics** (windows, counts, single hit)
//! - **Tier 3: Scroll** (chunking, total hit count state machine, close)
//! - **Tier 4: Loading** (entity loading, missing entities, sessions)
//! - **Tier 5: Timeouts** (fail-after and truncate-after)
//! - **Tier 6: Projections and Sorts** (hit mapping, result order)
//! - **Tier 7: Property-Based** (window and scroll invariants)
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test query_pipeline
//!
//! # Run specific tier
//! cargo test --test query_pipeline tier3
//! ```

mod test_utils;

// Tier 1: DSL Validation
mod tier1_dsl_validation;

// Tier 2: Fetch Semantics
mod tier2_fetch;



// Tier 5: Timeouts
mod tier5_timeouts;

// Tier 6: Projections and Sorts
mod tier6_projections;

// Tier 7: Property-Based
mod tier7_properties;
