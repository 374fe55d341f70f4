//! Integration test suite for chart-render
//!
//! End-to-end tests that render real chart directories through the public API
//! and the `chart-render` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **render**: the fixture chart through the default collaborators
//! - **cache**: key strategies, TTL and copy isolation
//! - **concurrency**: exactly-once chart loading under parallel callers
//! - **errors**: validation, fail-fast, retry after failure, cancellation
//! - **dependencies**: sub-chart conditions, tags and aliases
//! - **engine**: aggregation of renderers with engine-level post-processing
//! - **cli**: the `render` and `validate` commands

#[path = "../common/mod.rs"]
mod common;

mod cache;
mod cli;
mod concurrency;
mod dependencies;
mod engine;
mod errors;
mod render;
