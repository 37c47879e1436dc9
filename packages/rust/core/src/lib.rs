//! Pipeline orchestration and domain logic for ownertrace.
//!
//! This crate ties together input loading, search URL construction, the
//! fetch/resolve/extract chain, and CSV output into one run (`pipeline::run`).

pub mod input;
pub mod pipeline;
pub mod query;
pub mod sink;
pub mod state;

pub use pipeline::{ProgressReporter, RunSummary, SilentProgress, run, run_queries};
