//! HTTP fetching and site adapters.
//!
//! This crate provides:
//! - [`engine`]: Concurrency-capped fetcher with backoff retry
//! - [`adapters`]: Site-specific result resolution and profile extraction

pub mod adapters;
pub mod engine;

pub use adapters::{SiteAdapter, TruePeopleSearchAdapter};
pub use engine::{FetchedPage, Fetcher};
