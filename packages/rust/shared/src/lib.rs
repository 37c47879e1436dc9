//! Shared types, error model, and configuration for ownertrace.
//!
//! This crate is the foundation depended on by all other ownertrace crates.
//! It provides:
//! - [`OwnerTraceError`]: the unified error type
//! - Domain types ([`Query`], [`ProfileFields`], [`ProfileRecord`], [`ColumnSchema`])
//! - Configuration ([`AppConfig`], [`EnrichConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ColumnsConfig, DefaultsConfig, EnrichConfig, InputConfig, InputShape, RetryConfig,
    RetryPolicy, SiteConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{OwnerTraceError, Result};
pub use types::{
    ColumnSchema, ColumnVariant, FlatRecord, MERGE_PRECEDENCE, MergePrecedence, Outcome,
    PHONE_SLOTS, PROFILE_COLUMNS, ProfileFields, ProfileRecord, Query,
};
