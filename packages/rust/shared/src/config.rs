//! Application configuration for ownertrace.
//!
//! User config lives at `~/.ownertrace/ownertrace.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OwnerTraceError, Result};
use crate::types::{ColumnSchema, ColumnVariant};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ownertrace.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ownertrace";

/// Flattened Miami-Dade property columns written by the merged schema.
const DEFAULT_SOURCE_COLUMNS: &[&str] = &[
    "property_address",
    "mailing_address",
    "primary_land_use",
    "actual_area",
    "living_area",
    "adjusted_area",
    "market_value",
    "assessed_value",
    "year_built",
    "actual_sqft",
    "living_sqft",
    "calc_value",
    "tax_1_bill",
    "tax_1_amount_due",
    "tax_1_amount_paid",
    "tax_1_status",
    "tax_2_bill",
    "tax_2_amount_due",
    "tax_2_amount_paid",
    "tax_2_status",
    "tax_3_bill",
    "tax_3_amount_due",
    "tax_3_amount_paid",
    "tax_3_status",
];

// ---------------------------------------------------------------------------
// Config structs (matching ownertrace.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Target site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Input record shape.
    #[serde(default)]
    pub input: InputConfig,

    /// Output column settings.
    #[serde(default)]
    pub columns: ColumnsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum requests in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// CSV output path, overwritten on each run.
    #[serde(default = "default_output")]
    pub output: String,

    /// Output column schema: "profile" or "merged".
    #[serde(default)]
    pub columns: ColumnVariant,

    /// Stop issuing requests after this many seconds and flush what is collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            output: default_output(),
            columns: ColumnVariant::default(),
            deadline_secs: None,
        }
    }
}

fn default_concurrency() -> u32 {
    32
}
fn default_output() -> String {
    "output.csv".into()
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP statuses treated as transient.
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// First backoff delay; doubled on every further retry.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for any single backoff delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_statuses: default_retry_statuses(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_statuses() -> Vec<u16> {
    vec![429, 503, 520]
}
fn default_base_delay() -> u64 {
    500
}
fn default_max_delay() -> u64 {
    10_000
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Search endpoint; `name` and `citystatezip` are appended as query parameters.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_search_url() -> String {
    "https://www.truepeoplesearch.com/results".into()
}
fn default_timeout() -> u64 {
    30
}

/// Where address fields live on an input record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputShape {
    /// `city`, `state`, `zipcode` at the record root.
    #[default]
    Flat,
    /// The same keys under a nested address mapping.
    Nested,
}

impl std::str::FromStr for InputShape {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "nested" => Ok(Self::Nested),
            other => Err(format!("unknown input shape '{other}': expected 'flat' or 'nested'")),
        }
    }
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub shape: InputShape,

    /// Key of the nested address mapping when `shape = "nested"`.
    #[serde(default = "default_address_key")]
    pub address_key: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            shape: InputShape::default(),
            address_key: default_address_key(),
        }
    }
}

fn default_address_key() -> String {
    "address".into()
}

/// `[columns]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    /// Flattened source keys appended to the merged schema, in order.
    #[serde(default = "default_source_columns")]
    pub source: Vec<String>,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            source: default_source_columns(),
        }
    }
}

fn default_source_columns() -> Vec<String> {
    DEFAULT_SOURCE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Retry policy handed to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// HTTP statuses treated as transient.
    pub retry_statuses: Vec<u16>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Whether `status` belongs to the transient-failure set.
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_statuses: config.retry_statuses.clone(),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Runtime enrichment configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Maximum requests in flight.
    pub concurrency: u32,
    pub retry: RetryPolicy,
    /// Search endpoint.
    pub search_url: String,
    pub request_timeout: Duration,
    pub input_shape: InputShape,
    pub address_key: String,
    pub columns: ColumnVariant,
    pub source_columns: Vec<String>,
    pub output: PathBuf,
    /// Optional wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
}

impl From<&AppConfig> for EnrichConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.concurrency,
            retry: RetryPolicy::from(&config.retry),
            search_url: config.site.search_url.clone(),
            request_timeout: Duration::from_secs(config.site.timeout_secs),
            input_shape: config.input.shape,
            address_key: config.input.address_key.clone(),
            columns: config.defaults.columns,
            source_columns: config.columns.source.clone(),
            output: PathBuf::from(&config.defaults.output),
            deadline: config.defaults.deadline_secs.map(Duration::from_secs),
        }
    }
}

impl EnrichConfig {
    /// The output column schema this configuration selects.
    pub fn column_schema(&self) -> ColumnSchema {
        ColumnSchema::new(self.columns, &self.source_columns)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(OwnerTraceError::config("concurrency must be at least 1"));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(OwnerTraceError::config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms",
            ));
        }
        Url::parse(&self.search_url).map_err(|e| {
            OwnerTraceError::config(format!("invalid search_url '{}': {e}", self.search_url))
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ownertrace/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OwnerTraceError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ownertrace/ownertrace.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OwnerTraceError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        OwnerTraceError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OwnerTraceError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OwnerTraceError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OwnerTraceError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
