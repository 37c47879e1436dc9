//! End-to-end enrichment run: input → search → profile → CSV.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use ownertrace_crawler::{Fetcher, SiteAdapter, TruePeopleSearchAdapter};
use ownertrace_shared::{
    EnrichConfig, FlatRecord, Outcome, OwnerTraceError, ProfileRecord, Query, Result,
};

use crate::input::{InputOptions, load_queries};
use crate::query::build_url;
use crate::sink::ResultSink;
use crate::state::PipelineState;

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Queries derived from the input.
    pub total_queries: usize,
    /// Results pages resolved (match, no match, or terminal failure).
    pub processed: usize,
    pub matched: usize,
    pub no_match: usize,
    /// Queries that ended in a network, status, or extraction failure.
    pub failed: usize,
    /// Queries cut off by the deadline; absent from the output.
    pub abandoned: usize,
    /// Rows written to the CSV.
    pub written: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as queries complete.
    fn query_done(&self, processed: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn query_done(&self, _processed: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full pipeline on the records in `input`.
///
/// 1. Load and flatten input records into queries
/// 2. Fetch each query's results page and follow the first profile link
/// 3. Extract profile fields, or emit a placeholder row
/// 4. Write every collected row to the configured CSV
///
/// Only unreadable input, bad configuration, and a failed final write
/// are returned as errors; per-query failures become placeholder rows.
pub async fn run(
    config: &EnrichConfig,
    input: &Path,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    config.validate()?;

    progress.phase("Loading input");
    let queries = load_queries(input, &InputOptions::from(config))?;

    run_queries(config, queries, Arc::new(TruePeopleSearchAdapter), progress).await
}

/// Run the pipeline over already-built queries with a given site adapter.
#[instrument(skip_all, fields(run_id = %Uuid::now_v7(), adapter = adapter.name()))]
pub async fn run_queries(
    config: &EnrichConfig,
    queries: Vec<Query>,
    adapter: Arc<dyn SiteAdapter>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let deadline = config.deadline.map(|d| tokio::time::Instant::now() + d);

    let endpoint = Url::parse(&config.search_url).map_err(|e| {
        OwnerTraceError::config(format!("invalid search_url '{}': {e}", config.search_url))
    })?;
    let fetcher = Arc::new(Fetcher::new(
        config.concurrency,
        config.retry.clone(),
        config.request_timeout,
    )?);

    let schema = config.column_schema();
    let merge_source = schema.merges_source();
    let mut sink = ResultSink::new(schema, &config.output);
    let state = Arc::new(PipelineState::new(queries.len()));

    info!(
        queries = queries.len(),
        concurrency = config.concurrency,
        max_retries = config.retry.max_retries,
        output = %config.output.display(),
        "starting run"
    );

    // --- Fan out: one task per query, throttled by the fetcher ---
    progress.phase("Searching");
    let mut tasks = JoinSet::new();
    for query in queries {
        let (name, url) = build_url(&endpoint, &query);
        let source = merge_source.then_some(query.source);
        tasks.spawn(resolve_query(
            fetcher.clone(),
            adapter.clone(),
            state.clone(),
            name,
            url,
            source,
        ));
    }

    // --- Collect in completion order ---
    let mut summary = RunSummary {
        total_queries: state.total_queries(),
        ..RunSummary::default()
    };

    loop {
        let next = match deadline {
            Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                Ok(next) => next,
                Err(_) => {
                    summary.abandoned = tasks.len();
                    warn!(
                        abandoned = summary.abandoned,
                        "deadline reached, stopping and keeping collected rows"
                    );
                    tasks.abort_all();
                    break;
                }
            },
            None => tasks.join_next().await,
        };

        let Some(joined) = next else { break };

        match joined {
            Ok(record) => {
                match record.outcome {
                    Outcome::Matched => summary.matched += 1,
                    Outcome::NoMatch => summary.no_match += 1,
                    Outcome::Failed => summary.failed += 1,
                }
                sink.collect(record);
            }
            Err(e) => {
                warn!(error = %e, "query task did not complete");
                summary.abandoned += 1;
            }
        }

        progress.query_done(sink.len(), summary.total_queries);
    }

    // --- Write ---
    progress.phase("Writing results");
    summary.written = sink.flush()?;
    summary.processed = state.processed();
    summary.elapsed = start.elapsed();

    progress.done(&summary);

    info!(
        total = summary.total_queries,
        matched = summary.matched,
        no_match = summary.no_match,
        failed = summary.failed,
        abandoned = summary.abandoned,
        written = summary.written,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Per-query chain
// ---------------------------------------------------------------------------

/// Resolve one query: results page, then (at most) one profile page.
///
/// Never fails; every terminal problem becomes a placeholder row.
async fn resolve_query(
    fetcher: Arc<Fetcher>,
    adapter: Arc<dyn SiteAdapter>,
    state: Arc<PipelineState>,
    name: String,
    url: Url,
    source: Option<FlatRecord>,
) -> ProfileRecord {
    let results = fetcher.get(&url).await;

    let (processed, remaining) = state.search_resolved();
    info!(processed, remaining, "results page resolved");

    let profile_url = match results {
        Ok(page) => adapter.resolve_page(&page.body, &page.url),
        Err(e) => {
            warn!(%name, error = %e, "search failed");
            return ProfileRecord::placeholder(&name, source, Outcome::Failed);
        }
    };

    let Some(profile_url) = profile_url else {
        info!(%name, "no match, skipped");
        return ProfileRecord::placeholder(&name, source, Outcome::NoMatch);
    };

    debug!(%name, %profile_url, "following first result");

    let page = match fetcher.get(&profile_url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(%name, %profile_url, error = %e, "profile fetch failed");
            return ProfileRecord::placeholder(&name, source, Outcome::Failed);
        }
    };

    match adapter.extract_page(&page.body) {
        Ok(fields) => ProfileRecord::matched(fields, source),
        Err(e) => {
            warn!(%name, %profile_url, error = %e, "profile extraction failed");
            ProfileRecord::placeholder(&name, source, Outcome::Failed)
        }
    }
}
