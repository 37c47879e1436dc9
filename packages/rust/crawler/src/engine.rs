//! Concurrency-limited HTTP fetcher with backoff retry.
//!
//! Every request goes through one shared [`Fetcher`]: a fair semaphore caps
//! the number of attempts in flight, and transient failures (network errors
//! or a status in the policy's retry set) are retried with bounded
//! exponential backoff before being reported as terminal.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use url::Url;

use ownertrace_shared::{OwnerTraceError, Result, RetryPolicy};

/// User-Agent string for outgoing requests.
const USER_AGENT: &str = concat!("ownertrace/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// FetchedPage
// ---------------------------------------------------------------------------

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against this.
    pub url: Url,
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Outcome of a single attempt.
enum AttemptError {
    /// Worth another attempt if the policy allows.
    Transient(OwnerTraceError),
    /// Never retried.
    Terminal(OwnerTraceError),
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Shared HTTP fetcher enforcing the concurrency cap and retry policy.
pub struct Fetcher {
    client: Client,
    limiter: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Create a fetcher allowing at most `concurrency` requests in flight.
    pub fn new(concurrency: u32, policy: RetryPolicy, timeout: Duration) -> Result<Self> {
        if concurrency == 0 {
            return Err(OwnerTraceError::config("concurrency must be at least 1"));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| OwnerTraceError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            limiter: Arc::new(Semaphore::new(concurrency as usize)),
            policy,
        })
    }

    /// Requests currently allowed to start without waiting.
    pub fn available_slots(&self) -> usize {
        self.limiter.available_permits()
    }

    /// GET `url`, retrying transient failures per the policy.
    ///
    /// A permit is held only for the duration of one attempt; backoff sleeps
    /// do not occupy a concurrency slot. Waiters are served in FIFO order.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn get(&self, url: &Url) -> Result<FetchedPage> {
        let mut retries = 0;

        loop {
            match self.attempt(url, retries + 1).await {
                Ok(page) => return Ok(page),
                Err(AttemptError::Transient(err)) if retries < self.policy.max_retries => {
                    let delay = self.policy.backoff(retries);
                    warn!(
                        %url,
                        retry = retries + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(AttemptError::Transient(err)) => {
                    warn!(%url, attempts = retries + 1, error = %err, "giving up after retries");
                    return Err(err);
                }
                Err(AttemptError::Terminal(err)) => return Err(err),
            }
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        attempt: u32,
    ) -> std::result::Result<FetchedPage, AttemptError> {
        let _permit = self.limiter.acquire().await.map_err(|_| {
            AttemptError::Terminal(OwnerTraceError::Network("request limiter closed".into()))
        })?;

        debug!(%url, attempt, "fetching");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AttemptError::Transient(OwnerTraceError::Network(format!("{url}: {e}"))))?;

        let status = response.status();
        let status_code = status.as_u16();

        if !status.is_success() {
            let err = OwnerTraceError::HttpStatus {
                url: url.to_string(),
                status: status_code,
            };
            return Err(if self.policy.is_retryable(status_code) {
                AttemptError::Transient(err)
            } else {
                AttemptError::Terminal(err)
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| {
            AttemptError::Transient(OwnerTraceError::Network(format!(
                "{url}: body read failed: {e}"
            )))
        })?;

        Ok(FetchedPage {
            url: final_url,
            status: status_code,
            body,
            attempts: attempt,
        })
    }
}
