//! Listing retrieval
//!
//! Fetchers never fail from the caller's point of view: after the configured
//! attempts are exhausted the failure is logged and an empty string returned,
//! which extracts to zero records.

use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for a single HTTP request
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request; some listing hosts reject unknown agents
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Retry policy for HTTP retrieval
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64,
    /// Upper bound on the delay in milliseconds
    pub max_backoff_ms: u64,
    /// Delay multiplier applied after every retry (1.0 keeps it fixed)
    pub backoff_multiplier: f64,
    /// Add 0-50% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10_000,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Default policy with a custom attempt count
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Delay to wait after a failed attempt, given the current base delay
    fn sleep_for(&self, backoff_ms: u64) -> Duration {
        let ms = if self.jitter && backoff_ms > 1 {
            backoff_ms + rand::thread_rng().gen_range(0..=(backoff_ms / 2))
        } else {
            backoff_ms
        };
        Duration::from_millis(ms)
    }

    fn next_backoff(&self, backoff_ms: u64) -> u64 {
        std::cmp::min(
            (backoff_ms as f64 * self.backoff_multiplier) as u64,
            self.max_backoff_ms,
        )
    }
}

/// Retrieves the raw text of a listing
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the listing text, or an empty string if it could not be read
    async fn fetch(&self, location: &str) -> String;
}

/// HTTP(S) fetcher with retry
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout, user agent and retry policy
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_HTTP_TIMEOUT, RetryConfig::default())
    }

    /// Create a fetcher with a custom request timeout and retry policy
    pub fn with_config(timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client, retry })
    }

    /// Retry policy in use
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// One GET request; non-success statuses count as failures
    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Http(format!("status {} for {}", status, url)));
        }
        Ok(response.text().await?)
    }

    /// Fetch with retry, surfacing the last error instead of degrading
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt once all attempts have failed.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let attempts = self.retry.max_attempts.max(1);
        let mut backoff_ms = self.retry.initial_backoff_ms;
        let mut attempt = 1;

        loop {
            match self.get_once(url).await {
                Ok(text) => {
                    debug!("Fetched {} bytes from {}", text.len(), url);
                    return Ok(text);
                }
                Err(e) if attempt < attempts => {
                    let sleep = self.retry.sleep_for(backoff_ms);
                    warn!(
                        "Fetch of {} failed (attempt {}/{}), retrying in {}ms: {}",
                        url,
                        attempt,
                        attempts,
                        sleep.as_millis(),
                        e
                    );
                    tokio::time::sleep(sleep).await;
                    backoff_ms = self.retry.next_backoff(backoff_ms);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> String {
        match self.fetch_with_retry(location).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Giving up on {} after {} attempts: {}",
                    location,
                    self.retry.max_attempts.max(1),
                    e
                );
                String::new()
            }
        }
    }
}

/// Local file reader
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, location: &str) -> String {
        match tokio::fs::read(Path::new(location)).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Cannot read {}: {}", location, e);
                String::new()
            }
        }
    }
}
