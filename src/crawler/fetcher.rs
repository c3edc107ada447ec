//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Failure classification (timeout, HTTP status, network)
//! - Retries with exponential backoff for transient failures
//! - Request spacing through the shared politeness throttle

use crate::config::{Config, UserAgentConfig};
use crate::crawler::retry::{AttemptOutcome, AttemptState, RetryPolicy};
use crate::crawler::throttle::Throttle;
use crate::url::PageUrl;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Why a fetch did not produce a body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    HttpError(u16),

    #[error("network error: {0}")]
    NetworkError(String),

    /// Redirected to a host outside the crawl scope
    #[error("redirected off site to {0}")]
    OffSite(String),
}

impl FailureKind {
    /// Transient failures are retried: timeouts, network errors and 5xx
    ///
    /// Every other non-2xx status, 429 included, is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::Timeout | FailureKind::NetworkError(_) => true,
            FailureKind::HttpError(status) => *status >= 500,
            FailureKind::OffSite(_) => false,
        }
    }

    fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            FailureKind::Timeout
        } else if error.is_connect() {
            FailureKind::NetworkError(format!("connection failed: {}", error))
        } else {
            FailureKind::NetworkError(error.to_string())
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// The URL that was requested
        url: PageUrl,
        /// URL after redirects; relative links resolve against it
        final_url: PageUrl,
        /// Decoded page body
        body: String,
    },

    /// Every attempt failed, or a permanent failure stopped the retries
    Failure {
        url: PageUrl,
        kind: FailureKind,
        /// Attempts made, first one included
        attempts: u32,
    },
}

/// Retrieves page bodies for the crawl
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page, retrying transient failures internally
    async fn fetch(&self, url: &PageUrl) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use holdings_harvest::config::UserAgentConfig;
/// use holdings_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "HoldingsHarvest".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `PageFetcher` backed by reqwest
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    throttle: Throttle,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Duration, retry: RetryPolicy, throttle: Throttle) -> Self {
        Self {
            client,
            timeout,
            retry,
            throttle,
        }
    }

    /// Builds a fetcher from the `[crawler]`, `[retry]` and `[user-agent]` sections
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.crawler.request_timeout_ms);
        let client = build_http_client(&config.user_agent, timeout)?;

        Ok(Self::new(
            client,
            timeout,
            RetryPolicy::from_config(&config.retry),
            Throttle::new(Duration::from_millis(
                config.crawler.min_request_interval_ms,
            )),
        ))
    }

    async fn attempt(&self, url: &PageUrl) -> AttemptOutcome<(PageUrl, String)> {
        let response = match self
            .client
            .get(url.as_str())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::Failed(FailureKind::from_reqwest(&e)),
        };

        let status = response.status();
        if !status.is_success() {
            return AttemptOutcome::Failed(FailureKind::HttpError(status.as_u16()));
        }

        let final_url = PageUrl::try_from(response.url().clone()).unwrap_or_else(|_| url.clone());

        match response.text().await {
            Ok(body) => AttemptOutcome::Success((final_url, body)),
            Err(e) => AttemptOutcome::Failed(FailureKind::from_reqwest(&e)),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &PageUrl) -> FetchResult {
        let mut state = AttemptState::start();

        loop {
            state = match state {
                AttemptState::Attempting(attempt) => {
                    self.throttle.wait().await;
                    trace!("GET {} (attempt {})", url, attempt);
                    let outcome = self.attempt(url).await;
                    AttemptState::Attempting(attempt).on_outcome(outcome, &self.retry)
                }
                retrying @ AttemptState::Retryable { .. } => {
                    if let AttemptState::Retryable {
                        next_attempt,
                        delay,
                        last_failure,
                    } = &retrying
                    {
                        debug!(
                            "Retrying {} in {:?} (attempt {}): {}",
                            url, delay, next_attempt, last_failure
                        );
                        tokio::time::sleep(*delay).await;
                    }
                    retrying.resume()
                }
                AttemptState::Succeeded {
                    value: (final_url, body),
                    ..
                } => {
                    return FetchResult::Success {
                        url: url.clone(),
                        final_url,
                        body,
                    }
                }
                AttemptState::Rejected { kind, attempts }
                | AttemptState::Exhausted { kind, attempts } => {
                    return FetchResult::Failure {
                        url: url.clone(),
                        kind,
                        attempts,
                    }
                }
            };
        }
    }
}
