//! HTTP transport seam and the bounded retry loop used for every outbound GET.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::string::FromUtf8Error;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DeckSyncError, Result};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The body as UTF-8 text. Invalid bytes are an error, never replaced.
    pub fn into_text(self) -> std::result::Result<String, FromUtf8Error> {
        String::from_utf8(self.body)
    }
}

/// Minimal GET capability the retriever and catalog download depend on.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How many times to try a GET and how long each try may take.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `0` is treated as `1`.
    pub attempts: u32,
    /// Per-attempt deadline. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            timeout: None,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, timeout: Option<Duration>) -> Self {
        Self {
            attempts,
            timeout,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff before attempt `attempt + 1`, with up to 50% added jitter.
    fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let capped = exp.min(self.max_delay);
        let ms = capped.as_millis() as u64;
        if ms == 0 {
            return capped;
        }
        let jitter = rand::thread_rng().gen_range(0..=ms / 2);
        capped + Duration::from_millis(jitter)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// GET `url`, retrying transport failures, timeouts, 5xx and 429 responses.
///
/// Attempts run one after another. Exhausting them on a transport failure
/// yields [`DeckSyncError::Fetch`]; any final non-200 response yields
/// [`DeckSyncError::UpstreamStatus`].
pub async fn get_with_retry<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    policy: &RetryPolicy,
) -> Result<HttpResponse> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match policy.timeout {
            Some(limit) => match tokio::time::timeout(limit, transport.get(url)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(DeckSyncError::Fetch {
                    url: url.to_string(),
                    attempts: attempt,
                    reason: format!("timed out after {limit:?}"),
                }),
            },
            None => transport.get(url).await,
        };

        match outcome {
            Ok(resp) if resp.status == StatusCode::OK => {
                debug!(url, attempt, "fetched");
                return Ok(resp);
            }
            Ok(resp) if is_retryable(resp.status) && attempt < attempts => {
                warn!(url, attempt, status = %resp.status, "retrying after upstream status");
            }
            Ok(resp) => {
                warn!(url, attempt, status = %resp.status, "unexpected response status");
                return Err(DeckSyncError::UpstreamStatus {
                    url: url.to_string(),
                    status: resp.status,
                });
            }
            Err(e) if attempt < attempts => {
                warn!(url, attempt, error = %e, "retrying after fetch error");
            }
            Err(e) => {
                warn!(url, attempt, error = %e, "giving up fetch");
                return Err(DeckSyncError::Fetch {
                    url: url.to_string(),
                    attempts: attempt,
                    reason: e.to_string(),
                });
            }
        }
        tokio::time::sleep(policy.delay(attempt)).await;
    }
}
