//! HTTP GET with bounded retry for read-only third-party data sources.

use std::time::Duration;

use crate::retry::{DeadlineExceeded, RetryPolicy, RetryReason};

/// HTTP client timeout; per-attempt timeouts in [`RetryPolicy`] are tighter.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("hearth-notify/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Still rate limited after the last attempt.
    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// A non-2xx, non-429 response. Not retried.
    #[error("Source returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// Network failure on the last attempt.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The last attempt did not finish within its timeout.
    #[error("Request timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Deadline exceeded after {attempts} attempts")]
    DeadlineExceeded { attempts: u32 },

    /// The payload did not have the expected shape.
    #[error("Malformed payload: {0}")]
    Parse(String),
}

impl FetchError {
    fn deadline(attempts: u32, _: DeadlineExceeded) -> Self {
        FetchError::DeadlineExceeded { attempts }
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Body of a successful fetch plus the retry history that produced it.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub body: String,
    pub attempts: u32,
    /// Delays slept between attempts, in order.
    pub waited: Vec<Duration>,
}

enum AttemptError {
    RateLimited,
    Status(u16),
    Network(reqwest::Error),
    Timeout,
}

pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url`, retrying up to `max_attempts` times.
    ///
    /// 429 backs off `attempt * base`; network failures and attempt timeouts
    /// wait the fixed network delay; any other non-2xx fails immediately.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        max_attempts: u32,
    ) -> Result<FetchResponse, FetchError> {
        let max_attempts = max_attempts.max(1);
        let mut waited = Vec::new();

        for attempt in 1..=max_attempts {
            let budget = self
                .policy
                .attempt_budget()
                .map_err(|e| FetchError::deadline(attempt - 1, e))?;

            let reason = match self.try_fetch(url, budget).await {
                Ok(body) => {
                    return Ok(FetchResponse {
                        body,
                        attempts: attempt,
                        waited,
                    })
                }
                Err(AttemptError::Status(status)) => {
                    tracing::warn!(url, status, attempt, "Source rejected request");
                    return Err(FetchError::HttpStatus { status });
                }
                Err(e) if attempt == max_attempts => {
                    tracing::error!(url, attempts = attempt, "Fetch failed after all retries");
                    return Err(match e {
                        AttemptError::RateLimited => FetchError::RateLimited { attempts: attempt },
                        AttemptError::Network(e) => FetchError::Request(e),
                        AttemptError::Timeout => FetchError::Timeout { attempts: attempt },
                        AttemptError::Status(status) => FetchError::HttpStatus { status },
                    });
                }
                Err(AttemptError::RateLimited) => RetryReason::RateLimited,
                Err(AttemptError::Network(e)) => {
                    tracing::warn!(url, attempt, error = %e, "Fetch attempt failed, retrying");
                    RetryReason::Transient
                }
                Err(AttemptError::Timeout) => {
                    tracing::warn!(url, attempt, "Fetch attempt timed out, retrying");
                    RetryReason::Transient
                }
            };

            let delay = self
                .policy
                .backoff(attempt, reason)
                .await
                .map_err(|e| FetchError::deadline(attempt, e))?;
            tracing::debug!(url, attempt, delay_ms = delay.as_millis() as u64, "Retrying fetch");
            waited.push(delay);
        }

        // The loop always returns on its last iteration.
        Err(FetchError::Timeout {
            attempts: max_attempts,
        })
    }

    async fn try_fetch(&self, url: &str, budget: Duration) -> Result<String, AttemptError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(AttemptError::Network)?;
            let status = response.status();
            if status.as_u16() == 429 {
                return Err(AttemptError::RateLimited);
            }
            if !status.is_success() {
                return Err(AttemptError::Status(status.as_u16()));
            }
            response.text().await.map_err(AttemptError::Network)
        };

        match tokio::time::timeout(budget, request).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout),
        }
    }
}
