//! Single-device delivery against the APNs HTTP API.

use std::sync::Arc;
use std::time::Duration;

use hearth_core::clock::Clock;
use hearth_core::hashing::fingerprint;
use serde::Deserialize;

use super::config::ApnsConfig;
use super::signer::AssertionSigner;
use super::{DeliveryOutcome, GatewayError, PushMessage};
use crate::retry::{RetryPolicy, RetryReason};

/// HTTP client timeout; per-attempt timeouts in [`RetryPolicy`] are tighter.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immediate delivery.
const PRIORITY_IMMEDIATE: &str = "10";

const PUSH_TYPE_ALERT: &str = "alert";

#[derive(Deserialize)]
struct RejectionBody {
    reason: Option<String>,
}

enum Attempt {
    Done(DeliveryOutcome),
    Retry(RetryReason, DeliveryOutcome),
}

pub struct ApnsGateway {
    client: reqwest::Client,
    config: ApnsConfig,
    signer: AssertionSigner,
    policy: RetryPolicy,
}

impl ApnsGateway {
    pub fn new(
        config: ApnsConfig,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Result<Self, GatewayError> {
        let signer = AssertionSigner::new(&config, clock)?;
        let client = reqwest::Client::builder().timeout(CLIENT_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            signer,
            policy,
        })
    }

    pub fn signer(&self) -> &AssertionSigner {
        &self.signer
    }

    /// Send `message` to one device token.
    ///
    /// 429, 5xx and network failures are retried under the retry policy;
    /// any other rejection is returned as-is.
    pub async fn send(&self, token: &str, message: &PushMessage) -> DeliveryOutcome {
        let url = format!("{}/3/device/{}", self.config.host(), token);
        let payload = message.payload();
        let token_fp = fingerprint(token);
        let mut attempt = 1;

        loop {
            let budget = match self.policy.attempt_budget() {
                Ok(budget) => budget,
                Err(e) => {
                    return DeliveryOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let (reason, outcome) = match self.try_send(&url, &payload, budget).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(reason, outcome) => (reason, outcome),
            };

            if attempt >= self.policy.max_attempts {
                tracing::warn!(
                    token = %token_fp,
                    attempts = attempt,
                    reason = ?outcome.failure_reason(),
                    "Push delivery failed after all retries"
                );
                return outcome;
            }

            tracing::debug!(token = %token_fp, attempt, ?reason, "Retrying push delivery");
            if self.policy.backoff(attempt, reason).await.is_err() {
                return outcome;
            }
            attempt += 1;
        }
    }

    async fn try_send(&self, url: &str, payload: &serde_json::Value, budget: Duration) -> Attempt {
        let assertion = match self.signer.assertion() {
            Ok(assertion) => assertion,
            Err(e) => {
                return Attempt::Done(DeliveryOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        };

        let request = self
            .client
            .post(url)
            .header("authorization", format!("bearer {assertion}"))
            .header("apns-topic", &self.config.bundle_id)
            .header("apns-priority", PRIORITY_IMMEDIATE)
            .header("apns-push-type", PUSH_TYPE_ALERT)
            .json(payload)
            .send();

        let response = match tokio::time::timeout(budget, request).await {
            Err(_) => {
                return Attempt::Retry(
                    RetryReason::Transient,
                    DeliveryOutcome::Failed {
                        reason: "Gateway request timed out".to_string(),
                    },
                )
            }
            Ok(Err(e)) => {
                return Attempt::Retry(
                    RetryReason::Transient,
                    DeliveryOutcome::Failed {
                        reason: format!("Gateway request failed: {e}"),
                    },
                )
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if status.is_success() {
            let apns_id = response
                .headers()
                .get("apns-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Attempt::Done(DeliveryOutcome::Delivered { apns_id });
        }

        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<RejectionBody>(&text)
            .ok()
            .and_then(|b| b.reason)
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    text.trim().to_string()
                }
            });

        if reason == "ExpiredProviderToken" {
            self.signer.invalidate();
        }

        let outcome = DeliveryOutcome::Rejected {
            status: status.as_u16(),
            reason,
        };
        if status.as_u16() == 429 {
            Attempt::Retry(RetryReason::RateLimited, outcome)
        } else if status.is_server_error() {
            Attempt::Retry(RetryReason::Transient, outcome)
        } else {
            Attempt::Done(outcome)
        }
    }
}
