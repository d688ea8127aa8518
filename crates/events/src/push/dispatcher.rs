//! Per-owner fan-out over every registered device.

use std::sync::Arc;

use futures::future::join_all;
use hearth_core::categories::Platform;
use hearth_core::hashing::fingerprint;
use hearth_core::types::OwnerId;
use hearth_db::models::device_token::DeviceToken;
use hearth_db::stores::DeviceTokenStore;
use serde::Serialize;

use super::gateway::ApnsGateway;
use super::{DeliveryOutcome, PushMessage};

/// One device that did not receive the alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    /// Short fingerprint of the device token; tokens are never logged whole.
    pub token: String,
    pub reason: String,
}

/// Aggregate result of sending to one or more owners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendSummary {
    pub sent: usize,
    pub total: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl SendSummary {
    fn merge(&mut self, other: SendSummary) {
        self.sent += other.sent;
        self.total += other.total;
        self.failures.extend(other.failures);
    }
}

/// Sends alerts to owners' devices. Without a gateway every send reports
/// [`DeliveryOutcome::NotConfigured`].
pub struct PushDispatcher {
    gateway: Option<ApnsGateway>,
    devices: Arc<dyn DeviceTokenStore>,
}

impl PushDispatcher {
    pub fn new(gateway: Option<ApnsGateway>, devices: Arc<dyn DeviceTokenStore>) -> Self {
        if gateway.is_none() {
            tracing::warn!("APNs not configured, push delivery disabled");
        }
        Self { gateway, devices }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn gateway(&self) -> Option<&ApnsGateway> {
        self.gateway.as_ref()
    }

    /// Send to a single device.
    pub async fn send(&self, device: &DeviceToken, message: &PushMessage) -> DeliveryOutcome {
        if device.platform() != Some(Platform::Ios) {
            return DeliveryOutcome::UnsupportedPlatform {
                platform: device.platform.clone(),
            };
        }
        match &self.gateway {
            Some(gateway) => gateway.send(&device.token, message).await,
            None => DeliveryOutcome::NotConfigured,
        }
    }

    /// Send to every device of `owner_id` concurrently. Never fails; a store
    /// error shows up as an empty summary.
    pub async fn send_to_owner(&self, owner_id: OwnerId, message: &PushMessage) -> SendSummary {
        let devices = match self.devices.devices_for_owner(owner_id).await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!(owner_id = %owner_id, error = %e, "Failed to load device tokens");
                return SendSummary::default();
            }
        };

        let outcomes = join_all(devices.iter().map(|d| self.send(d, message))).await;

        let mut summary = SendSummary {
            total: devices.len(),
            ..SendSummary::default()
        };
        for (device, outcome) in devices.iter().zip(outcomes) {
            if outcome.is_delivered() {
                summary.sent += 1;
                continue;
            }
            if outcome.token_is_dead() {
                self.prune(device).await;
            }
            summary.failures.push(DeliveryFailure {
                token: fingerprint(&device.token),
                reason: outcome.failure_reason().unwrap_or_default(),
            });
        }

        tracing::debug!(
            owner_id = %owner_id,
            sent = summary.sent,
            total = summary.total,
            "Push fan-out complete"
        );
        summary
    }

    /// Send to several owners concurrently, aggregating their summaries.
    pub async fn send_to_owners(&self, owner_ids: &[OwnerId], message: &PushMessage) -> SendSummary {
        join_all(owner_ids.iter().map(|o| self.send_to_owner(*o, message)))
            .await
            .into_iter()
            .fold(SendSummary::default(), |mut acc, s| {
                acc.merge(s);
                acc
            })
    }

    async fn prune(&self, device: &DeviceToken) {
        match self.devices.prune_token(&device.token).await {
            Ok(removed) => tracing::info!(
                owner_id = %device.owner_id,
                token = %fingerprint(&device.token),
                removed,
                "Pruned dead device token"
            ),
            Err(e) => tracing::warn!(
                owner_id = %device.owner_id,
                error = %e,
                "Failed to prune dead device token"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::signer::tests::test_config;
    use crate::retry::RetryPolicy;
    use chrono::Utc;
    use hearth_core::clock::SystemClock;
    use hearth_db::MemoryStore;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(store: Arc<MemoryStore>, server: Option<&MockServer>) -> PushDispatcher {
        let gateway = server.map(|s| {
            ApnsGateway::new(
                test_config(Some(s.uri())),
                Arc::new(SystemClock),
                RetryPolicy::default().with_delays(Duration::from_millis(5), Duration::from_millis(5)),
            )
            .unwrap()
        });
        PushDispatcher::new(gateway, store)
    }

    #[tokio::test]
    async fn unsupported_platform_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let store = Arc::new(MemoryStore::new());
        let device = store
            .upsert_device(Uuid::new_v4(), "android-token", Platform::Android, Utc::now())
            .await
            .unwrap();

        let outcome = dispatcher(store, Some(&server))
            .send(&device, &PushMessage::new("t", "b"))
            .await;
        assert_eq!(
            outcome,
            DeliveryOutcome::UnsupportedPlatform {
                platform: "android".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_gateway_reports_not_configured() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        store
            .upsert_device(owner, "ios-token", Platform::Ios, Utc::now())
            .await
            .unwrap();

        let dispatcher = dispatcher(store, None);
        assert!(!dispatcher.is_configured());
        let summary = dispatcher.send_to_owner(owner, &PushMessage::new("t", "b")).await;
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.failures[0].reason, "Push delivery not configured");
    }

    #[tokio::test]
    async fn send_to_owner_aggregates_and_prunes_dead_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/3/device/good"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/3/device/gone"))
            .respond_with(
                ResponseTemplate::new(410).set_body_json(serde_json::json!({"reason": "Unregistered"})),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        for token in ["good", "gone"] {
            store
                .upsert_device(owner, token, Platform::Ios, Utc::now())
                .await
                .unwrap();
        }

        let summary = dispatcher(store.clone(), Some(&server))
            .send_to_owner(owner, &PushMessage::new("t", "b"))
            .await;

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].reason, "Unregistered");
        assert_eq!(summary.failures[0].token, fingerprint("gone"));

        let remaining = store.devices_for_owner(owner).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token, "good");
    }

    #[tokio::test]
    async fn owner_without_devices_has_empty_summary() {
        let store = Arc::new(MemoryStore::new());
        let summary = dispatcher(store, None)
            .send_to_owner(Uuid::new_v4(), &PushMessage::new("t", "b"))
            .await;
        assert_eq!(summary, SendSummary::default());
    }

    #[tokio::test]
    async fn send_to_owners_sums_every_owner() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for (owner, token) in [(a, "a1"), (a, "a2"), (b, "b1")] {
            store
                .upsert_device(owner, token, Platform::Ios, Utc::now())
                .await
                .unwrap();
        }

        let summary = dispatcher(store, Some(&server))
            .send_to_owners(&[a, b], &PushMessage::new("t", "b"))
            .await;
        assert_eq!(summary.sent, 3);
        assert_eq!(summary.total, 3);
        assert!(summary.failures.is_empty());
    }
}
