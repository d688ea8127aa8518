//! Push delivery through the Apple Push Notification service.
//!
//! - [`ApnsConfig`]: key material and gateway host from the environment.
//! - [`AssertionSigner`]: cached ES256 provider token.
//! - [`ApnsGateway`]: one HTTP request per device, with bounded retry.
//! - [`PushDispatcher`]: per-owner fan-out, aggregation and token pruning.

pub mod config;
pub mod dispatcher;
pub mod gateway;
pub mod signer;

use serde::Serialize;
use serde_json::{json, Map, Value};

pub use config::{ApnsConfig, ApnsEnvironment};
pub use dispatcher::{DeliveryFailure, PushDispatcher, SendSummary};
pub use gateway::ApnsGateway;
pub use signer::AssertionSigner;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failures building gateway credentials. Delivery failures are reported
/// as [`DeliveryOutcome`] values instead.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid APNs signing key: {0}")]
    InvalidKey(String),

    #[error("Failed to sign provider token: {0}")]
    Signing(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// PushMessage
// ---------------------------------------------------------------------------

/// An alert plus the custom data merged next to `aps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub sound: Option<String>,
    pub badge: Option<u32>,
    pub data: Map<String, Value>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            sound: Some("default".to_string()),
            badge: None,
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_badge(mut self, badge: u32) -> Self {
        self.badge = Some(badge);
        self
    }

    /// `{aps: {alert: {title, body}, sound, badge}, ...data}`.
    ///
    /// Custom data never overwrites `aps`.
    pub fn payload(&self) -> Value {
        let mut aps = Map::new();
        aps.insert(
            "alert".to_string(),
            json!({ "title": self.title, "body": self.body }),
        );
        if let Some(sound) = &self.sound {
            aps.insert("sound".to_string(), Value::String(sound.clone()));
        }
        if let Some(badge) = self.badge {
            aps.insert("badge".to_string(), Value::from(badge));
        }

        let mut root = self.data.clone();
        root.insert("aps".to_string(), Value::Object(aps));
        Value::Object(root)
    }
}

// ---------------------------------------------------------------------------
// DeliveryOutcome
// ---------------------------------------------------------------------------

/// Gateway reasons that mean the token will never work again.
const DEAD_TOKEN_REASONS: &[&str] = &["BadDeviceToken", "Unregistered", "DeviceTokenNotForTopic"];

/// Result of sending to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { apns_id: Option<String> },
    /// Non-2xx from the gateway, with its reason verbatim.
    Rejected { status: u16, reason: String },
    UnsupportedPlatform { platform: String },
    NotConfigured,
    /// Network failure or timeout after all retries.
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    /// Short reason for summaries and logs; `None` when delivered.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Rejected { reason, .. } => Some(reason.clone()),
            DeliveryOutcome::UnsupportedPlatform { platform } => {
                Some(format!("Platform not supported: {platform}"))
            }
            DeliveryOutcome::NotConfigured => Some("Push delivery not configured".to_string()),
            DeliveryOutcome::Failed { reason } => Some(reason.clone()),
        }
    }

    /// Whether the device token should be removed from the store.
    pub fn token_is_dead(&self) -> bool {
        match self {
            DeliveryOutcome::Rejected { reason, .. } => {
                DEAD_TOKEN_REASONS.contains(&reason.as_str())
            }
            _ => false,
        }
    }
}
