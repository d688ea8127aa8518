//! ES256 provider-token signer for the push gateway.
//!
//! Apple accepts a provider token for 60 minutes. The signer reuses one
//! token until 10 minutes before that limit and then signs a new one.
//! Refresh is check-and-replace: two callers racing past the limit may both
//! sign, and the later write wins.

use std::sync::{Arc, RwLock};

use chrono::Duration;
use hearth_core::clock::Clock;
use hearth_core::types::Timestamp;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use super::config::ApnsConfig;
use super::GatewayError;

/// Lifetime the gateway grants a provider token.
pub const ASSERTION_VALIDITY_MINUTES: i64 = 60;

/// Re-sign this long before the validity ends.
pub const ASSERTION_REFRESH_MARGIN_MINUTES: i64 = 10;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    iat: i64,
}

#[derive(Clone)]
struct CachedAssertion {
    token: String,
    issued_at: Timestamp,
}

pub struct AssertionSigner {
    key: EncodingKey,
    key_id: String,
    team_id: String,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<CachedAssertion>>,
}

impl AssertionSigner {
    /// Fails when the configured PEM is not a P-256 PKCS#8 key.
    pub fn new(config: &ApnsConfig, clock: Arc<dyn Clock>) -> Result<Self, GatewayError> {
        let key = EncodingKey::from_ec_pem(config.private_key_pem.as_bytes())
            .map_err(|e| GatewayError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            key_id: config.key_id.clone(),
            team_id: config.team_id.clone(),
            clock,
            cached: RwLock::new(None),
        })
    }

    fn reuse_window() -> Duration {
        Duration::minutes(ASSERTION_VALIDITY_MINUTES - ASSERTION_REFRESH_MARGIN_MINUTES)
    }

    /// The current provider token, signing a new one if the cached token
    /// is older than the reuse window.
    pub fn assertion(&self) -> Result<String, GatewayError> {
        let now = self.clock.now();

        if let Some(cached) = self.cached.read().unwrap_or_else(|p| p.into_inner()).as_ref() {
            if now - cached.issued_at < Self::reuse_window() {
                return Ok(cached.token.clone());
            }
        }

        let token = self.sign(now)?;
        *self.cached.write().unwrap_or_else(|p| p.into_inner()) = Some(CachedAssertion {
            token: token.clone(),
            issued_at: now,
        });
        tracing::debug!(key_id = %self.key_id, "Signed new push provider token");
        Ok(token)
    }

    /// Drop the cached token; the next call signs afresh.
    pub fn invalidate(&self) {
        *self.cached.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn sign(&self, now: Timestamp) -> Result<String, GatewayError> {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        let claims = Claims {
            iss: &self.team_id,
            iat: now.timestamp(),
        };
        encode(&header, &claims, &self.key).map_err(|e| GatewayError::Signing(e.to_string()))
    }
}
