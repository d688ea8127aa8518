//! Member access tokens and OAuth state tokens.
//!
//! Both are HS256 tokens whose subject is the member's id. A state token
//! also carries `purpose: "oauth_state"` and the provider, lives for ten
//! minutes, and is never accepted as an access token (nor the reverse).

use chrono::Utc;
use hearth_core::types::OwnerId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const DEFAULT_TTL_MINS: i64 = 60;

pub const OAUTH_STATE_PURPOSE: &str = "oauth_state";

/// Lifetime of an OAuth state token, in seconds.
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Serialize, Deserialize)]
struct MemberClaims {
    sub: OwnerId,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    sub: OwnerId,
    purpose: String,
    provider: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_mins: i64,
}

impl JwtConfig {
    /// `JWT_SECRET` (required, non-empty) and `JWT_TTL_MINS` (default 60).
    ///
    /// # Panics
    ///
    /// Panics when the secret is missing or the TTL is not an integer.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .expect("JWT_SECRET must be set");
        let ttl_mins = match std::env::var("JWT_TTL_MINS") {
            Ok(raw) => raw.parse().expect("JWT_TTL_MINS must be an integer"),
            Err(_) => DEFAULT_TTL_MINS,
        };
        Self { secret, ttl_mins }
    }
}

/// Sign a token for `owner_id` valid for the configured TTL.
pub fn issue_token(
    owner_id: OwnerId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = Utc::now().timestamp();
    let claims = MemberClaims {
        sub: owner_id,
        iat,
        exp: iat + config.ttl_mins * 60,
        purpose: None,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry and return the member the token was issued to.
/// Purpose-bound tokens are rejected.
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<OwnerId, jsonwebtoken::errors::Error> {
    let claims = jsonwebtoken::decode::<MemberClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;
    if claims.purpose.is_some() {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(claims.sub)
}

/// Sign the `state` parameter for an OAuth round trip to `provider`.
pub fn issue_oauth_state(
    owner_id: OwnerId,
    provider: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = Utc::now().timestamp();
    let claims = StateClaims {
        sub: owner_id,
        purpose: OAUTH_STATE_PURPOSE.to_string(),
        provider: provider.to_string(),
        iat,
        exp: iat + OAUTH_STATE_TTL_SECS,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify a state token issued for `provider` and return its member.
pub fn verify_oauth_state(
    token: &str,
    provider: &str,
    config: &JwtConfig,
) -> Result<OwnerId, jsonwebtoken::errors::Error> {
    let claims = jsonwebtoken::decode::<StateClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;
    if claims.purpose != OAUTH_STATE_PURPOSE || claims.provider != provider {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            ttl_mins: 60,
        }
    }

    #[test]
    fn verified_token_yields_owner() {
        let owner = Uuid::new_v4();
        let token = issue_token(owner, &config("alpha-secret")).unwrap();
        assert_eq!(verify_token(&token, &config("alpha-secret")).unwrap(), owner);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Beyond the default leeway.
        let mut expired = config("alpha-secret");
        expired.ttl_mins = -10;
        let token = issue_token(Uuid::new_v4(), &expired).unwrap();
        assert!(verify_token(&token, &config("alpha-secret")).is_err());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), &config("alpha-secret")).unwrap();
        assert!(verify_token(&token, &config("bravo-secret")).is_err());
    }

    #[test]
    fn state_token_round_trips_for_its_provider() {
        let owner = Uuid::new_v4();
        let state = issue_oauth_state(owner, "google", &config("alpha-secret")).unwrap();
        assert_eq!(
            verify_oauth_state(&state, "google", &config("alpha-secret")).unwrap(),
            owner
        );
        assert!(verify_oauth_state(&state, "microsoft", &config("alpha-secret")).is_err());
    }

    #[test]
    fn state_token_is_not_an_access_token() {
        let state = issue_oauth_state(Uuid::new_v4(), "google", &config("alpha-secret")).unwrap();
        assert!(verify_token(&state, &config("alpha-secret")).is_err());
    }

    #[test]
    fn access_token_is_not_a_state_token() {
        let token = issue_token(Uuid::new_v4(), &config("alpha-secret")).unwrap();
        assert!(verify_oauth_state(&token, "google", &config("alpha-secret")).is_err());
    }

    #[test]
    fn state_token_expires_after_ten_minutes() {
        let now = Utc::now().timestamp();
        let claims = StateClaims {
            sub: Uuid::new_v4(),
            purpose: OAUTH_STATE_PURPOSE.into(),
            provider: "google".into(),
            iat: now - OAUTH_STATE_TTL_SECS - 120,
            exp: now - 120,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"alpha-secret"),
        )
        .unwrap();
        assert!(verify_oauth_state(&token, "google", &config("alpha-secret")).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token("not.a.jwt", &config("alpha-secret")).is_err());
    }
}
