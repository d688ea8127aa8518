//! OAuth integration models. Token fields are ciphertext, never plaintext.

use hearth_core::types::{DbId, OwnerId, Timestamp};
use sqlx::FromRow;

/// A row from the `oauth_integrations` table.
#[derive(Debug, Clone, FromRow)]
pub struct OAuthIntegration {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub provider: String,
    pub encrypted_access_token: String,
    pub encrypted_refresh_token: String,
    pub expires_at: Timestamp,
    pub provider_user_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for the initial grant (insert or replace).
#[derive(Debug, Clone)]
pub struct UpsertIntegration {
    pub owner_id: OwnerId,
    pub provider: String,
    pub encrypted_access_token: String,
    pub encrypted_refresh_token: String,
    pub expires_at: Timestamp,
    pub provider_user_id: Option<String>,
}

/// DTO for a refresh: new access token, optionally a rotated refresh token.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub encrypted_access_token: String,
    pub encrypted_refresh_token: Option<String>,
    pub expires_at: Timestamp,
}
