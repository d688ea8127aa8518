//! Encrypted storage and refresh of third-party OAuth credentials.
//!
//! Tokens exist in plaintext only in memory. Any failure on the read path
//! (missing key, undecryptable row, revoked grant) reads as "not connected".

pub mod oauth;

use std::sync::Arc;

use chrono::Duration;
use hearth_core::clock::Clock;
use hearth_core::crypto::TokenCipher;
use hearth_core::providers::OAuthProvider;
use hearth_core::types::OwnerId;
use hearth_db::models::integration::{OAuthIntegration, RefreshedTokens, UpsertIntegration};
use hearth_db::stores::IntegrationStore;

pub use oauth::{HttpTokenEndpoint, OAuthError, OAuthProviderConfig, TokenResponse};

/// Access tokens this close to expiry are refreshed before use.
pub const REFRESH_BUFFER_MINUTES: i64 = 5;

pub struct CredentialVault {
    store: Arc<dyn IntegrationStore>,
    cipher: Option<TokenCipher>,
    endpoint: HttpTokenEndpoint,
    clock: Arc<dyn Clock>,
}

impl CredentialVault {
    pub fn new(
        store: Arc<dyn IntegrationStore>,
        cipher: Option<TokenCipher>,
        endpoint: HttpTokenEndpoint,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if cipher.is_none() {
            tracing::warn!("TOKEN_ENCRYPTION_KEY not set, calendar integrations disabled");
        }
        Self {
            store,
            cipher,
            endpoint,
            clock,
        }
    }

    /// A usable access token, refreshing it first when it expires within
    /// [`REFRESH_BUFFER_MINUTES`]. `None` means "not connected".
    ///
    /// Concurrent callers may both refresh; the last write wins and both
    /// tokens stay valid until their own expiry.
    pub async fn get_valid_access_token(
        &self,
        owner_id: OwnerId,
        provider: OAuthProvider,
    ) -> Option<String> {
        let cipher = self.cipher.as_ref()?;
        let integration = match self.store.integration(owner_id, provider.as_str()).await {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(owner_id = %owner_id, provider = %provider, error = %e, "Failed to load integration");
                return None;
            }
        };

        let now = self.clock.now();
        if integration.expires_at - now > Duration::minutes(REFRESH_BUFFER_MINUTES) {
            return match cipher.decrypt(&integration.encrypted_access_token) {
                Ok(token) => Some(token),
                Err(e) => {
                    tracing::error!(owner_id = %owner_id, provider = %provider, error = %e, "Stored access token unusable");
                    None
                }
            };
        }

        match self.refresh(cipher, &integration, provider).await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(owner_id = %owner_id, provider = %provider, error = %e, "Token refresh failed");
                None
            }
        }
    }

    async fn refresh(
        &self,
        cipher: &TokenCipher,
        integration: &OAuthIntegration,
        provider: OAuthProvider,
    ) -> Result<String, OAuthError> {
        let refresh_token = cipher.decrypt(&integration.encrypted_refresh_token)?;
        let tokens = self.endpoint.refresh(provider, &refresh_token).await?;

        let refreshed = RefreshedTokens {
            encrypted_access_token: cipher.encrypt(&tokens.access_token)?,
            encrypted_refresh_token: tokens
                .refresh_token
                .as_deref()
                .map(|t| cipher.encrypt(t))
                .transpose()?,
            expires_at: self.clock.now() + Duration::seconds(tokens.expires_in),
        };
        self.store
            .update_tokens(integration.owner_id, provider.as_str(), &refreshed)
            .await?;

        tracing::info!(
            owner_id = %integration.owner_id,
            provider = %provider,
            rotated = tokens.refresh_token.is_some(),
            "Access token refreshed"
        );
        Ok(tokens.access_token)
    }

    /// Exchange an authorization code and store the resulting grant.
    pub async fn connect(
        &self,
        owner_id: OwnerId,
        provider: OAuthProvider,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(), OAuthError> {
        let cipher = self
            .cipher
            .as_ref()
            .ok_or(OAuthError::NotConfigured(provider))?;
        let tokens = self
            .endpoint
            .exchange_code(provider, code, redirect_uri)
            .await?;
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or(OAuthError::MissingRefreshToken)?;

        self.store
            .upsert_integration(&UpsertIntegration {
                owner_id,
                provider: provider.as_str().to_string(),
                encrypted_access_token: cipher.encrypt(&tokens.access_token)?,
                encrypted_refresh_token: cipher.encrypt(refresh_token)?,
                expires_at: self.clock.now() + Duration::seconds(tokens.expires_in),
                provider_user_id: None,
            })
            .await?;

        tracing::info!(owner_id = %owner_id, provider = %provider, "Integration connected");
        Ok(())
    }

    /// Remove the stored grant. Returns `true` if one existed.
    pub async fn disconnect(
        &self,
        owner_id: OwnerId,
        provider: OAuthProvider,
    ) -> Result<bool, sqlx::Error> {
        let removed = self
            .store
            .delete_integration(owner_id, provider.as_str())
            .await?;
        if removed {
            tracing::info!(owner_id = %owner_id, provider = %provider, "Integration disconnected");
        }
        Ok(removed)
    }

    pub async fn is_connected(
        &self,
        owner_id: OwnerId,
        provider: OAuthProvider,
    ) -> Result<bool, sqlx::Error> {
        Ok(self
            .store
            .integration(owner_id, provider.as_str())
            .await?
            .is_some())
    }
}
