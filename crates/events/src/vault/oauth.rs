//! OAuth 2.0 token endpoint client (authorization-code and refresh grants).

use std::collections::HashMap;
use std::time::Duration;

use hearth_core::providers::OAuthProvider;
use serde::Deserialize;

/// Timeout for a token endpoint round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("OAuth provider {0} is not configured")]
    NotConfigured(OAuthProvider),

    #[error("Token endpoint request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status (e.g. `invalid_grant`).
    #[error("Token endpoint returned HTTP {status}")]
    Rejected { status: u16, body: String },

    #[error("Provider did not return a refresh token")]
    MissingRefreshToken,

    #[error("Token encryption failed: {0}")]
    Cipher(#[from] hearth_core::crypto::CipherError),

    #[error("Failed to store integration: {0}")]
    Store(#[from] sqlx::Error),
}

impl OAuthError {
    /// Short code carried in the callback redirect. Never the raw error.
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::NotConfigured(_) | OAuthError::Cipher(_) => "not_configured",
            OAuthError::Request(_) | OAuthError::Rejected { .. } => "token_exchange_failed",
            OAuthError::MissingRefreshToken => "missing_refresh_token",
            OAuthError::Store(_) => "storage_failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct OAuthProviderConfig {
    pub provider: OAuthProvider,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl std::fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl OAuthProviderConfig {
    /// Load one provider's client credentials.
    ///
    /// Returns `None` unless both `{PREFIX}_CLIENT_ID` and
    /// `{PREFIX}_CLIENT_SECRET` are set. `{PREFIX}_TOKEN_URL` overrides the
    /// provider's production endpoint.
    pub fn from_env(provider: OAuthProvider) -> Option<Self> {
        let prefix = provider.env_prefix();
        let var = |suffix: &str| {
            std::env::var(format!("{prefix}_{suffix}"))
                .ok()
                .filter(|v| !v.trim().is_empty())
        };
        Some(Self {
            provider,
            client_id: var("CLIENT_ID")?,
            client_secret: var("CLIENT_SECRET")?,
            token_url: var("TOKEN_URL")
                .unwrap_or_else(|| provider.default_token_url().to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// HttpTokenEndpoint
// ---------------------------------------------------------------------------

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

pub struct HttpTokenEndpoint {
    client: reqwest::Client,
    providers: HashMap<OAuthProvider, OAuthProviderConfig>,
}

impl HttpTokenEndpoint {
    pub fn new(configs: Vec<OAuthProviderConfig>) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            providers: configs.into_iter().map(|c| (c.provider, c)).collect(),
        })
    }

    /// Every provider with credentials in the environment.
    pub fn from_env() -> Result<Self, OAuthError> {
        Self::new(
            OAuthProvider::ALL
                .into_iter()
                .filter_map(OAuthProviderConfig::from_env)
                .collect(),
        )
    }

    pub fn is_configured(&self, provider: OAuthProvider) -> bool {
        self.providers.contains_key(&provider)
    }

    pub async fn exchange_code(
        &self,
        provider: OAuthProvider,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, OAuthError> {
        self.post(
            provider,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
        )
        .await
    }

    pub async fn refresh(
        &self,
        provider: OAuthProvider,
        refresh_token: &str,
    ) -> Result<TokenResponse, OAuthError> {
        self.post(
            provider,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }

    async fn post(
        &self,
        provider: OAuthProvider,
        grant: &[(&str, &str)],
    ) -> Result<TokenResponse, OAuthError> {
        let config = self
            .providers
            .get(&provider)
            .ok_or(OAuthError::NotConfigured(provider))?;

        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self.client.post(&config.token_url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %provider, status = status.as_u16(), "Token endpoint rejected grant");
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }
}
