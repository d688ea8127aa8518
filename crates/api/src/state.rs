use std::sync::Arc;

use hearth_core::clock::Clock;
use hearth_core::crypto::{CipherError, TokenCipher};
use hearth_db::{DbPool, Stores};
use hearth_events::push::GatewayError;
use hearth_events::scheduler::ReminderScheduler;
use hearth_events::sources::f1::DEFAULT_SCHEDULE_URL;
use hearth_events::sources::{F1ScheduleSource, NewsFeed, NewsSource};
use hearth_events::vault::{HttpTokenEndpoint, OAuthError};
use hearth_events::{
    ApnsConfig, ApnsGateway, CredentialVault, FetchError, HttpFetcher, NotificationLedger,
    PushDispatcher, RetryPolicy, SourceTtls, Triggers,
};

use crate::config::ServerConfig;

/// Failure while wiring the engine at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid TOKEN_ENCRYPTION_KEY: {0}")]
    Cipher(#[from] CipherError),

    #[error("Failed to build OAuth client: {0}")]
    OAuth(#[from] OAuthError),

    #[error("Failed to build push gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Failed to build HTTP fetcher: {0}")]
    Fetch(#[from] FetchError),
}

/// External collaborators of the notification engine.
pub struct EngineSettings {
    pub cipher: Option<TokenCipher>,
    pub oauth: HttpTokenEndpoint,
    /// `None` runs the dispatcher in "not configured" mode.
    pub apns: Option<ApnsConfig>,
    /// Shared by the data-source fetcher and the push gateway.
    pub retry: RetryPolicy,
    pub ttls: SourceTtls,
    pub schedule_url: String,
    pub news_feeds: Vec<NewsFeed>,
}

impl EngineSettings {
    /// Load engine settings from environment variables.
    ///
    /// | Env Var                | Default                     |
    /// |------------------------|-----------------------------|
    /// | `TOKEN_ENCRYPTION_KEY` | unset (integrations off)    |
    /// | `F1_SCHEDULE_URL`      | Jolpica `current.json`      |
    /// | `F1_NEWS_FEEDS`        | built-in feed list          |
    ///
    /// Push, OAuth provider and TTL variables are documented on
    /// [`ApnsConfig::from_env`], `OAuthProviderConfig::from_env` and
    /// [`SourceTtls::from_env`].
    pub fn from_env() -> Result<Self, StartupError> {
        Ok(Self {
            cipher: TokenCipher::from_env().transpose()?,
            oauth: HttpTokenEndpoint::from_env()?,
            apns: ApnsConfig::from_env(),
            retry: RetryPolicy::default(),
            ttls: SourceTtls::from_env(),
            schedule_url: std::env::var("F1_SCHEDULE_URL")
                .unwrap_or_else(|_| DEFAULT_SCHEDULE_URL.to_string()),
            news_feeds: NewsFeed::from_env(),
        })
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub stores: Stores,
    /// `None` when running on the in-memory store.
    pub pool: Option<DbPool>,
    pub vault: Arc<CredentialVault>,
    pub dispatcher: Arc<PushDispatcher>,
    pub ledger: Arc<NotificationLedger>,
    pub triggers: Arc<Triggers>,
    pub schedule: Arc<F1ScheduleSource>,
    pub news: Arc<NewsSource>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the engine components around `stores`.
    pub fn build(
        config: ServerConfig,
        stores: Stores,
        pool: Option<DbPool>,
        settings: EngineSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let gateway = settings
            .apns
            .map(|apns| ApnsGateway::new(apns, Arc::clone(&clock), settings.retry.clone()))
            .transpose()?;
        let dispatcher = Arc::new(PushDispatcher::new(gateway, stores.devices.clone()));
        let ledger = Arc::new(NotificationLedger::new(
            stores.ledger.clone(),
            Arc::clone(&clock),
        ));

        let fetcher = Arc::new(HttpFetcher::new(settings.retry)?);
        let schedule = Arc::new(F1ScheduleSource::new(
            Arc::clone(&fetcher),
            Arc::clone(&clock),
            settings.schedule_url,
            settings.ttls.schedule,
        ));
        let news = Arc::new(NewsSource::new(
            fetcher,
            Arc::clone(&clock),
            settings.news_feeds,
            settings.ttls.news,
        ));

        let vault = Arc::new(CredentialVault::new(
            stores.integrations.clone(),
            settings.cipher,
            settings.oauth,
            Arc::clone(&clock),
        ));

        let scheduler = Arc::new(ReminderScheduler::new(
            stores.clone(),
            Arc::clone(&dispatcher),
            Arc::clone(&ledger),
            Arc::clone(&clock),
        ));
        let triggers = Arc::new(Triggers::new(
            scheduler,
            Arc::clone(&schedule),
            Arc::clone(&news),
        ));

        Ok(Self {
            config: Arc::new(config),
            stores,
            pool,
            vault,
            dispatcher,
            ledger,
            triggers,
            schedule,
            news,
            clock,
        })
    }
}
