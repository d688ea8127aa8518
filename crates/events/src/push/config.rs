//! APNs configuration loaded from the environment.

/// Production gateway host.
pub const PRODUCTION_HOST: &str = "https://api.push.apple.com";

/// Sandbox gateway host, used by development builds of the app.
pub const SANDBOX_HOST: &str = "https://api.sandbox.push.apple.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApnsEnvironment {
    Sandbox,
    Production,
}

impl ApnsEnvironment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "sandbox" | "development" => Some(ApnsEnvironment::Sandbox),
            "production" => Some(ApnsEnvironment::Production),
            _ => None,
        }
    }

    pub fn host(self) -> &'static str {
        match self {
            ApnsEnvironment::Sandbox => SANDBOX_HOST,
            ApnsEnvironment::Production => PRODUCTION_HOST,
        }
    }
}

/// Key material and routing for the push gateway.
#[derive(Clone)]
pub struct ApnsConfig {
    /// Identifier of the signing key (the `kid` header).
    pub key_id: String,
    /// Apple developer team identifier (the `iss` claim).
    pub team_id: String,
    /// PKCS#8 PEM of the P-256 signing key.
    pub private_key_pem: String,
    /// App bundle identifier, sent as `apns-topic`.
    pub bundle_id: String,
    pub environment: ApnsEnvironment,
    /// Overrides the environment host; used to point at a local gateway.
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ApnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApnsConfig")
            .field("key_id", &self.key_id)
            .field("team_id", &self.team_id)
            .field("bundle_id", &self.bundle_id)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApnsConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if any of the key material is missing, in which case
    /// the dispatcher runs in "not configured" mode.
    ///
    /// | Variable            | Required | Default      |
    /// |---------------------|----------|--------------|
    /// | `APNS_KEY_ID`       | yes      |              |
    /// | `APNS_TEAM_ID`      | yes      |              |
    /// | `APNS_PRIVATE_KEY`  | yes      |              |
    /// | `APNS_BUNDLE_ID`    | yes      |              |
    /// | `APNS_ENVIRONMENT`  | no       | `production` |
    /// | `APNS_BASE_URL`     | no       |              |
    ///
    /// `APNS_PRIVATE_KEY` may carry literal `\n` sequences in place of
    /// newlines.
    pub fn from_env() -> Option<Self> {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Some(Self {
            key_id: non_empty("APNS_KEY_ID")?,
            team_id: non_empty("APNS_TEAM_ID")?,
            private_key_pem: normalize_pem(&non_empty("APNS_PRIVATE_KEY")?),
            bundle_id: non_empty("APNS_BUNDLE_ID")?,
            environment: non_empty("APNS_ENVIRONMENT")
                .and_then(|v| ApnsEnvironment::parse(&v))
                .unwrap_or(ApnsEnvironment::Production),
            base_url: non_empty("APNS_BASE_URL"),
        })
    }

    /// Gateway origin without a trailing slash.
    pub fn host(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.host())
            .trim_end_matches('/')
    }
}

/// Turn escaped `\n` sequences back into newlines.
pub fn normalize_pem(raw: &str) -> String {
    raw.replace("\\n", "\n").trim().to_string()
}
