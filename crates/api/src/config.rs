use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Process-level settings for the HTTP server.
///
/// | Env Var                | Default                                       |
/// |------------------------|-----------------------------------------------|
/// | `HOST`                 | `0.0.0.0`                                     |
/// | `PORT`                 | `3000`                                        |
/// | `CORS_ORIGINS`         | `http://localhost:5173` (comma-separated)     |
/// | `REQUEST_TIMEOUT_SECS` | `30`                                          |
/// | `CRON_SECRET`          | unset                                         |
/// | `PUBLIC_BASE_URL`      | `http://localhost:3000`                       |
/// | `APP_RETURN_URL`       | `http://localhost:5173/settings/integrations` |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Trigger routes answer 503 while unset.
    pub cron_secret: Option<String>,
    /// Externally visible base URL, used to build OAuth redirect URIs.
    pub public_base_url: String,
    /// Where the OAuth callback sends the browser when it is done.
    pub app_return_url: String,
    pub jwt: JwtConfig,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// # Panics
///
/// Panics when the variable is set but does not parse.
fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{name} has an invalid value: {raw}")),
        Err(_) => default,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let cron_secret = std::env::var("CRON_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty());
        if cron_secret.is_none() {
            tracing::warn!("CRON_SECRET not set, trigger endpoints disabled");
        }

        Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parsed_or("PORT", 3000),
            cors_origins: split_origins(&var_or("CORS_ORIGINS", "http://localhost:5173")),
            request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", 30),
            cron_secret,
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            app_return_url: var_or(
                "APP_RETURN_URL",
                "http://localhost:5173/settings/integrations",
            ),
            jwt: JwtConfig::from_env(),
        }
    }

    /// Redirect URI registered with `provider` for the code flow.
    pub fn oauth_redirect_uri(&self, provider: &str) -> String {
        format!(
            "{}/api/v1/integrations/{provider}/callback",
            self.public_base_url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            split_origins(" https://a.test, ,https://b.test,"),
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
    }
}
