//! Repository for the `oauth_integrations` table.

use hearth_core::types::OwnerId;
use sqlx::PgPool;

use crate::models::integration::{OAuthIntegration, RefreshedTokens, UpsertIntegration};

/// Column list for `oauth_integrations` queries.
const COLUMNS: &str = "id, owner_id, provider, encrypted_access_token, encrypted_refresh_token, \
                       expires_at, provider_user_id, created_at, updated_at";

pub struct IntegrationRepo;

impl IntegrationRepo {
    pub async fn find(
        pool: &PgPool,
        owner_id: OwnerId,
        provider: &str,
    ) -> Result<Option<OAuthIntegration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM oauth_integrations WHERE owner_id = $1 AND provider = $2"
        );
        sqlx::query_as::<_, OAuthIntegration>(&query)
            .bind(owner_id)
            .bind(provider)
            .fetch_optional(pool)
            .await
    }

    /// Store the initial grant, replacing any previous one for the pair.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertIntegration,
    ) -> Result<OAuthIntegration, sqlx::Error> {
        let query = format!(
            "INSERT INTO oauth_integrations (owner_id, provider, encrypted_access_token, \
                 encrypted_refresh_token, expires_at, provider_user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (owner_id, provider) DO UPDATE SET \
                 encrypted_access_token = EXCLUDED.encrypted_access_token, \
                 encrypted_refresh_token = EXCLUDED.encrypted_refresh_token, \
                 expires_at = EXCLUDED.expires_at, \
                 provider_user_id = EXCLUDED.provider_user_id, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OAuthIntegration>(&query)
            .bind(input.owner_id)
            .bind(&input.provider)
            .bind(&input.encrypted_access_token)
            .bind(&input.encrypted_refresh_token)
            .bind(input.expires_at)
            .bind(&input.provider_user_id)
            .fetch_one(pool)
            .await
    }

    /// Persist a refresh. The refresh token is only replaced when rotated.
    ///
    /// Concurrent refreshes for the same pair are not serialised; the last
    /// write wins.
    pub async fn update_tokens(
        pool: &PgPool,
        owner_id: OwnerId,
        provider: &str,
        tokens: &RefreshedTokens,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE oauth_integrations SET \
                 encrypted_access_token = $3, \
                 encrypted_refresh_token = COALESCE($4, encrypted_refresh_token), \
                 expires_at = $5, \
                 updated_at = NOW() \
             WHERE owner_id = $1 AND provider = $2",
        )
        .bind(owner_id)
        .bind(provider)
        .bind(&tokens.encrypted_access_token)
        .bind(&tokens.encrypted_refresh_token)
        .bind(tokens.expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, owner_id: OwnerId, provider: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM oauth_integrations WHERE owner_id = $1 AND provider = $2")
            .bind(owner_id)
            .bind(provider)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
