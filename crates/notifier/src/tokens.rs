//! Device token service: the push registrations notifications fan out to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use peppermint_common::error::AppError;

/// A device's push registration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceToken {
    pub id: Uuid,
    pub token: String,
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for registering a device token.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterTokenParams {
    pub token: String,
    pub user_name: Option<String>,
}

pub struct TokenService;

impl TokenService {
    /// Register a token, or refresh the user name on an existing one.
    pub async fn register(
        pool: &PgPool,
        params: &RegisterTokenParams,
    ) -> Result<DeviceToken, AppError> {
        let token = params.token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("Token required".to_string()));
        }
        let user_name = params
            .user_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let record: DeviceToken = sqlx::query_as(
            r#"
            INSERT INTO fcm_tokens (id, token, user_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO UPDATE
                SET user_name = EXCLUDED.user_name,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_name)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            token_id = %record.id,
            user_name = ?record.user_name,
            "Device token registered"
        );

        Ok(record)
    }

    /// Every registered token.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<String>, AppError> {
        let tokens: Vec<(String,)> = sqlx::query_as("SELECT token FROM fcm_tokens")
            .fetch_all(pool)
            .await?;

        Ok(tokens.into_iter().map(|(token,)| token).collect())
    }

    /// Every token not owned by `sender`, so people aren't notified of their
    /// own messages. Tokens registered without a user name are included.
    pub async fn list_excluding_sender(
        pool: &PgPool,
        sender: Option<&str>,
    ) -> Result<Vec<String>, AppError> {
        let tokens: Vec<(String,)> =
            sqlx::query_as("SELECT token FROM fcm_tokens WHERE user_name IS DISTINCT FROM $1")
                .bind(sender)
                .fetch_all(pool)
                .await?;

        Ok(tokens.into_iter().map(|(token,)| token).collect())
    }

    /// Remove a token the push service reported as unregistered.
    pub async fn remove(pool: &PgPool, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM fcm_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
