//! FCM HTTP v1 transport.
//!
//! Authenticates with a service account: an RS256-signed assertion is traded
//! at the OAuth2 token endpoint for a one-hour access token, which is cached
//! until shortly before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use peppermint_common::config::PushMode;
use peppermint_common::error::AppError;

use crate::compose::PushContent;
use crate::transport::{PushTransport, redact};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh the cached access token this long before it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const ICON: &str = "/icon-192.png";
const UNREGISTERED: &str = "UNREGISTERED";

/// Fields of a Firebase service-account key file this transport needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Invalid service account JSON: {}", e)))
    }
}

/// OAuth2 JWT-bearer assertion claims.
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    aud: String,
    iat: i64,
    exp: i64,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct FcmClient {
    http: reqwest::Client,
    account: ServiceAccount,
    encoding_key: EncodingKey,
    mode: PushMode,
    token: Mutex<Option<CachedToken>>,
}

impl FcmClient {
    pub fn new(account: ServiceAccount, mode: PushMode) -> Result<Self, AppError> {
        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| AppError::Config(format!("Invalid service account private key: {}", e)))?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            account,
            encoding_key,
            mode,
            token: Mutex::new(None),
        })
    }

    pub fn send_url(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.account.project_id
        )
    }

    /// Signed assertion exchanged for an access token.
    fn assertion(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: self.account.client_email.clone(),
            sub: self.account.client_email.clone(),
            aud: TOKEN_URL.to_string(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
            scope: FCM_SCOPE.to_string(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Auth(format!("Failed to sign service account assertion: {}", e)))
    }

    async fn access_token(&self) -> Result<String, AppError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref()
            && token.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now
        {
            return Ok(token.value.clone());
        }

        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Push(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "Token exchange rejected ({}): {}",
                status, detail
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Push(format!("Malformed token response: {}", e)))?;

        tracing::debug!(expires_in = token.expires_in, "FCM access token refreshed");

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(value)
    }

    /// The `message` object for one device.
    ///
    /// Data-only messages leave display to the delivery surfaces, which
    /// de-duplicate across worker and pages. Notification messages are shown
    /// by the browser itself.
    pub fn build_message(token: &str, content: &PushContent, mode: PushMode) -> Value {
        match mode {
            PushMode::DataOnly => json!({
                "token": token,
                "data": {
                    "title": content.title,
                    "body": content.body,
                    "link": content.link,
                },
                "webpush": {
                    "fcm_options": { "link": content.link },
                },
            }),
            PushMode::Notification => json!({
                "token": token,
                "webpush": {
                    "notification": {
                        "title": content.title,
                        "body": content.body,
                        "icon": ICON,
                    },
                    "fcm_options": { "link": content.link },
                },
            }),
        }
    }
}

#[async_trait]
impl PushTransport for FcmClient {
    async fn send(&self, token: &str, content: &PushContent) -> Result<(), AppError> {
        let access_token = self.access_token().await?;
        let message = Self::build_message(token, content, self.mode);

        let response = self
            .http
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&json!({ "message": message }))
            .send()
            .await
            .map_err(|e| AppError::Push(format!("FCM request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_rejection(token, status, &detail));
        }

        Ok(())
    }
}

/// Map an FCM error response to an `AppError`.
///
/// A 404 carrying `errorCode: UNREGISTERED` means the device token is gone
/// for good; everything else is a delivery failure.
pub fn classify_rejection(token: &str, status: reqwest::StatusCode, detail: &str) -> AppError {
    let unregistered = status == reqwest::StatusCode::NOT_FOUND
        && serde_json::from_str::<Value>(detail)
            .ok()
            .and_then(|body| body["error"]["details"].as_array().cloned())
            .is_some_and(|details| {
                details
                    .iter()
                    .any(|d| d["errorCode"].as_str() == Some(UNREGISTERED))
            });

    if unregistered {
        AppError::TokenUnregistered(redact(token))
    } else {
        AppError::Push(format!(
            "FCM rejected push to {} ({}): {}",
            redact(token),
            status,
            detail
        ))
    }
}
