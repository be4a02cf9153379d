//! Supabase-style auth client shared by Sprig clients.
//!
//! Sync is gated on an authenticated owner identity; this module owns the
//! session types and the password/refresh grant flows that produce one.

use std::fmt;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::models::OwnerId;

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Longest error-body excerpt quoted in an [`AuthError::Api`] message.
const ERROR_BODY_LIMIT: usize = 180;

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Authenticated backend user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// A live auth session: tokens plus the owning user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    /// Whether the access token is expired (with a small clock-skew margin).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_now() + EXPIRY_SKEW_SECONDS
    }

    /// Owner identity used to scope every synced record.
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        OwnerId::new(self.user.id.clone())
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Invalid auth payload: {0}")]
    InvalidPayload(String),
    #[error("Session storage error: {0}")]
    Storage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a client keeps the session between runs (file, keychain, memory).
pub trait SessionPersistence: Send + Sync {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Password-grant auth client against the backend's GoTrue endpoint.
#[derive(Clone)]
pub struct AuthClient {
    auth_url: String,
    anon_key: String,
    client: Client,
}

impl AuthClient {
    pub fn new(config: &BackendConfig) -> AuthResult<Self> {
        Ok(Self {
            auth_url: config.auth_url(),
            anon_key: config.anon_key.clone(),
            client: Client::builder().build()?,
        })
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .client
            .post(format!("{}/token?grant_type=password", self.auth_url))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        Self::parse_session_response(response).await
    }

    /// Exchange a refresh token for a fresh session.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .client
            .post(format!("{}/token?grant_type=refresh_token", self.auth_url))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        Self::parse_session_response(response).await
    }

    /// Load the stored session, refreshing it if expired.
    ///
    /// Returns `None` when no usable session exists; callers then fall back
    /// to local-only operation (sync becomes a no-op).
    pub async fn restore_session<S: SessionPersistence>(
        &self,
        store: &S,
    ) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = store.load_session()? else {
            return Ok(None);
        };

        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh(&stored.refresh_token).await {
            Ok(session) => {
                store.save_session(&session)?;
                Ok(Some(session))
            }
            Err(AuthError::Api(message)) => {
                tracing::warn!("Stored session could not be refreshed: {message}");
                store.clear_session()?;
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn parse_session_response(response: reqwest::Response) -> AuthResult<AuthSession> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        let payload = response.json::<SessionResponse>().await?;
        payload.try_into()
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl TryFrom<SessionResponse> for AuthSession {
    type Error = AuthError;

    fn try_from(value: SessionResponse) -> AuthResult<Self> {
        let access_token = value
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AuthError::InvalidPayload("missing access_token".to_string()))?;
        let refresh_token = value
            .refresh_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AuthError::InvalidPayload("missing refresh_token".to_string()))?;
        let expires_at = value
            .expires_at
            .or_else(|| {
                value
                    .expires_in
                    .map(|expires_in| unix_now().saturating_add(expires_in))
            })
            .ok_or_else(|| AuthError::InvalidPayload("missing expires_at/expires_in".to_string()))?;
        let user = value
            .user
            .ok_or_else(|| AuthError::InvalidPayload("missing user".to_string()))?;

        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
            user,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<AuthErrorBody>(body) {
        if let Some(message) = payload.error_description.or(payload.msg).or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        let excerpt: String = trimmed.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{excerpt} ({})", status.as_u16())
    }
}
