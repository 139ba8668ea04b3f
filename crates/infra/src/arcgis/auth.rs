//! ArcGIS token session
//!
//! Exchanges client credentials for a short-lived access token using the
//! `client_credentials` grant. The token lives in memory only and is shared
//! by the feature layer clients through [`AccessTokenProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use nestbuffer_core::CredentialSession;
use nestbuffer_domain::{Credentials, NestBufferError, Result};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::wire::TokenResponse;
use crate::http::HttpClient;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid access token, fetching one if none is held or the held
    /// one has expired.
    async fn access_token(&self) -> Result<String>;
}

#[async_trait]
impl<T: AccessTokenProvider + ?Sized> AccessTokenProvider for Arc<T> {
    async fn access_token(&self) -> Result<String> {
        (**self).access_token().await
    }
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Token session for one set of client credentials
pub struct ArcGisSession {
    http: HttpClient,
    token_url: String,
    credentials: Credentials,
    expiration_minutes: u32,
    token: RwLock<Option<AccessToken>>,
}

impl ArcGisSession {
    pub fn new(
        http: HttpClient,
        token_url: impl Into<String>,
        credentials: Credentials,
        expiration_minutes: u32,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials,
            expiration_minutes: expiration_minutes.max(1),
            token: RwLock::new(None),
        }
    }

    /// Request a new token and replace the held one.
    ///
    /// # Errors
    /// Returns `NestBufferError::Auth` if the credentials are rejected, or the
    /// transport error if the token endpoint is unreachable.
    #[instrument(skip(self), fields(client_id = %self.credentials.client_id))]
    pub async fn fetch_token(&self) -> Result<String> {
        let form = [
            ("client_id", self.credentials.client_id.clone()),
            ("client_secret", self.credentials.client_secret.clone()),
            ("grant_type", "client_credentials".to_string()),
            ("expiration", self.expiration_minutes.to_string()),
            ("f", "json".to_string()),
        ];

        let response: TokenResponse =
            self.http.post_form(&self.token_url, &form).await.map_err(|err| match err {
                NestBufferError::Remote(message) | NestBufferError::InvalidInput(message) => {
                    NestBufferError::Auth(format!("token request rejected: {message}"))
                }
                other => other,
            })?;

        if response.access_token.trim().is_empty() {
            return Err(NestBufferError::Auth("token endpoint returned an empty token".into()));
        }

        let lifetime = response
            .expires_in
            .and_then(|seconds| i64::try_from(seconds).ok())
            .map_or_else(|| Duration::minutes(i64::from(self.expiration_minutes)), Duration::seconds);
        let expires_at = Utc::now() + lifetime;

        let value = response.access_token;
        *self.token.write().await = Some(AccessToken { value: value.clone(), expires_at });

        info!(expires_at = %expires_at, "access token obtained");
        Ok(value)
    }

    /// Whether a token is held and not yet expired.
    pub async fn has_valid_token(&self) -> bool {
        self.token.read().await.as_ref().is_some_and(|token| token.is_valid_at(Utc::now()))
    }
}

#[async_trait]
impl AccessTokenProvider for ArcGisSession {
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.value.clone());
            }
            debug!("held access token has expired");
        }
        self.fetch_token().await
    }
}

#[async_trait]
impl CredentialSession for ArcGisSession {
    async fn refresh(&self) -> Result<()> {
        self.fetch_token().await.map(|_| ())
    }
}
