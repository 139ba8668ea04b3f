//! Configuration structures

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SPATIAL_REFERENCE;
use crate::errors::{NestBufferError, Result};

pub const DEFAULT_TOKEN_URL: &str = "https://www.arcgis.com/sharing/rest/oauth2/token";
pub const DEFAULT_GEOMETRY_SERVICE_URL: &str =
    "https://tasks.arcgisonline.com/ArcGIS/rest/services/Geometry/GeometryServer";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// May be left empty in the file and supplied by a credentials file or
    /// environment variables instead.
    #[serde(default)]
    pub credentials: Credentials,
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Check that the configuration is usable.
    ///
    /// # Errors
    /// Returns `NestBufferError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.client_id.trim().is_empty() {
            return Err(NestBufferError::Config("client_id is not set".into()));
        }
        if self.credentials.client_secret.trim().is_empty() {
            return Err(NestBufferError::Config("client_secret is not set".into()));
        }

        for (name, url) in [
            ("token_url", &self.endpoints.token_url),
            ("survey_layer_url", &self.endpoints.survey_layer_url),
            ("buffer_layer_url", &self.endpoints.buffer_layer_url),
            ("geometry_service_url", &self.endpoints.geometry_service_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(NestBufferError::Config(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }

        if self.sync.max_parallel == 0 {
            return Err(NestBufferError::Config("max_parallel must be at least 1".into()));
        }
        if self.sync.token_expiration_minutes == 0 {
            return Err(NestBufferError::Config(
                "token_expiration_minutes must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Client credentials used to obtain an access token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Remote service endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Feature layer holding survey points (e.g. `.../FeatureServer/0/`)
    pub survey_layer_url: String,
    /// Feature layer holding buffer polygons
    pub buffer_layer_url: String,
    #[serde(default = "default_geometry_service_url")]
    pub geometry_service_url: String,
}

impl EndpointConfig {
    /// Layer URLs with a guaranteed trailing `/` and the geometry service
    /// URL without one, so operation names can be appended directly.
    pub fn normalized(mut self) -> Self {
        for url in [&mut self.survey_layer_url, &mut self.buffer_layer_url] {
            if !url.ends_with('/') {
                url.push('/');
            }
        }
        while self.geometry_service_url.ends_with('/') {
            self.geometry_service_url.pop();
        }
        self
    }
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_geometry_service_url() -> String {
    DEFAULT_GEOMETRY_SERVICE_URL.to_string()
}

/// Reconciliation pass settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// WKID used for querying points and computing buffers
    pub spatial_reference: u32,
    /// Upper bound on concurrent geometry / delete calls within a pass
    pub max_parallel: usize,
    /// Requested token lifetime in whole minutes
    pub token_expiration_minutes: u32,
    pub request_timeout_seconds: u64,
    /// Directory for the single-instance PID file; system temp dir when unset
    pub lock_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            spatial_reference: DEFAULT_SPATIAL_REFERENCE,
            max_parallel: 4,
            token_expiration_minutes: 10,
            request_timeout_seconds: 30,
            lock_dir: None,
        }
    }
}
