//! Application context - dependency injection container

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use nestbuffer_core::{BufferSyncService, SyncOptions};
use nestbuffer_domain::Config;
use nestbuffer_infra::{ArcGisSession, FeatureLayerClient, GeometryServiceClient, HttpClient, InstanceLock};
use tracing::info;

/// Application context - holds the configured sync service
pub struct AppContext {
    pub config: Config,
    pub sync: BufferSyncService,
}

impl AppContext {
    /// Wire the ArcGIS adapters into a sync service.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built or a layer URL is invalid.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.sync.request_timeout_seconds))
            .build()
            .context("failed to build HTTP client")?;

        let session = Arc::new(ArcGisSession::new(
            http.clone(),
            config.endpoints.token_url.clone(),
            config.credentials.clone(),
            config.sync.token_expiration_minutes,
        ));

        let spatial_reference = config.sync.spatial_reference;
        let survey = FeatureLayerClient::new(
            http.clone(),
            session.clone(),
            "survey",
            &config.endpoints.survey_layer_url,
            spatial_reference,
        )
        .context("invalid survey layer URL")?;
        let buffers = FeatureLayerClient::new(
            http.clone(),
            session.clone(),
            "buffer",
            &config.endpoints.buffer_layer_url,
            spatial_reference,
        )
        .context("invalid buffer layer URL")?;
        let geometry = GeometryServiceClient::new(http, &config.endpoints.geometry_service_url);

        let sync = BufferSyncService::new(session, Arc::new(survey), Arc::new(buffers), Arc::new(geometry))
            .with_options(SyncOptions::from(&config.sync));

        info!(
            survey_layer = %config.endpoints.survey_layer_url,
            buffer_layer = %config.endpoints.buffer_layer_url,
            max_parallel = config.sync.max_parallel,
            "application context initialized"
        );

        Ok(Self { config, sync })
    }

    /// Directory for the single-instance PID file.
    pub fn lock_dir(&self) -> PathBuf {
        self.config.sync.lock_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Take the cross-process lock; held until the returned guard drops.
    ///
    /// # Errors
    /// Fails if another live `nestbuffer` process holds the lock.
    pub fn acquire_lock(&self) -> anyhow::Result<InstanceLock> {
        let dir = self.lock_dir();
        InstanceLock::acquire(&dir).with_context(|| format!("could not lock {}", dir.display()))
    }
}
