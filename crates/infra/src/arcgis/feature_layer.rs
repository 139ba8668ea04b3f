//! Feature layer client (`query`, `addFeatures`, `applyEdits`)

use std::sync::Arc;

use async_trait::async_trait;
use nestbuffer_core::FeatureStore;
use nestbuffer_domain::{EditResult, Feature, NestBufferError, ObjectId, Result};
use tracing::{debug, instrument, warn};
use url::Url;

use super::auth::AccessTokenProvider;
use super::wire::{AddFeaturesResponse, ApplyEditsResponse, QueryResponse};
use crate::errors::InfraError;
use crate::http::HttpClient;

/// [`FeatureStore`] backed by one ArcGIS feature layer.
pub struct FeatureLayerClient {
    http: HttpClient,
    tokens: Arc<dyn AccessTokenProvider>,
    name: String,
    layer_url: Url,
    out_spatial_reference: u32,
}

impl FeatureLayerClient {
    /// Create a client for the layer at `layer_url`
    /// (e.g. `https://.../FeatureServer/0/`).
    ///
    /// # Errors
    /// Returns `NestBufferError::Config` if `layer_url` is not a valid URL.
    pub fn new(
        http: HttpClient,
        tokens: Arc<dyn AccessTokenProvider>,
        name: impl Into<String>,
        layer_url: &str,
        out_spatial_reference: u32,
    ) -> Result<Self> {
        let mut layer_url = Url::parse(layer_url).map_err(|err| {
            NestBufferError::Config(format!("invalid feature layer URL '{layer_url}': {err}"))
        })?;
        if !layer_url.path().ends_with('/') {
            let path = format!("{}/", layer_url.path());
            layer_url.set_path(&path);
        }

        Ok(Self { http, tokens, name: name.into(), layer_url, out_spatial_reference })
    }

    pub fn layer_url(&self) -> &Url {
        &self.layer_url
    }

    fn operation_url(&self, operation: &str) -> Result<String> {
        self.layer_url
            .join(operation)
            .map(String::from)
            .map_err(|err| NestBufferError::Internal(format!("cannot build {operation} URL: {err}")))
    }
}

#[async_trait]
impl FeatureStore for FeatureLayerClient {
    fn collection(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn query(&self, predicate: &str) -> Result<Vec<Feature>> {
        let url = self.operation_url("query")?;
        let token = self.tokens.access_token().await?;
        let form = [
            ("f", "json".to_string()),
            ("token", token),
            ("where", predicate.to_string()),
            ("outSr", self.out_spatial_reference.to_string()),
            ("outFields", "*".to_string()),
        ];

        let response: QueryResponse = self.http.post_form(&url, &form).await?;
        if response.exceeded_transfer_limit {
            warn!(
                returned = response.features.len(),
                "layer reported exceededTransferLimit; result is truncated"
            );
        }

        debug!(count = response.features.len(), "query returned features");
        Ok(response.features)
    }

    #[instrument(skip(self, features), fields(collection = %self.name, count = features.len()))]
    async fn create_features(&self, features: &[Feature]) -> Result<Vec<EditResult>> {
        let url = self.operation_url("addFeatures")?;
        let token = self.tokens.access_token().await?;
        let payload = serde_json::to_string(features).map_err(InfraError::from)?;
        let form = [("f", "json".to_string()), ("token", token), ("features", payload)];

        let response: AddFeaturesResponse = self.http.post_form_once(&url, &form).await?;
        debug!(results = response.add_results.len(), "addFeatures completed");
        Ok(response.add_results)
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn delete_feature(&self, object_id: ObjectId) -> Result<EditResult> {
        let url = self.operation_url("applyEdits")?;
        let token = self.tokens.access_token().await?;
        let form = [("f", "json".to_string()), ("token", token), ("deletes", object_id.to_string())];

        let response: ApplyEditsResponse = self.http.post_form_once(&url, &form).await?;
        response.delete_results.into_iter().next().ok_or_else(|| {
            NestBufferError::InvalidData(format!("applyEdits returned no result for {object_id}"))
        })
    }
}
