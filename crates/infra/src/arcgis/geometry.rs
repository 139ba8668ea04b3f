//! Geometry service client (`buffer`)

use async_trait::async_trait;
use nestbuffer_core::GeometryService;
use nestbuffer_domain::constants::UNIT_FOOT;
use nestbuffer_domain::{NestBufferError, Point, Polygon, Result};
use tracing::instrument;

use super::wire::{BufferInput, BufferResponse};
use crate::errors::InfraError;
use crate::http::HttpClient;

/// [`GeometryService`] backed by an ArcGIS `GeometryServer`.
///
/// The public geometry service is called without a token.
pub struct GeometryServiceClient {
    http: HttpClient,
    buffer_url: String,
}

impl GeometryServiceClient {
    pub fn new(http: HttpClient, service_url: &str) -> Self {
        let buffer_url = format!("{}/buffer", service_url.trim_end_matches('/'));
        Self { http, buffer_url }
    }
}

#[async_trait]
impl GeometryService for GeometryServiceClient {
    #[instrument(skip(self))]
    async fn buffer_point(&self, point: Point, distance_ft: f64, spatial_reference: u32) -> Result<Polygon> {
        let geometries = serde_json::to_string(&BufferInput::point(point)).map_err(InfraError::from)?;
        let form = [
            ("f", "json".to_string()),
            ("inSR", spatial_reference.to_string()),
            ("unit", UNIT_FOOT.to_string()),
            ("distances", distance_ft.to_string()),
            ("geometries", geometries),
        ];

        let response: BufferResponse = self.http.post_form(&self.buffer_url, &form).await?;
        response
            .geometries
            .into_iter()
            .next()
            .ok_or_else(|| NestBufferError::InvalidData("buffer response contained no geometries".into()))
    }
}
