//! Serde types for the ArcGIS REST payloads used by the adapters

use nestbuffer_domain::{EditResult, Feature, NestBufferError, Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ArcGIS codes meaning the token is missing, invalid or expired.
const TOKEN_ERROR_CODES: [i64; 2] = [498, 499];

/// `{"error": {...}}` body returned in place of a normal response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ArcGisError,
}

impl ErrorEnvelope {
    /// Extract the error payload if `body` is an error envelope.
    pub fn detect(body: &Value) -> Option<ArcGisError> {
        let error = body.get("error")?;
        if !error.is_object() {
            return None;
        }
        serde_json::from_value(error.clone()).ok()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArcGisError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// OAuth endpoints use `error_description` instead of `message`.
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ArcGisError {
    fn description(&self) -> String {
        let mut text = self
            .message
            .clone()
            .or_else(|| self.error_description.clone())
            .unwrap_or_else(|| "unspecified ArcGIS error".to_string());

        let details: Vec<&str> =
            self.details.iter().map(String::as_str).filter(|d| !d.is_empty()).collect();
        if !details.is_empty() {
            text.push_str(": ");
            text.push_str(&details.join("; "));
        }
        if let Some(code) = self.code {
            text.push_str(&format!(" (code {code})"));
        }
        text
    }

    pub fn into_domain(self) -> NestBufferError {
        let description = self.description();
        match self.code {
            Some(code) if TOKEN_ERROR_CODES.contains(&code) => NestBufferError::Auth(description),
            _ => NestBufferError::Remote(description),
        }
    }
}

/// `oauth2/token` response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `query` response
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub features: Vec<Feature>,
    #[serde(default, rename = "exceededTransferLimit")]
    pub exceeded_transfer_limit: bool,
}

/// `addFeatures` response
#[derive(Debug, Clone, Deserialize)]
pub struct AddFeaturesResponse {
    #[serde(rename = "addResults")]
    pub add_results: Vec<EditResult>,
}

/// `applyEdits` response; only deletions are issued through it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyEditsResponse {
    #[serde(default, rename = "deleteResults")]
    pub delete_results: Vec<EditResult>,
}

/// `geometries` parameter of the `buffer` operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferInput {
    pub geometry_type: &'static str,
    pub geometries: Vec<Point>,
}

impl BufferInput {
    pub fn point(point: Point) -> Self {
        Self { geometry_type: "esriGeometryPoint", geometries: vec![point] }
    }
}

/// `buffer` response
#[derive(Debug, Clone, Deserialize)]
pub struct BufferResponse {
    pub geometries: Vec<Polygon>,
}
