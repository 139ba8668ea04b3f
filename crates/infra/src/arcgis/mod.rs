//! ArcGIS REST adapters for the core ports

pub mod auth;
pub mod feature_layer;
pub mod geometry;
pub mod wire;

pub use auth::{AccessTokenProvider, ArcGisSession};
pub use feature_layer::FeatureLayerClient;
pub use geometry::GeometryServiceClient;
