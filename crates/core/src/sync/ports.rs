//! Port interfaces for buffer synchronization

use async_trait::async_trait;
use nestbuffer_domain::{EditResult, Feature, ObjectId, Point, Polygon, Result};

/// Query / create / delete against one remote feature collection.
///
/// Each instance is bound to a single collection (layer).
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Short collection name used in logs and errors (e.g. `"survey"`).
    fn collection(&self) -> &str;

    /// Fetch every feature matching `predicate`, with all attributes.
    async fn query(&self, predicate: &str) -> Result<Vec<Feature>>;

    /// Create features in one batch. Results are reported per record, in
    /// submission order.
    async fn create_features(&self, features: &[Feature]) -> Result<Vec<EditResult>>;

    /// Delete a single feature by identity.
    async fn delete_feature(&self, object_id: ObjectId) -> Result<EditResult>;
}

/// Remote geometry computations
#[async_trait]
pub trait GeometryService: Send + Sync {
    /// Buffer polygon around `point` with a radius of `distance_ft` feet,
    /// with input and output in `spatial_reference`.
    async fn buffer_point(
        &self,
        point: Point,
        distance_ft: f64,
        spatial_reference: u32,
    ) -> Result<Polygon>;
}

/// Authentication session shared by the remote clients.
#[async_trait]
pub trait CredentialSession: Send + Sync {
    /// Obtain a fresh access token. Called once at the start of every pass,
    /// before any other remote call.
    async fn refresh(&self) -> Result<()>;
}
