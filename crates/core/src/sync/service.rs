//! Buffer sync service - drives one reconciliation pass end to end

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use nestbuffer_domain::constants::{DEFAULT_SPATIAL_REFERENCE, SELECT_ALL};
use nestbuffer_domain::{
    BufferFeature, EditResult, Feature, NestBufferError, ObjectId, Polygon, Result, SurveyPoint,
    SyncConfig,
};
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::errors::SyncError;
use super::ports::{CredentialSession, FeatureStore, GeometryService};
use super::report::{PassReport, PlannedPass, PurgeReport};
use crate::reconcile::{reconcile, PendingBuffer};

/// Tuning for a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// WKID passed to the geometry service
    pub spatial_reference: u32,
    /// Maximum concurrent geometry or delete calls
    pub max_parallel: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { spatial_reference: DEFAULT_SPATIAL_REFERENCE, max_parallel: 4 }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self { spatial_reference: config.spatial_reference, max_parallel: config.max_parallel }
    }
}

/// One consistent read of both layers.
struct Snapshot {
    points: Vec<SurveyPoint>,
    buffers: Vec<BufferFeature>,
}

/// Keeps the buffer layer in sync with the survey layer.
///
/// Passes are single-flight: concurrent callers wait for the running pass to
/// finish before starting their own.
pub struct BufferSyncService {
    session: Arc<dyn CredentialSession>,
    survey_store: Arc<dyn FeatureStore>,
    buffer_store: Arc<dyn FeatureStore>,
    geometry: Arc<dyn GeometryService>,
    options: SyncOptions,
    pass_guard: Mutex<()>,
}

impl BufferSyncService {
    /// Create a new sync service
    pub fn new(
        session: Arc<dyn CredentialSession>,
        survey_store: Arc<dyn FeatureStore>,
        buffer_store: Arc<dyn FeatureStore>,
        geometry: Arc<dyn GeometryService>,
    ) -> Self {
        Self {
            session,
            survey_store,
            buffer_store,
            geometry,
            options: SyncOptions::default(),
            pass_guard: Mutex::new(()),
        }
    }

    /// Override the default pass options.
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = SyncOptions { max_parallel: options.max_parallel.max(1), ..options };
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one full reconciliation pass.
    ///
    /// Order of effects: session refresh, snapshot fetch, deletions, geometry
    /// computation, then a single creation batch. Per-item failures are
    /// collected in the report.
    ///
    /// # Errors
    /// Returns `SyncError::Session` or `SyncError::Fetch` when the pass cannot
    /// obtain a complete snapshot; no edits are issued in that case.
    pub async fn run_pass(&self) -> std::result::Result<PassReport, SyncError> {
        let _guard = self.pass_guard.lock().await;
        let pass_id = Uuid::new_v4();
        self.execute_pass(pass_id).instrument(info_span!("buffer_pass", %pass_id)).await
    }

    /// Compute the plan for the current state without applying it.
    ///
    /// # Errors
    /// Same abort conditions as [`Self::run_pass`].
    pub async fn plan(&self) -> std::result::Result<PlannedPass, SyncError> {
        let _guard = self.pass_guard.lock().await;

        self.refresh_session().await?;
        let snapshot = self.fetch_snapshot().await?;
        let plan = reconcile(&snapshot.points, &snapshot.buffers);

        Ok(PlannedPass {
            points_fetched: snapshot.points.len(),
            buffers_fetched: snapshot.buffers.len(),
            plan,
        })
    }

    /// Delete every buffer in the buffer layer.
    ///
    /// # Errors
    /// Returns `SyncError::Session` or `SyncError::Fetch` if the buffer layer
    /// cannot be read; individual delete failures are reported instead.
    pub async fn purge(&self) -> std::result::Result<PurgeReport, SyncError> {
        let _guard = self.pass_guard.lock().await;

        self.refresh_session().await?;
        let buffers = self.fetch_buffers().await?;
        let ids: Vec<ObjectId> = buffers.iter().map(|buffer| buffer.object_id).collect();

        info!(buffers = ids.len(), "purging buffer layer");

        let mut failures = Vec::new();
        let deleted = self.delete_buffers(&ids, &mut failures).await;

        Ok(PurgeReport { buffers_fetched: buffers.len(), deleted, failures })
    }

    async fn execute_pass(&self, pass_id: Uuid) -> std::result::Result<PassReport, SyncError> {
        let started_at = Utc::now();
        info!("starting buffer sync pass");

        self.refresh_session().await?;
        let snapshot = self.fetch_snapshot().await?;
        let plan = reconcile(&snapshot.points, &snapshot.buffers);

        info!(
            points = snapshot.points.len(),
            buffers = snapshot.buffers.len(),
            preserve = plan.preserve.len(),
            delete = plan.to_delete.len(),
            create = plan.to_create.len(),
            "reconciliation plan computed"
        );

        let mut failures = Vec::new();
        let deleted = self.delete_buffers(&plan.to_delete, &mut failures).await;
        let records = self.compute_geometries(&plan.to_create, &mut failures).await;
        let created = self.create_buffers(records, &mut failures).await;

        let report = PassReport {
            pass_id,
            started_at,
            finished_at: Utc::now(),
            points_fetched: snapshot.points.len(),
            buffers_fetched: snapshot.buffers.len(),
            preserved: plan.preserve.len(),
            deleted,
            created,
            failures,
        };

        if report.is_clean() {
            info!(
                deleted = report.deleted.len(),
                created = report.created.len(),
                elapsed_ms = report.elapsed().num_milliseconds(),
                "buffer sync pass complete"
            );
        } else {
            warn!(
                deleted = report.deleted.len(),
                created = report.created.len(),
                failures = report.failures.len(),
                elapsed_ms = report.elapsed().num_milliseconds(),
                "buffer sync pass completed with failures"
            );
        }

        Ok(report)
    }

    async fn refresh_session(&self) -> std::result::Result<(), SyncError> {
        self.session.refresh().await.map_err(SyncError::Session)
    }

    async fn fetch_snapshot(&self) -> std::result::Result<Snapshot, SyncError> {
        let (points, buffers) = tokio::try_join!(self.fetch_points(), self.fetch_buffers())?;
        Ok(Snapshot { points, buffers })
    }

    async fn fetch_points(&self) -> std::result::Result<Vec<SurveyPoint>, SyncError> {
        fetch_parsed(self.survey_store.as_ref(), SurveyPoint::from_feature).await
    }

    async fn fetch_buffers(&self) -> std::result::Result<Vec<BufferFeature>, SyncError> {
        fetch_parsed(self.buffer_store.as_ref(), BufferFeature::from_feature).await
    }

    async fn delete_buffers(
        &self,
        ids: &[ObjectId],
        failures: &mut Vec<SyncError>,
    ) -> Vec<ObjectId> {
        let store = Arc::clone(&self.buffer_store);
        let outcomes: Vec<(ObjectId, Result<EditResult>)> = stream::iter(ids.to_vec())
            .map(move |object_id| {
                let store = Arc::clone(&store);
                async move { (object_id, store.delete_feature(object_id).await) }
            })
            .buffered(self.options.max_parallel)
            .collect()
            .await;

        let mut deleted = Vec::with_capacity(outcomes.len());
        for (object_id, outcome) in outcomes {
            let error = match outcome {
                Ok(result) if result.success => {
                    debug!(object_id, "buffer deleted");
                    deleted.push(object_id);
                    continue;
                }
                Ok(result) => NestBufferError::Remote(result.failure_reason().unwrap_or_default()),
                Err(err) => err,
            };

            warn!(object_id, error = %error, "failed to delete buffer");
            failures.push(SyncError::Deletion { object_id, source: error });
        }

        deleted
    }

    async fn compute_geometries(
        &self,
        pending: &[PendingBuffer],
        failures: &mut Vec<SyncError>,
    ) -> Vec<(ObjectId, Feature)> {
        let geometry = Arc::clone(&self.geometry);
        let spatial_reference = self.options.spatial_reference;

        let outcomes: Vec<(PendingBuffer, Result<Polygon>)> = stream::iter(pending.to_vec())
            .map(move |item| {
                let geometry = Arc::clone(&geometry);
                async move {
                    let polygon = match item.point.location {
                        Some(location) => {
                            geometry.buffer_point(location, item.distance_ft, spatial_reference).await
                        }
                        None => Err(NestBufferError::InvalidData(format!(
                            "survey point {} has no geometry",
                            item.orig_fid()
                        ))),
                    };
                    (item, polygon)
                }
            })
            .buffered(self.options.max_parallel)
            .collect()
            .await;

        let mut records = Vec::with_capacity(outcomes.len());
        for (item, outcome) in outcomes {
            let orig_fid = item.orig_fid();
            match outcome {
                Ok(polygon) if !polygon.is_empty() => {
                    records.push((orig_fid, Feature::polygon(item.attributes, polygon)));
                }
                Ok(_) => {
                    warn!(orig_fid, "geometry service returned an empty polygon");
                    failures.push(SyncError::Geometry {
                        orig_fid,
                        source: NestBufferError::InvalidData("empty buffer polygon".into()),
                    });
                }
                Err(error) => {
                    warn!(orig_fid, error = %error, "failed to compute buffer geometry");
                    failures.push(SyncError::Geometry { orig_fid, source: error });
                }
            }
        }

        records
    }

    async fn create_buffers(
        &self,
        records: Vec<(ObjectId, Feature)>,
        failures: &mut Vec<SyncError>,
    ) -> Vec<ObjectId> {
        if records.is_empty() {
            return Vec::new();
        }

        let (orig_fids, features): (Vec<ObjectId>, Vec<Feature>) = records.into_iter().unzip();
        let results = match self.buffer_store.create_features(&features).await {
            Ok(results) => results,
            Err(error) => {
                warn!(count = features.len(), error = %error, "buffer batch creation failed");
                failures.push(SyncError::CreationBatch(error));
                return Vec::new();
            }
        };

        if results.len() != orig_fids.len() {
            warn!(
                submitted = orig_fids.len(),
                reported = results.len(),
                "store reported a different number of add results than submitted"
            );
        }

        let mut created = Vec::with_capacity(results.len());
        let mut results = results.into_iter();
        for orig_fid in orig_fids {
            match results.next() {
                Some(EditResult { success: true, object_id: Some(object_id), .. }) => {
                    debug!(orig_fid, object_id, "buffer created");
                    created.push(object_id);
                }
                Some(result) => {
                    let reason = result
                        .failure_reason()
                        .unwrap_or_else(|| "store did not assign an object id".to_string());
                    warn!(orig_fid, reason = %reason, "store rejected buffer");
                    failures.push(SyncError::CreationRecord { orig_fid, reason });
                }
                None => {
                    failures.push(SyncError::CreationRecord {
                        orig_fid,
                        reason: "store reported no result for this record".into(),
                    });
                }
            }
        }

        created
    }
}

async fn fetch_parsed<T>(
    store: &dyn FeatureStore,
    parse: fn(Feature) -> Result<T>,
) -> std::result::Result<Vec<T>, SyncError> {
    let collection = store.collection().to_string();
    let fetch_error =
        |source: NestBufferError| SyncError::Fetch { collection: collection.clone(), source };

    let features = store.query(SELECT_ALL).await.map_err(fetch_error)?;
    let parsed = features.into_iter().map(parse).collect::<Result<Vec<T>>>().map_err(fetch_error)?;

    debug!(collection = %collection, count = parsed.len(), "fetched features");
    Ok(parsed)
}
