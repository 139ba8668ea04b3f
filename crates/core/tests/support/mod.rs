//! Shared test helpers for `nestbuffer-core` integration tests.
//!
//! In-memory fakes for every port, all writing to one shared call log so
//! tests can assert on the order of remote effects across services.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nestbuffer_core::{CredentialSession, FeatureStore, GeometryService};
use nestbuffer_domain::{
    EditResult, Feature, NestBufferError, ObjectId, Point, Polygon, Result as DomainResult,
};
use serde_json::{json, Value};

/// Ordered record of every remote call made during a test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// In-memory feature collection with failure injection.
pub struct InMemoryFeatureStore {
    name: String,
    log: CallLog,
    features: Mutex<Vec<Feature>>,
    next_object_id: Mutex<ObjectId>,
    fail_query: bool,
    fail_create_batch: bool,
    failing_deletes: HashSet<ObjectId>,
    refused_deletes: HashSet<ObjectId>,
    rejected_orig_fids: HashSet<ObjectId>,
}

impl InMemoryFeatureStore {
    pub fn new(name: &str, log: CallLog, features: Vec<Feature>) -> Self {
        Self {
            name: name.to_string(),
            log,
            features: Mutex::new(features),
            next_object_id: Mutex::new(1000),
            fail_query: false,
            fail_create_batch: false,
            failing_deletes: HashSet::new(),
            refused_deletes: HashSet::new(),
            rejected_orig_fids: HashSet::new(),
        }
    }

    pub fn failing_query(mut self) -> Self {
        self.fail_query = true;
        self
    }

    pub fn failing_create_batch(mut self) -> Self {
        self.fail_create_batch = true;
        self
    }

    pub fn failing_delete(mut self, object_id: ObjectId) -> Self {
        self.failing_deletes.insert(object_id);
        self
    }

    /// Answer deletes of `object_id` with `success: false`.
    pub fn refusing_delete(mut self, object_id: ObjectId) -> Self {
        self.refused_deletes.insert(object_id);
        self
    }

    pub fn rejecting(mut self, orig_fid: ObjectId) -> Self {
        self.rejected_orig_fids.insert(orig_fid);
        self
    }

    pub fn snapshot(&self) -> Vec<Feature> {
        self.features.lock().unwrap().clone()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.snapshot()
            .iter()
            .filter_map(|f| f.attributes.get("OBJECTID").and_then(Value::as_i64))
            .collect()
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    fn collection(&self) -> &str {
        &self.name
    }

    async fn query(&self, predicate: &str) -> DomainResult<Vec<Feature>> {
        self.log.record(format!("query:{}", self.name));
        assert_eq!(predicate, "1=1", "passes must fetch full snapshots");
        if self.fail_query {
            return Err(NestBufferError::Network("connection refused".into()));
        }
        Ok(self.snapshot())
    }

    async fn create_features(&self, features: &[Feature]) -> DomainResult<Vec<EditResult>> {
        self.log.record(format!("create:{}", features.len()));
        if self.fail_create_batch {
            return Err(NestBufferError::Remote("Unable to complete operation.".into()));
        }

        let mut stored = self.features.lock().unwrap();
        let mut next = self.next_object_id.lock().unwrap();
        let mut results = Vec::with_capacity(features.len());
        for feature in features {
            let orig_fid = feature.attributes.get("ORIG_FID").and_then(Value::as_i64);
            if orig_fid.is_some_and(|id| self.rejected_orig_fids.contains(&id)) {
                results.push(EditResult::failed(None, "Field ORIG_FID rejected"));
                continue;
            }

            *next += 1;
            let mut created = feature.clone();
            created.attributes.insert("OBJECTID".into(), json!(*next));
            stored.push(created);
            results.push(EditResult::succeeded(*next));
        }
        Ok(results)
    }

    async fn delete_feature(&self, object_id: ObjectId) -> DomainResult<EditResult> {
        self.log.record(format!("delete:{object_id}"));
        if self.failing_deletes.contains(&object_id) {
            return Err(NestBufferError::Network("HTTP request timed out".into()));
        }
        if self.refused_deletes.contains(&object_id) {
            return Ok(EditResult::failed(Some(object_id), "Edit rejected by layer"));
        }

        let mut stored = self.features.lock().unwrap();
        let before = stored.len();
        stored.retain(|f| f.attributes.get("OBJECTID").and_then(Value::as_i64) != Some(object_id));
        if stored.len() == before {
            return Ok(EditResult::failed(Some(object_id), "Object not found"));
        }
        Ok(EditResult::succeeded(object_id))
    }
}

/// Geometry service returning a small square around the point.
///
/// Survey fixtures place point `n` at `x = n`, so failures are injected by
/// survey point id.
#[derive(Clone)]
pub struct StubGeometryService {
    log: CallLog,
    failing_points: HashSet<ObjectId>,
    empty_points: HashSet<ObjectId>,
    delay: Duration,
}

impl StubGeometryService {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing_points: HashSet::new(),
            empty_points: HashSet::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn failing_for(mut self, point_id: ObjectId) -> Self {
        self.failing_points.insert(point_id);
        self
    }

    pub fn empty_for(mut self, point_id: ObjectId) -> Self {
        self.empty_points.insert(point_id);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl GeometryService for StubGeometryService {
    async fn buffer_point(
        &self,
        point: Point,
        distance_ft: f64,
        spatial_reference: u32,
    ) -> DomainResult<Polygon> {
        let point_id = point.x as ObjectId;
        self.log.record(format!("buffer:{point_id}"));
        assert_eq!(spatial_reference, 4326);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_points.contains(&point_id) {
            return Err(NestBufferError::Remote("Unable to complete operation.".into()));
        }
        if self.empty_points.contains(&point_id) {
            return Ok(Polygon::default());
        }

        let d = distance_ft / 364_000.0;
        Ok(Polygon::new(vec![vec![
            vec![point.x - d, point.y - d],
            vec![point.x - d, point.y + d],
            vec![point.x + d, point.y + d],
            vec![point.x + d, point.y - d],
            vec![point.x - d, point.y - d],
        ]]))
    }
}

/// Session that records refreshes.
pub struct StubSession {
    log: CallLog,
    fail: bool,
}

impl StubSession {
    pub fn new(log: CallLog) -> Self {
        Self { log, fail: false }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { log, fail: true }
    }
}

#[async_trait]
impl CredentialSession for StubSession {
    async fn refresh(&self) -> DomainResult<()> {
        self.log.record("refresh");
        if self.fail {
            return Err(NestBufferError::Auth("invalid_client".into()));
        }
        Ok(())
    }
}

/// Survey record for point `id` at `x = id`.
pub fn survey_feature(id: ObjectId, date: i64, buffer_ft: Value, status: &str) -> Feature {
    serde_json::from_value(json!({
        "attributes": {
            "objectid": id,
            "observation_date": date,
            "buffer_ft": buffer_ft,
            "nest_status": status,
            "observer": null,
            "species": "osprey"
        },
        "geometry": {"x": id as f64, "y": 38.5}
    }))
    .unwrap()
}

pub fn active_survey(id: ObjectId, date: i64) -> Feature {
    survey_feature(id, date, json!(100), "active")
}

pub fn buffer_feature(object_id: ObjectId, orig_fid: ObjectId, date: i64) -> Feature {
    serde_json::from_value(json!({
        "attributes": {
            "OBJECTID": object_id,
            "ORIG_FID": orig_fid,
            "observation_date": date
        },
        "geometry": {"rings": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]]}
    }))
    .unwrap()
}
