//! Outcome records for passes.

use chrono::{DateTime, Utc};
use nestbuffer_domain::ObjectId;
use uuid::Uuid;

use super::errors::SyncError;
use crate::reconcile::ReconcilePlan;

/// Result of a completed reconciliation pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub points_fetched: usize,
    pub buffers_fetched: usize,
    pub preserved: usize,
    /// Buffers confirmed deleted by the store.
    pub deleted: Vec<ObjectId>,
    /// Identities assigned by the store to newly created buffers.
    pub created: Vec<ObjectId>,
    /// Per-item failures; the pass continued past each of them.
    pub failures: Vec<SyncError>,
}

impl PassReport {
    /// True when every planned edit went through.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Decisions for the current state, computed without applying them.
#[derive(Debug, Clone)]
pub struct PlannedPass {
    pub points_fetched: usize,
    pub buffers_fetched: usize,
    pub plan: ReconcilePlan,
}

/// Result of removing every buffer from the buffer layer.
#[derive(Debug, Clone, Default)]
pub struct PurgeReport {
    pub buffers_fetched: usize,
    pub deleted: Vec<ObjectId>,
    pub failures: Vec<SyncError>,
}
