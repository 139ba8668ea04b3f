//! Output of a reconciliation run.

use std::collections::BTreeSet;

use nestbuffer_domain::{Attributes, ObjectId, SurveyPoint};

/// A survey point that needs a freshly computed buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBuffer {
    pub point: SurveyPoint,
    /// Sanitized attributes for the new buffer feature (`ORIG_FID` set, nulls
    /// dropped).
    pub attributes: Attributes,
    pub distance_ft: f64,
}

impl PendingBuffer {
    pub fn orig_fid(&self) -> ObjectId {
        self.point.object_id
    }
}

/// Decisions for one snapshot of the survey and buffer layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Buffers that are already correct and must not be touched.
    pub preserve: BTreeSet<ObjectId>,
    /// Buffers to remove: stale ones in survey order, then orphans in buffer
    /// order. Never contains duplicates or preserved ids.
    pub to_delete: Vec<ObjectId>,
    pub to_create: Vec<PendingBuffer>,
}

impl ReconcilePlan {
    /// True when the buffer layer is already in sync.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }
}
