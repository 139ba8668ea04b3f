//! Reconciliation of buffer features against survey points.

use std::collections::{BTreeSet, HashMap, HashSet};

use nestbuffer_domain::{BufferFeature, ObjectId, ObservationDate, SurveyPoint};
use tracing::debug;

use super::plan::{PendingBuffer, ReconcilePlan};

/// The buffer currently standing for one survey point.
#[derive(Debug, Clone, Copy)]
struct IndexedBuffer {
    object_id: ObjectId,
    observation_date: Option<ObservationDate>,
}

/// Compute the edits that bring `buffers` in line with `points`.
///
/// A buffer whose date matches its point is preserved. A buffer with a
/// different date is queued for deletion right away; the point is then
/// rebuilt if it still qualifies. Every buffer left unclaimed after the
/// point walk is an orphan and is deleted too.
pub fn reconcile(points: &[SurveyPoint], buffers: &[BufferFeature]) -> ReconcilePlan {
    let index = index_by_orig_fid(buffers);

    let mut preserve = BTreeSet::new();
    let mut to_delete = Vec::new();
    let mut queued = HashSet::new();
    let mut to_create = Vec::new();

    for point in points {
        if let Some(existing) = index.get(&point.object_id) {
            if existing.observation_date == point.observation_date {
                preserve.insert(existing.object_id);
                continue;
            }

            if !preserve.contains(&existing.object_id) && queued.insert(existing.object_id) {
                debug!(
                    orig_fid = point.object_id,
                    object_id = existing.object_id,
                    "buffer is stale, queued for deletion"
                );
                to_delete.push(existing.object_id);
            }
        }

        if !point.qualifies() {
            continue;
        }
        let Some(distance_ft) = point.buffer_distance_ft() else {
            continue;
        };

        to_create.push(PendingBuffer {
            point: point.clone(),
            attributes: point.buffer_attributes(),
            distance_ft,
        });
    }

    for buffer in buffers {
        if !preserve.contains(&buffer.object_id) && queued.insert(buffer.object_id) {
            to_delete.push(buffer.object_id);
        }
    }

    debug!(
        points = points.len(),
        buffers = buffers.len(),
        preserve = preserve.len(),
        delete = to_delete.len(),
        create = to_create.len(),
        "reconciliation complete"
    );

    ReconcilePlan { preserve, to_delete, to_create }
}

/// Map `ORIG_FID` to the buffer that represents it. On duplicates the highest
/// `OBJECTID` wins; the rest fall through to the orphan sweep.
fn index_by_orig_fid(buffers: &[BufferFeature]) -> HashMap<ObjectId, IndexedBuffer> {
    let mut index: HashMap<ObjectId, IndexedBuffer> = HashMap::with_capacity(buffers.len());

    for buffer in buffers {
        let Some(orig_fid) = buffer.orig_fid else {
            continue;
        };
        let candidate =
            IndexedBuffer { object_id: buffer.object_id, observation_date: buffer.observation_date };

        match index.get_mut(&orig_fid) {
            Some(current) => {
                debug!(
                    orig_fid,
                    kept = current.object_id.max(candidate.object_id),
                    dropped = current.object_id.min(candidate.object_id),
                    "multiple buffers share one ORIG_FID"
                );
                if candidate.object_id > current.object_id {
                    *current = candidate;
                }
            }
            None => {
                index.insert(orig_fid, candidate);
            }
        }
    }

    index
}
