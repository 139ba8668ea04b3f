//! Buffer reconciliation: decides which buffers to keep, delete and create.
//!
//! Pure computation over one fetched snapshot of both layers. The plan is
//! applied by [`crate::sync::BufferSyncService`].

pub mod plan;
pub mod reconciler;

pub use plan::{PendingBuffer, ReconcilePlan};
pub use reconciler::reconcile;
