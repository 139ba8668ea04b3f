//! # NestBuffer Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The reconciliation algorithm (survey points vs. buffer features)
//! - Port/adapter interfaces (traits) for the remote services
//! - The sync service that applies a plan in the required order
//!
//! ## Architecture Principles
//! - Only depends on `nestbuffer-domain`
//! - No HTTP or file system code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod reconcile;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use reconcile::{reconcile, PendingBuffer, ReconcilePlan};
pub use sync::ports::{CredentialSession, FeatureStore, GeometryService};
pub use sync::{BufferSyncService, PassReport, PlannedPass, PurgeReport, SyncError, SyncOptions};
