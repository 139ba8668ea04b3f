//! Buffer synchronization: ports, the pass driver, and its reports.

pub mod errors;
pub mod ports;
pub mod report;
pub mod service;

pub use errors::SyncError;
pub use ports::{CredentialSession, FeatureStore, GeometryService};
pub use report::{PassReport, PlannedPass, PurgeReport};
pub use service::{BufferSyncService, SyncOptions};
