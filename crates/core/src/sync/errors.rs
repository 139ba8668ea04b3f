//! Errors raised while applying a reconciliation pass

use nestbuffer_domain::{NestBufferError, ObjectId};
use thiserror::Error;

/// Failures during a pass.
///
/// `Session` and `Fetch` abort the pass before any edit is issued. The other
/// variants are per-item and are collected in the pass report while the pass
/// carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("failed to refresh access session: {0}")]
    Session(#[source] NestBufferError),

    #[error("failed to fetch {collection} features: {source}")]
    Fetch { collection: String, source: NestBufferError },

    #[error("buffer geometry failed for survey point {orig_fid}: {source}")]
    Geometry { orig_fid: ObjectId, source: NestBufferError },

    #[error("failed to delete buffer {object_id}: {source}")]
    Deletion { object_id: ObjectId, source: NestBufferError },

    #[error("buffer batch creation failed: {0}")]
    CreationBatch(#[source] NestBufferError),

    #[error("store rejected buffer for survey point {orig_fid}: {reason}")]
    CreationRecord { orig_fid: ObjectId, reason: String },
}

impl SyncError {
    /// Whether this error stops the pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Session(_) | Self::Fetch { .. })
    }

    /// Stable label suitable for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Session(_) => "session",
            Self::Fetch { .. } => "fetch",
            Self::Geometry { .. } => "geometry",
            Self::Deletion { .. } => "deletion",
            Self::CreationBatch(_) => "creation_batch",
            Self::CreationRecord { .. } => "creation_record",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_and_fetch_are_fatal() {
        let remote = NestBufferError::Remote("boom".into());
        assert!(SyncError::Session(remote.clone()).is_fatal());
        assert!(SyncError::Fetch { collection: "survey".into(), source: remote.clone() }.is_fatal());
        assert!(!SyncError::Geometry { orig_fid: 1, source: remote.clone() }.is_fatal());
        assert!(!SyncError::Deletion { object_id: 9, source: remote.clone() }.is_fatal());
        assert!(!SyncError::CreationBatch(remote).is_fatal());
        assert!(!SyncError::CreationRecord { orig_fid: 1, reason: "x".into() }.is_fatal());
    }

    #[test]
    fn messages_name_the_item() {
        let err = SyncError::Deletion {
            object_id: 42,
            source: NestBufferError::Network("HTTP request timed out".into()),
        };
        assert_eq!(err.to_string(), "failed to delete buffer 42: Network error: HTTP request timed out");
        assert_eq!(err.kind(), "deletion");
    }
}
