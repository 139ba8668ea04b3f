//! Buffer features derived from survey points.

use super::feature::{Feature, Geometry, ObjectId, Polygon};
use super::survey::ObservationDate;
use crate::constants::{BUFFER_OBJECT_ID_FIELD, OBSERVATION_DATE_FIELD, ORIG_FID_FIELD};
use crate::errors::Result;

/// A buffer polygon as read from the buffer layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferFeature {
    pub object_id: ObjectId,
    /// `objectid` of the originating survey point. Orphaned when absent.
    pub orig_fid: Option<ObjectId>,
    /// Copy of the source point's observation date at creation time.
    pub observation_date: Option<ObservationDate>,
    pub geometry: Option<Polygon>,
}

impl BufferFeature {
    /// Parse a buffer layer record.
    ///
    /// # Errors
    /// Returns `NestBufferError::InvalidData` if `OBJECTID` is missing, or if
    /// `ORIG_FID` / `observation_date` are present but not integers.
    pub fn from_feature(feature: Feature) -> Result<Self> {
        let object_id = feature.required_integer(BUFFER_OBJECT_ID_FIELD)?;
        let orig_fid = feature.integer_attribute(ORIG_FID_FIELD)?;
        let observation_date =
            feature.integer_attribute(OBSERVATION_DATE_FIELD)?.map(ObservationDate);
        let geometry = match feature.geometry {
            Some(Geometry::Polygon(polygon)) => Some(polygon),
            _ => None,
        };

        Ok(Self { object_id, orig_fid, observation_date, geometry })
    }
}
