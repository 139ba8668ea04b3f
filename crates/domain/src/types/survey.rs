//! Survey point observations (the source side of reconciliation).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::feature::{Attributes, Feature, Geometry, ObjectId, Point};
use crate::constants::{
    ACTIVE_NEST_STATUS, BUFFER_DISTANCE_FIELD, NEST_STATUS_FIELD, OBSERVATION_DATE_FIELD,
    ORIG_FID_FIELD, SURVEY_OBJECT_ID_FIELD,
};
use crate::errors::{NestBufferError, Result};

/// Observation timestamp in epoch milliseconds, as stored by the feature
/// service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationDate(pub i64);

impl ObservationDate {
    pub fn as_millis(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(at) => write!(f, "{}", at.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// A survey point as read from the survey layer.
///
/// Owned by the upstream survey system; never modified here.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyPoint {
    pub object_id: ObjectId,
    pub observation_date: Option<ObservationDate>,
    /// `None` when the record carries no geometry. Only matters for points
    /// that need a buffer.
    pub location: Option<Point>,
    /// Every attribute of the record, including `objectid`.
    pub attributes: Attributes,
}

impl SurveyPoint {
    /// Parse a survey layer record.
    ///
    /// # Errors
    /// Returns `NestBufferError::InvalidData` if `objectid` is missing or not
    /// an integer, `observation_date` is present but not an integer, or the
    /// geometry is present but not a finite point.
    pub fn from_feature(feature: Feature) -> Result<Self> {
        let object_id = feature.required_integer(SURVEY_OBJECT_ID_FIELD)?;
        let observation_date =
            feature.integer_attribute(OBSERVATION_DATE_FIELD)?.map(ObservationDate);

        let location = match feature.geometry {
            Some(Geometry::Point(point)) if point.is_finite() => Some(point),
            Some(Geometry::Point(_)) => {
                return Err(NestBufferError::InvalidData(format!(
                    "survey point {object_id} has non-finite coordinates"
                )))
            }
            Some(Geometry::Polygon(_)) => {
                return Err(NestBufferError::InvalidData(format!(
                    "survey point {object_id} has polygon geometry"
                )))
            }
            None => None,
        };

        Ok(Self { object_id, observation_date, location, attributes: feature.attributes })
    }

    /// Buffer radius in feet, if the point carries a usable one.
    ///
    /// Null, zero, negative, non-finite and non-numeric values all mean "no
    /// buffer".
    pub fn buffer_distance_ft(&self) -> Option<f64> {
        self.attributes
            .get(BUFFER_DISTANCE_FIELD)
            .and_then(Value::as_f64)
            .filter(|distance| distance.is_finite() && *distance > 0.0)
    }

    /// Whether `nest_status` is "active", ignoring case.
    pub fn is_active(&self) -> bool {
        self.attributes
            .get(NEST_STATUS_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|status| status.eq_ignore_ascii_case(ACTIVE_NEST_STATUS))
    }

    /// A point qualifies for a buffer when it has a positive radius and an
    /// active nest.
    pub fn qualifies(&self) -> bool {
        self.buffer_distance_ft().is_some() && self.is_active()
    }

    /// Attributes for the buffer feature derived from this point.
    ///
    /// `objectid` is renamed to `ORIG_FID` and null values are dropped.
    pub fn buffer_attributes(&self) -> Attributes {
        let mut sanitized = Attributes::new();
        for (key, value) in &self.attributes {
            if key == SURVEY_OBJECT_ID_FIELD {
                sanitized.insert(ORIG_FID_FIELD.to_string(), Value::from(self.object_id));
            } else if !value.is_null() {
                sanitized.insert(key.clone(), value.clone());
            }
        }
        sanitized
            .entry(ORIG_FID_FIELD.to_string())
            .or_insert_with(|| Value::from(self.object_id));
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn point(attributes: Value) -> SurveyPoint {
        let feature: Feature = serde_json::from_value(json!({
            "attributes": attributes,
            "geometry": {"x": -120.1, "y": 38.2}
        }))
        .unwrap();
        SurveyPoint::from_feature(feature).unwrap()
    }

    #[test]
    fn parses_identity_date_and_location() {
        let p = point(json!({"objectid": 7, "observation_date": 1_700_000_000_000_i64}));
        assert_eq!(p.object_id, 7);
        assert_eq!(p.observation_date, Some(ObservationDate(1_700_000_000_000)));
        assert_eq!(p.location, Some(Point::new(-120.1, 38.2)));
    }

    #[test]
    fn missing_geometry_parses_without_location() {
        let no_geometry: Feature =
            serde_json::from_value(json!({"attributes": {"objectid": 1, "buffer_ft": 0}})).unwrap();
        let parsed = SurveyPoint::from_feature(no_geometry).unwrap();
        assert_eq!(parsed.object_id, 1);
        assert_eq!(parsed.location, None);
    }

    #[test]
    fn rejects_polygon_geometry_and_missing_identity() {
        let polygon: Feature = serde_json::from_value(json!({
            "attributes": {"objectid": 1},
            "geometry": {"rings": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]]}
        }))
        .unwrap();
        assert!(matches!(SurveyPoint::from_feature(polygon), Err(NestBufferError::InvalidData(_))));

        let no_id: Feature =
            serde_json::from_value(json!({"attributes": {}, "geometry": {"x": 1.0, "y": 2.0}}))
                .unwrap();
        assert!(matches!(SurveyPoint::from_feature(no_id), Err(NestBufferError::InvalidData(_))));
    }

    #[test]
    fn qualification_requires_positive_distance_and_active_status() {
        assert!(point(json!({"objectid": 1, "buffer_ft": 50, "nest_status": "active"})).qualifies());
        assert!(point(json!({"objectid": 1, "buffer_ft": 50, "nest_status": "Active"})).qualifies());
        assert!(point(json!({"objectid": 1, "buffer_ft": 50, "nest_status": "ACTIVE"})).qualifies());

        assert!(!point(json!({"objectid": 1, "buffer_ft": 0, "nest_status": "active"})).qualifies());
        assert!(!point(json!({"objectid": 1, "buffer_ft": null, "nest_status": "active"}))
            .qualifies());
        assert!(!point(json!({"objectid": 1, "nest_status": "active"})).qualifies());
        assert!(!point(json!({"objectid": 1, "buffer_ft": -5, "nest_status": "active"}))
            .qualifies());
        assert!(!point(json!({"objectid": 1, "buffer_ft": 50, "nest_status": "inactive"}))
            .qualifies());
        assert!(!point(json!({"objectid": 1, "buffer_ft": 50})).qualifies());
    }

    #[test]
    fn buffer_attributes_rename_identity_and_drop_nulls() {
        let p = point(json!({
            "objectid": 42,
            "observation_date": 1000,
            "buffer_ft": 250.0,
            "nest_status": "active",
            "notes": null,
            "species": "osprey"
        }));

        let attrs = p.buffer_attributes();
        assert_eq!(attrs.get("ORIG_FID"), Some(&json!(42)));
        assert!(!attrs.contains_key("objectid"));
        assert!(!attrs.contains_key("notes"));
        assert_eq!(attrs.get("species"), Some(&json!("osprey")));
        assert_eq!(attrs.get("observation_date"), Some(&json!(1000)));
        assert_eq!(attrs.get("buffer_ft"), Some(&json!(250.0)));
    }

    #[test]
    fn observation_date_displays_as_rfc3339() {
        assert_eq!(ObservationDate(0).to_string(), "1970-01-01T00:00:00+00:00");
    }
}
