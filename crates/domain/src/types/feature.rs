//! Generic feature records as exchanged with a feature store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{NestBufferError, Result};

/// Store-assigned integer identity of a feature.
pub type ObjectId = i64;

/// Attribute mapping of a feature (field name -> JSON value).
pub type Attributes = Map<String, Value>;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Polygon as a list of rings; each ring is a list of coordinate tuples.
///
/// Coordinates are kept as plain vectors because services may append z/m
/// values to the x/y pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Vec<Vec<f64>>>,
}

impl Polygon {
    pub fn new(rings: Vec<Vec<Vec<f64>>>) -> Self {
        Self { rings }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(Vec::is_empty)
    }
}

/// Feature geometry. Only the two shapes this system handles are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Point(Point),
    Polygon(Polygon),
}

/// A feature record: attributes plus optional geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(attributes: Attributes, geometry: Option<Geometry>) -> Self {
        Self { attributes, geometry }
    }

    /// Build a polygon feature ready for submission to a store.
    pub fn polygon(attributes: Attributes, polygon: Polygon) -> Self {
        Self { attributes, geometry: Some(Geometry::Polygon(polygon)) }
    }

    /// Attribute value, treating JSON `null` the same as a missing field.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|value| !value.is_null())
    }

    /// Optional integer attribute.
    ///
    /// # Errors
    /// Returns `NestBufferError::InvalidData` when the value is present but is
    /// not an integral number.
    pub fn integer_attribute(&self, name: &str) -> Result<Option<i64>> {
        self.attribute(name).map(|value| integer_value(name, value)).transpose()
    }

    /// Required integer attribute.
    ///
    /// # Errors
    /// Returns `NestBufferError::InvalidData` when the value is missing, null,
    /// or not an integral number.
    pub fn required_integer(&self, name: &str) -> Result<i64> {
        self.integer_attribute(name)?.ok_or_else(|| {
            NestBufferError::InvalidData(format!("feature is missing required field '{name}'"))
        })
    }
}

fn integer_value(name: &str, value: &Value) -> Result<i64> {
    if let Some(int) = value.as_i64() {
        return Ok(int);
    }
    // Some services encode integer fields as doubles (e.g. `12.0`).
    match value.as_f64() {
        Some(float) if float.fract() == 0.0 && float.is_finite() => Ok(float as i64),
        _ => Err(NestBufferError::InvalidData(format!(
            "field '{name}' is not an integer: {value}"
        ))),
    }
}

/// Outcome of a single add/delete edit as reported by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    #[serde(default)]
    pub object_id: Option<ObjectId>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EditError>,
}

impl EditResult {
    pub fn succeeded(object_id: ObjectId) -> Self {
        Self { object_id: Some(object_id), success: true, error: None }
    }

    pub fn failed(object_id: Option<ObjectId>, description: impl Into<String>) -> Self {
        Self {
            object_id,
            success: false,
            error: Some(EditError { code: None, description: Some(description.into()) }),
        }
    }

    /// Human readable failure reason, if any.
    pub fn failure_reason(&self) -> Option<String> {
        if self.success {
            return None;
        }
        let reason = self
            .error
            .as_ref()
            .and_then(|err| match (&err.description, err.code) {
                (Some(description), Some(code)) => Some(format!("{description} (code {code})")),
                (Some(description), None) => Some(description.clone()),
                (None, Some(code)) => Some(format!("edit rejected with code {code}")),
                (None, None) => None,
            })
            .unwrap_or_else(|| "edit rejected without details".to_string());
        Some(reason)
    }
}

/// Error detail attached to a failed edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}
