//! Domain types and models
//!
//! Feature records are the generic shape exchanged with feature stores;
//! survey points and buffer features are the typed views the reconciler
//! works with.

pub mod buffer;
pub mod feature;
pub mod survey;

pub use buffer::BufferFeature;
pub use feature::{Attributes, EditError, EditResult, Feature, Geometry, ObjectId, Point, Polygon};
pub use survey::{ObservationDate, SurveyPoint};
