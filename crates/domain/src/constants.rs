//! Field names and service constants shared across crates.

/// Identity field of the survey layer.
pub const SURVEY_OBJECT_ID_FIELD: &str = "objectid";

/// Identity field of the buffer layer, assigned by the store.
pub const BUFFER_OBJECT_ID_FIELD: &str = "OBJECTID";

/// Foreign key on a buffer referencing the survey point's `objectid`.
pub const ORIG_FID_FIELD: &str = "ORIG_FID";

pub const OBSERVATION_DATE_FIELD: &str = "observation_date";
pub const BUFFER_DISTANCE_FIELD: &str = "buffer_ft";
pub const NEST_STATUS_FIELD: &str = "nest_status";

/// Status value (compared ignoring case) that makes a point eligible for a
/// buffer.
pub const ACTIVE_NEST_STATUS: &str = "active";

/// WGS 84, used both for querying points and for buffering them.
pub const DEFAULT_SPATIAL_REFERENCE: u32 = 4326;

/// Esri linear unit code for international feet.
pub const UNIT_FOOT: u32 = 9002;

/// Predicate selecting every feature of a layer.
pub const SELECT_ALL: &str = "1=1";
