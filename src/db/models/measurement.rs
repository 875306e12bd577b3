use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One captured distance, geotagged. Never edited after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementPoint {
    pub id: String,
    /// Owning session.
    pub session_id: String,
    pub captured_at: DateTime<Utc>,
    pub distance_m: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// JPEG bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
}

impl MeasurementPoint {
    pub fn new(
        session_id: &str,
        captured_at: DateTime<Utc>,
        distance_m: f64,
        latitude: f64,
        longitude: f64,
        photo: Option<Vec<u8>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            captured_at,
            distance_m,
            latitude,
            longitude,
            photo,
        }
    }

    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }
}
