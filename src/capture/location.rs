use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single WGS84 position reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: Utc::now(),
        }
    }
}

/// Source of the most recent position fix, if any.
pub trait LocationProvider: Send + Sync {
    fn latest_fix(&self) -> Option<LocationFix>;
}

/// Location slot that a platform geolocation callback keeps up to date.
#[derive(Debug, Clone, Default)]
pub struct SharedLocation {
    inner: Arc<RwLock<Option<LocationFix>>>,
}

impl SharedLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, fix: LocationFix) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(fix),
            Err(poisoned) => *poisoned.into_inner() = Some(fix),
        }
    }

    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl LocationProvider for SharedLocation {
    fn latest_fix(&self) -> Option<LocationFix> {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
