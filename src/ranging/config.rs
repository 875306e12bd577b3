use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

pub const MIN_ROI_FRACTION: f32 = 0.01;
pub const MAX_OFFSET: f32 = 0.5;

/// Tunables for the sampling window and temporal smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangingConfig {
    /// Side of the square sampling window as a fraction of frame width/height.
    pub roi_fraction: f32,
    /// Number of recent frame averages kept for the moving average.
    pub smoothing_window: usize,
    pub use_smoothed_source: bool,
    /// Window center offset from the frame center, as a fraction of frame size.
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            roi_fraction: 0.1,
            smoothing_window: 5,
            use_smoothed_source: true,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl RangingConfig {
    /// Brings every field back into its legal range. Non-finite floats fall back to
    /// the default for that field.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.roi_fraction = clamp_roi(self.roi_fraction).unwrap_or(defaults.roi_fraction);
        self.smoothing_window = self.smoothing_window.max(1);
        self.offset_x = clamp_offset(self.offset_x).unwrap_or(defaults.offset_x);
        self.offset_y = clamp_offset(self.offset_y).unwrap_or(defaults.offset_y);
        self
    }
}

fn clamp_roi(value: f32) -> Option<f32> {
    value
        .is_finite()
        .then(|| value.clamp(MIN_ROI_FRACTION, 1.0))
}

fn clamp_offset(value: f32) -> Option<f32> {
    value
        .is_finite()
        .then(|| value.clamp(-MAX_OFFSET, MAX_OFFSET))
}

/// Handle to one `RangingConfig` shared between the ranging engine and whoever
/// adjusts it. Each setter replaces a single field; readers take a snapshot per frame.
#[derive(Debug, Clone, Default)]
pub struct SharedRangingConfig {
    inner: Arc<RwLock<RangingConfig>>,
}

impl SharedRangingConfig {
    pub fn new(config: RangingConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config.sanitized())),
        }
    }

    pub fn snapshot(&self) -> RangingConfig {
        self.read().clone()
    }

    pub fn replace(&self, config: RangingConfig) {
        *self.write() = config.sanitized();
    }

    /// Non-finite input is ignored.
    pub fn set_roi_fraction(&self, value: f32) {
        if let Some(value) = clamp_roi(value) {
            self.write().roi_fraction = value;
        }
    }

    pub fn set_smoothing_window(&self, value: usize) {
        self.write().smoothing_window = value.max(1);
    }

    pub fn set_use_smoothed_source(&self, value: bool) {
        self.write().use_smoothed_source = value;
    }

    pub fn set_offset(&self, offset_x: f32, offset_y: f32) {
        let mut guard = self.write();
        if let Some(x) = clamp_offset(offset_x) {
            guard.offset_x = x;
        }
        if let Some(y) = clamp_offset(offset_y) {
            guard.offset_y = y;
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RangingConfig> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, RangingConfig> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp_into_range() {
        let shared = SharedRangingConfig::default();
        shared.set_roi_fraction(3.0);
        shared.set_smoothing_window(0);
        shared.set_offset(-0.9, 0.75);

        let config = shared.snapshot();
        assert_eq!(config.roi_fraction, 1.0);
        assert_eq!(config.smoothing_window, 1);
        assert_eq!(config.offset_x, -0.5);
        assert_eq!(config.offset_y, 0.5);

        shared.set_roi_fraction(-1.0);
        assert_eq!(shared.snapshot().roi_fraction, MIN_ROI_FRACTION);
    }

    #[test]
    fn non_finite_roi_keeps_previous_value() {
        let shared = SharedRangingConfig::default();
        shared.set_roi_fraction(0.4);
        shared.set_roi_fraction(f32::NAN);
        assert_eq!(shared.snapshot().roi_fraction, 0.4);
    }

    #[test]
    fn clones_observe_the_same_config() {
        let shared = SharedRangingConfig::default();
        let engine_side = shared.clone();
        shared.set_use_smoothed_source(false);
        assert!(!engine_side.snapshot().use_smoothed_source);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RangingConfig = serde_json::from_str(r#"{"roiFraction":0.2}"#).unwrap();
        assert_eq!(config.roi_fraction, 0.2);
        assert_eq!(config.smoothing_window, 5);
    }
}
