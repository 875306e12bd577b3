use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::capture::{feedback::DEFAULT_FEEDBACK_MS, photo};
use crate::ranging::RangingConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// Longest edge of stored photos, in pixels.
    pub photo_max_dimension: u32,
    /// JPEG quality, 1-100.
    pub photo_quality: u8,
    /// How long the capture-succeeded cue stays raised.
    pub feedback_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            photo_max_dimension: photo::DEFAULT_MAX_DIMENSION,
            photo_quality: photo::DEFAULT_QUALITY,
            feedback_ms: DEFAULT_FEEDBACK_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    ranging: RangingConfig,
    capture: CaptureSettings,
}

/// JSON file holding the user's ranging and capture tunables.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// A missing file yields defaults; so does a malformed one, with a warning.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn ranging(&self) -> RangingConfig {
        self.read().ranging.clone().sanitized()
    }

    pub fn capture(&self) -> CaptureSettings {
        self.read().capture.clone()
    }

    pub fn update_ranging(&self, config: RangingConfig) -> Result<()> {
        let mut guard = self.write();
        guard.ranging = config.sanitized();
        self.persist(&guard)
    }

    pub fn update_capture(&self, settings: CaptureSettings) -> Result<()> {
        let mut guard = self.write();
        guard.capture = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
