//! Frame payloads delivered by the depth sensor.
//!
//! A frame carries a raw depth/confidence pair, optionally a temporally smoothed
//! pair produced by the sensor itself, and optionally the color image captured
//! alongside it.

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Per-pixel reliability reported by the sensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Maps the sensor's raw ordinal (0, 1, 2) onto a level. Out-of-range values
    /// are treated as `Low` so they never pass the confidence filter.
    pub fn from_raw(value: u8) -> Self {
        match value {
            2 => ConfidenceLevel::High,
            1 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }
}

/// Row-major 2-D buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Returns `None` when `data` does not hold exactly `width * height` cells.
    pub fn new(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if width.checked_mul(height)? != data.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Slice of row `y` between columns `[x0, x1)`.
    pub(crate) fn row_span(&self, y: usize, x0: usize, x1: usize) -> &[T] {
        let start = y * self.width;
        &self.data[start + x0..start + x1]
    }
}

/// Depth (meters) plus the confidence map that goes with it.
#[derive(Debug, Clone)]
pub struct DepthMap {
    pub depth: Grid<f32>,
    pub confidence: Grid<ConfidenceLevel>,
}

impl DepthMap {
    pub fn new(depth: Grid<f32>, confidence: Grid<ConfidenceLevel>) -> Self {
        Self { depth, confidence }
    }

    /// A pair is usable only when both buffers share the same non-empty shape.
    pub fn is_consistent(&self) -> bool {
        self.depth.width() == self.confidence.width()
            && self.depth.height() == self.confidence.height()
            && self.depth.width() > 0
            && self.depth.height() > 0
    }

    pub fn width(&self) -> usize {
        self.depth.width()
    }

    pub fn height(&self) -> usize {
        self.depth.height()
    }
}

/// Which depth/confidence pair a frame was sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthSource {
    Smoothed,
    Raw,
}

/// Color image captured with the frame, as handed over by the camera.
#[derive(Debug, Clone)]
pub enum CameraImage {
    /// Still-encoded bytes (PNG, JPEG, ...) that must be decoded first.
    Encoded(Arc<Vec<u8>>),
    Decoded(Arc<DynamicImage>),
}

#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub raw: DepthMap,
    pub smoothed: Option<DepthMap>,
    pub image: Option<CameraImage>,
}

impl DepthFrame {
    pub fn new(raw: DepthMap) -> Self {
        Self {
            raw,
            smoothed: None,
            image: None,
        }
    }

    pub fn with_smoothed(mut self, smoothed: DepthMap) -> Self {
        self.smoothed = Some(smoothed);
        self
    }

    pub fn with_image(mut self, image: CameraImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Resolves the buffer pair to sample. The smoothed pair is used only when it
    /// is requested, present on this frame and consistent; otherwise raw.
    pub fn select(&self, prefer_smoothed: bool) -> (DepthSource, &DepthMap) {
        match (&self.smoothed, prefer_smoothed) {
            (Some(smoothed), true) if smoothed.is_consistent() => {
                (DepthSource::Smoothed, smoothed)
            }
            _ => (DepthSource::Raw, &self.raw),
        }
    }
}
