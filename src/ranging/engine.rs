use super::config::{RangingConfig, SharedRangingConfig};
use super::distance::CurrentDistance;
use super::frame::{ConfidenceLevel, DepthFrame, DepthMap, DepthSource};
use super::smoothing::MovingAverage;
use super::window::SamplingWindow;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// What a single frame contributed, before smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub source: DepthSource,
    pub average: f32,
    pub pixels_used: usize,
}

/// Turns depth frames into the published `CurrentDistance`.
///
/// Owned by exactly one producer; the only shared state it touches is the config
/// (read) and the distance cell (write).
pub struct RangingEngine {
    config: SharedRangingConfig,
    distance: CurrentDistance,
    smoother: MovingAverage,
    last_sample: Option<FrameSample>,
}

impl RangingEngine {
    pub fn new(config: SharedRangingConfig, distance: CurrentDistance) -> Self {
        let capacity = config.snapshot().smoothing_window;
        Self {
            config,
            distance,
            smoother: MovingAverage::new(capacity),
            last_sample: None,
        }
    }

    pub fn distance(&self) -> &CurrentDistance {
        &self.distance
    }

    /// Folds one frame into the moving average and publishes the result.
    ///
    /// Returns the smoothed value after this frame. Frames that yield no usable
    /// pixels leave everything untouched, including a pending window resize, and
    /// return the published value (`None` if there never was one).
    pub fn ingest_frame(&mut self, frame: &DepthFrame) -> Option<f32> {
        let config = self.config.snapshot();

        let (source, map) = frame.select(config.use_smoothed_source);
        let Some(sample) = sample_frame(map, source, &config) else {
            return self.distance.get();
        };

        if self.smoother.capacity() != config.smoothing_window {
            self.smoother.set_capacity(config.smoothing_window);
        }
        let smoothed = self.smoother.push(sample.average);
        self.distance.publish(smoothed);
        self.last_sample = Some(sample);
        Some(smoothed)
    }

    /// Most recent frame that contributed to the average.
    pub fn last_sample(&self) -> Option<FrameSample> {
        self.last_sample
    }

    /// Drops the moving average and clears the published distance.
    pub fn reset(&mut self) {
        self.smoother.clear();
        self.last_sample = None;
        self.distance.clear();
    }
}

/// Averages the confident, physically plausible depths inside the sampling window.
pub fn sample_frame(
    map: &DepthMap,
    source: DepthSource,
    config: &RangingConfig,
) -> Option<FrameSample> {
    if !map.is_consistent() {
        log_debug!(
            "skipping frame: depth {}x{} vs confidence {}x{}",
            map.depth.width(),
            map.depth.height(),
            map.confidence.width(),
            map.confidence.height()
        );
        return None;
    }

    let Some(window) = SamplingWindow::compute(config, map.width(), map.height()) else {
        log_debug!("skipping frame: sampling window is empty");
        return None;
    };

    let mut sum = 0.0_f64;
    let mut used = 0_usize;
    for y in window.y0..window.y1 {
        let depths = map.depth.row_span(y, window.x0, window.x1);
        let confidences = map.confidence.row_span(y, window.x0, window.x1);
        for (&depth, &confidence) in depths.iter().zip(confidences) {
            if confidence >= ConfidenceLevel::Medium && depth.is_finite() && depth > 0.0 {
                sum += f64::from(depth);
                used += 1;
            }
        }
    }

    if used == 0 {
        log_debug!(
            "skipping frame: no confident pixels in {} sampled",
            window.area()
        );
        return None;
    }

    Some(FrameSample {
        source,
        average: (sum / used as f64) as f32,
        pixels_used: used,
    })
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::ranging::frame::Grid;

    fn full_frame_config(smoothing_window: usize) -> SharedRangingConfig {
        SharedRangingConfig::new(RangingConfig {
            roi_fraction: 1.0,
            smoothing_window,
            use_smoothed_source: true,
            offset_x: 0.0,
            offset_y: 0.0,
        })
    }

    fn frame(depths: Vec<f32>, confidences: Vec<ConfidenceLevel>) -> DepthFrame {
        DepthFrame::new(DepthMap::new(
            Grid::new(2, 2, depths).unwrap(),
            Grid::new(2, 2, confidences).unwrap(),
        ))
    }

    fn uniform(depth: f32) -> DepthFrame {
        frame(vec![depth; 4], vec![ConfidenceLevel::High; 4])
    }

    #[test]
    fn averages_high_confidence_window() {
        let mut engine = RangingEngine::new(full_frame_config(1), CurrentDistance::new());
        let result = engine.ingest_frame(&frame(
            vec![1.0, 1.0, 2.0, 2.0],
            vec![ConfidenceLevel::High; 4],
        ));
        assert_eq!(result, Some(1.5));
        assert_eq!(engine.distance().get(), Some(1.5));
    }

    #[test]
    fn moving_average_over_three_frames() {
        let mut engine = RangingEngine::new(full_frame_config(3), CurrentDistance::new());
        let published: Vec<Option<f32>> = [1.0, 2.0, 3.0, 4.0]
            .into_iter()
            .map(|depth| engine.ingest_frame(&uniform(depth)))
            .collect();
        assert_eq!(
            published,
            vec![Some(1.0), Some(1.5), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn filters_low_confidence_and_invalid_depths() {
        let mut engine = RangingEngine::new(full_frame_config(1), CurrentDistance::new());
        let result = engine.ingest_frame(&frame(
            vec![9.0, f32::NAN, 0.0, 2.0],
            vec![
                ConfidenceLevel::Low,
                ConfidenceLevel::High,
                ConfidenceLevel::High,
                ConfidenceLevel::Medium,
            ],
        ));
        assert_eq!(result, Some(2.0));
    }

    #[test]
    fn frame_without_valid_pixels_keeps_previous_value() {
        let mut engine = RangingEngine::new(full_frame_config(3), CurrentDistance::new());
        engine.ingest_frame(&uniform(2.0));

        let occluded = frame(
            vec![f32::INFINITY, -1.0, 1.0, 1.0],
            vec![
                ConfidenceLevel::High,
                ConfidenceLevel::High,
                ConfidenceLevel::Low,
                ConfidenceLevel::Low,
            ],
        );
        assert_eq!(engine.ingest_frame(&occluded), Some(2.0));
        assert_eq!(engine.distance().get(), Some(2.0));

        // The skipped frame must not have entered the average.
        assert_eq!(engine.ingest_frame(&uniform(4.0)), Some(3.0));
    }

    #[test]
    fn no_reading_until_a_valid_frame_arrives() {
        let mut engine = RangingEngine::new(full_frame_config(3), CurrentDistance::new());
        let blind = frame(vec![1.0; 4], vec![ConfidenceLevel::Low; 4]);
        assert_eq!(engine.ingest_frame(&blind), None);
        assert_eq!(engine.distance().get(), None);
    }

    #[test]
    fn empty_window_leaves_state_untouched() {
        let config = full_frame_config(2);
        let mut engine = RangingEngine::new(config.clone(), CurrentDistance::new());
        engine.ingest_frame(&uniform(1.0));

        config.set_roi_fraction(0.01);
        config.set_offset(0.1, 0.0);
        assert_eq!(engine.ingest_frame(&uniform(5.0)), Some(1.0));
    }

    #[test]
    fn shrinking_window_waits_for_next_usable_frame() {
        let config = full_frame_config(3);
        let mut engine = RangingEngine::new(config.clone(), CurrentDistance::new());
        for depth in [1.0, 2.0, 3.0] {
            engine.ingest_frame(&uniform(depth));
        }
        assert_eq!(engine.distance().get(), Some(2.0));

        config.set_smoothing_window(1);
        let blind = frame(vec![1.0; 4], vec![ConfidenceLevel::Low; 4]);
        assert_eq!(engine.ingest_frame(&blind), Some(2.0));
        assert_eq!(engine.distance().get(), Some(2.0));

        assert_eq!(engine.ingest_frame(&uniform(5.0)), Some(5.0));
    }

    #[test]
    fn last_sample_reports_source_and_pixels() {
        let mut engine = RangingEngine::new(full_frame_config(1), CurrentDistance::new());
        assert_eq!(engine.last_sample(), None);

        engine.ingest_frame(&frame(
            vec![1.0, 1.0, 2.0, 2.0],
            vec![
                ConfidenceLevel::High,
                ConfidenceLevel::Low,
                ConfidenceLevel::High,
                ConfidenceLevel::Medium,
            ],
        ));
        let sample = engine.last_sample().unwrap();
        assert_eq!(sample.source, DepthSource::Raw);
        assert_eq!(sample.pixels_used, 3);

        engine.reset();
        assert_eq!(engine.last_sample(), None);
    }

    #[test]
    fn uses_smoothed_pair_when_requested() {
        let config = full_frame_config(1);
        let mut engine = RangingEngine::new(config.clone(), CurrentDistance::new());
        let raw = uniform(1.0).raw;
        let smoothed = uniform(3.0).raw;
        let frame = DepthFrame::new(raw).with_smoothed(smoothed);

        assert_eq!(engine.ingest_frame(&frame), Some(3.0));
        config.set_use_smoothed_source(false);
        assert_eq!(engine.ingest_frame(&frame), Some(1.0));
    }

    #[test]
    fn inconsistent_buffers_are_absorbed() {
        let mut engine = RangingEngine::new(full_frame_config(1), CurrentDistance::new());
        let broken = DepthFrame::new(DepthMap::new(
            Grid::filled(2, 2, 1.0),
            Grid::filled(3, 2, ConfidenceLevel::High),
        ));
        assert_eq!(engine.ingest_frame(&broken), None);
    }

    #[test]
    fn unusable_smoothed_pair_falls_back_to_raw() {
        let mut engine = RangingEngine::new(full_frame_config(1), CurrentDistance::new());
        let smoothed = DepthMap::new(
            Grid::filled(2, 2, 3.0),
            Grid::new(0, 0, Vec::new()).unwrap(),
        );
        let frame = uniform(1.0).with_smoothed(smoothed);
        assert_eq!(engine.ingest_frame(&frame), Some(1.0));
        assert_eq!(engine.last_sample().unwrap().source, DepthSource::Raw);
    }

    #[test]
    fn reset_clears_published_distance() {
        let mut engine = RangingEngine::new(full_frame_config(3), CurrentDistance::new());
        engine.ingest_frame(&uniform(2.0));
        engine.reset();
        assert_eq!(engine.distance().get(), None);
        assert_eq!(engine.ingest_frame(&uniform(4.0)), Some(4.0));
    }

    #[test]
    fn noisy_frames_settle_near_true_distance() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut engine = RangingEngine::new(full_frame_config(10), CurrentDistance::new());
        let mut last = None;
        for _ in 0..50 {
            let depths = (0..4).map(|_| 2.0 + rng.gen_range(-0.2..0.2)).collect();
            last = engine.ingest_frame(&frame(depths, vec![ConfidenceLevel::High; 4]));
        }
        let last = last.unwrap();
        assert!((last - 2.0).abs() < 0.1, "settled at {last}");
    }
}
