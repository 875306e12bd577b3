use super::config::RangingConfig;

/// Pixel bounds of the sampling window, half-open on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl SamplingWindow {
    /// Computes the window for a `width` x `height` buffer and clips it to the
    /// buffer. Returns `None` when nothing is left after clipping.
    pub fn compute(config: &RangingConfig, width: usize, height: usize) -> Option<Self> {
        let half = f64::from(config.roi_fraction) / 2.0;
        let center_x = 0.5 + f64::from(config.offset_x);
        let center_y = 0.5 + f64::from(config.offset_y);

        let (x0, x1) = clip_axis(center_x - half, center_x + half, width)?;
        let (y0, y1) = clip_axis(center_y - half, center_y + half, height)?;

        Some(Self { x0, x1, y0, y1 })
    }

    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

fn clip_axis(start: f64, end: f64, dimension: usize) -> Option<(usize, usize)> {
    if dimension == 0 || !start.is_finite() || !end.is_finite() {
        return None;
    }
    let extent = dimension as f64;
    let lo = (start * extent).floor().clamp(0.0, extent) as usize;
    let hi = (end * extent).floor().clamp(0.0, extent) as usize;
    (lo < hi).then_some((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(roi: f32, offset_x: f32, offset_y: f32) -> RangingConfig {
        RangingConfig {
            roi_fraction: roi,
            offset_x,
            offset_y,
            ..RangingConfig::default()
        }
    }

    #[test]
    fn centered_window_on_even_frame() {
        let window = SamplingWindow::compute(&config(0.5, 0.0, 0.0), 8, 4).unwrap();
        assert_eq!(
            window,
            SamplingWindow {
                x0: 2,
                x1: 6,
                y0: 1,
                y1: 3
            }
        );
        assert_eq!(window.area(), 8);
    }

    #[test]
    fn full_frame_window_covers_everything() {
        let window = SamplingWindow::compute(&config(1.0, 0.0, 0.0), 2, 2).unwrap();
        assert_eq!(window.area(), 4);
    }

    #[test]
    fn offset_window_is_clipped_to_frame() {
        let window = SamplingWindow::compute(&config(0.5, 0.5, -0.5), 10, 10).unwrap();
        assert_eq!(window.x0, 7);
        assert_eq!(window.x1, 10);
        assert_eq!(window.y0, 0);
        assert_eq!(window.y1, 2);
    }

    #[test]
    fn tiny_window_can_collapse_to_nothing() {
        assert!(SamplingWindow::compute(&config(0.01, 0.1, 0.0), 4, 4).is_none());
    }

    #[test]
    fn empty_frame_has_no_window() {
        assert!(SamplingWindow::compute(&config(1.0, 0.0, 0.0), 0, 4).is_none());
    }
}
