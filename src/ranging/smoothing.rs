use std::collections::VecDeque;

/// Simple moving average over the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl MovingAverage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Shrinking drops the oldest samples immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_overflow();
    }

    /// Appends `sample` and returns the mean of the retained samples.
    pub fn push(&mut self, sample: f32) -> f32 {
        self.samples.push_back(sample);
        self.evict_overflow();
        // Never empty right after a push.
        self.mean().unwrap_or(sample)
    }

    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|&v| f64::from(v)).sum();
        Some((sum / self.samples.len() as f64) as f32)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn evict_overflow(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_of_three_tracks_last_three_samples() {
        let mut average = MovingAverage::new(3);
        let published: Vec<f32> = [1.0, 2.0, 3.0, 4.0]
            .into_iter()
            .map(|sample| average.push(sample))
            .collect();
        assert_eq!(published, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn window_of_one_passes_through() {
        let mut average = MovingAverage::new(1);
        assert_eq!(average.push(4.0), 4.0);
        assert_eq!(average.push(0.5), 0.5);
        assert_eq!(average.len(), 1);
    }

    #[test]
    fn zero_capacity_is_promoted_to_one() {
        assert_eq!(MovingAverage::new(0).capacity(), 1);
    }

    #[test]
    fn shrinking_evicts_oldest() {
        let mut average = MovingAverage::new(4);
        for sample in [1.0, 2.0, 3.0, 4.0] {
            average.push(sample);
        }
        average.set_capacity(2);
        assert_eq!(average.mean(), Some(3.5));
    }

    #[test]
    fn empty_average_has_no_mean() {
        let mut average = MovingAverage::new(2);
        assert_eq!(average.mean(), None);
        average.push(1.0);
        average.clear();
        assert!(average.is_empty());
    }
}
