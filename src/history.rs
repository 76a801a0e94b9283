use std::collections::VecDeque;

/// Bounded two-stream history of recent points, kept only for the live plot.
///
/// Pure bookkeeping: no transformation of values, no estimation semantics.
/// The two streams may transiently differ in length (e.g. on the very first
/// frame); renderers must gate on at least two points before drawing lines.
pub struct TrackHistory {
    noisy: VecDeque<[f64; 3]>,
    estimates: VecDeque<[f64; 3]>,
    capacity: usize,
}

impl TrackHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            noisy: VecDeque::with_capacity(capacity),
            estimates: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push_observation(&mut self, point: [f64; 3]) {
        Self::push_bounded(&mut self.noisy, point, self.capacity);
    }

    pub fn push_estimate(&mut self, point: [f64; 3]) {
        Self::push_bounded(&mut self.estimates, point, self.capacity);
    }

    fn push_bounded(buf: &mut VecDeque<[f64; 3]>, point: [f64; 3], capacity: usize) {
        buf.push_back(point);
        while buf.len() > capacity {
            buf.pop_front();
        }
    }

    /// Recent noisy observations in arrival order.
    pub fn noisy(&self) -> &VecDeque<[f64; 3]> {
        &self.noisy
    }

    /// Recent estimates in arrival order.
    pub fn estimates(&self) -> &VecDeque<[f64; 3]> {
        &self.estimates
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_eviction_keeps_most_recent() {
        let mut history = TrackHistory::new(5);
        for i in 0..12 {
            history.push_observation([i as f64, 0.0, 0.0]);
        }
        assert_eq!(history.noisy().len(), 5);
        let xs: Vec<f64> = history.noisy().iter().map(|p| p[0]).collect();
        assert_eq!(xs, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_streams_are_independent() {
        let mut history = TrackHistory::new(3);
        history.push_observation([1.0, 2.0, 3.0]);
        assert_eq!(history.noisy().len(), 1);
        assert_eq!(history.estimates().len(), 0);

        history.push_estimate([0.1, 0.2, 0.3]);
        assert_eq!(history.estimates().len(), 1);
    }

    #[test]
    fn test_under_capacity_preserves_all() {
        let mut history = TrackHistory::new(100);
        for i in 0..7 {
            history.push_estimate([0.0, i as f64, 0.0]);
        }
        assert_eq!(history.estimates().len(), 7);
        assert_eq!(history.estimates().front().unwrap()[1], 0.0);
        assert_eq!(history.estimates().back().unwrap()[1], 6.0);
    }
}
