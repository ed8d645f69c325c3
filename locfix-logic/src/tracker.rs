use crate::sample::PositionSample;

/// Keeps the most accurate sample of a session
#[derive(Debug, Clone, Default)]
pub struct AccuracyTracker {
    best: Option<PositionSample>,
}

impl AccuracyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a sample, returns whether it became the new best. Ties keep the earlier sample.
    pub fn consider(&mut self, sample: PositionSample) -> bool {
        let improves = self
            .best
            .is_none_or(|best| sample.accuracy_meters < best.accuracy_meters);

        if improves {
            self.best = Some(sample);
        }

        improves
    }

    pub fn best(&self) -> Option<&PositionSample> {
        self.best.as_ref()
    }

    pub fn reset(&mut self) {
        self.best = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_best() {
        let mut tracker = AccuracyTracker::new();
        assert!(tracker.best().is_none());
        assert!(tracker.consider(PositionSample::now(1.0, 1.0, 900.0)));
        assert_eq!(tracker.best().map(|s| s.accuracy_meters), Some(900.0));
    }

    #[test]
    fn test_only_strictly_better_replaces() {
        let mut tracker = AccuracyTracker::new();
        let first = PositionSample::now(1.0, 1.0, 200.0);
        tracker.consider(first);

        assert!(!tracker.consider(PositionSample::now(2.0, 2.0, 200.0)));
        assert_eq!(tracker.best(), Some(&first), "Tie replaced the earlier sample");

        assert!(!tracker.consider(PositionSample::now(3.0, 3.0, 350.0)));
        assert!(tracker.consider(PositionSample::now(4.0, 4.0, 120.0)));
        assert_eq!(tracker.best().map(|s| s.latitude), Some(4.0));
    }

    #[test]
    fn test_best_is_monotonic() {
        let mut tracker = AccuracyTracker::new();
        let stream = [800.0, 1200.0, 400.0, 400.0, 650.0, 90.0, 3000.0, 15.0, 70.0];
        let mut last = f64::INFINITY;

        for acc in stream {
            tracker.consider(PositionSample::now(0.0, 0.0, acc));
            let best = tracker.best().map(|s| s.accuracy_meters).unwrap_or(f64::INFINITY);
            assert!(best <= last, "Best went from {last} to {best}");
            last = best;
        }

        assert_eq!(last, 15.0);
    }

    #[test]
    fn test_reset() {
        let mut tracker = AccuracyTracker::new();
        tracker.consider(PositionSample::now(0.0, 0.0, 5.0));
        tracker.reset();
        assert!(tracker.best().is_none());
        assert!(tracker.consider(PositionSample::now(0.0, 0.0, 500.0)));
    }
}
