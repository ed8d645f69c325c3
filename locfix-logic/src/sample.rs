use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A point on the globe in degrees
pub struct Coordinates {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Plain `lat, lng` text, always available even when no address could be looked up
    pub fn fallback_label(&self) -> String {
        format!("{:.6}, {:.6}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A single reading pushed by a [crate::SampleSource]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of the confidence circle, lower is better
    pub accuracy_meters: f64,
    pub captured_at: UtcDT,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, captured_at: UtcDT) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            captured_at,
        }
    }

    /// Create a sample stamped with the current time
    pub fn now(latitude: f64, longitude: f64, accuracy_meters: f64) -> Self {
        Self::new(latitude, longitude, accuracy_meters, Utc::now())
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Whether this sample can be fed to the tracker at all. Accuracy must be a finite,
    /// non-negative radius and the coordinates must be on the globe.
    pub fn is_valid(&self) -> bool {
        self.accuracy_meters.is_finite()
            && self.accuracy_meters >= 0.0
            && self.coordinates().is_valid()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Why a fix was committed
pub enum FixReason {
    /// A single sample was within the excellent threshold
    Excellent,
    /// Within the good threshold with enough samples seen
    Good,
    /// Within the acceptable threshold with enough samples seen
    Acceptable,
    /// The soft deadline passed (or the source errored) with a usable best sample
    SoftTimeoutBest,
    /// The sample cap was hit with a usable best sample
    MaxSamplesBest,
    /// The hard deadline passed with a usable best sample
    HardTimeoutBest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A committed coordinate
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub accuracy_meters: f64,
    pub reason: FixReason,
    /// When the committed sample was taken
    pub captured_at: UtcDT,
    /// Number of samples the session had seen when it committed
    pub sample_count: u32,
}

impl ResolvedLocation {
    pub(crate) fn from_sample(sample: &PositionSample, reason: FixReason, sample_count: u32) -> Self {
        Self {
            coordinates: sample.coordinates(),
            accuracy_meters: sample.accuracy_meters,
            reason,
            captured_at: sample.captured_at,
            sample_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_label() {
        let coords = Coordinates::new(12.9715987, 77.594566);
        assert_eq!(coords.fallback_label(), "12.971599, 77.594566");
    }

    #[test]
    fn test_sample_validity() {
        assert!(PositionSample::now(10.0, 20.0, 0.0).is_valid());
        assert!(PositionSample::now(-90.0, 180.0, 35.0).is_valid());
        assert!(!PositionSample::now(10.0, 20.0, -1.0).is_valid());
        assert!(!PositionSample::now(10.0, 20.0, f64::NAN).is_valid());
        assert!(!PositionSample::now(10.0, 20.0, f64::INFINITY).is_valid());
        assert!(!PositionSample::now(91.0, 20.0, 5.0).is_valid());
        assert!(!PositionSample::now(10.0, -180.5, 5.0).is_valid());
    }

    #[test]
    fn test_resolved_from_sample() {
        let sample = PositionSample::now(1.5, 2.5, 42.0);
        let fix = ResolvedLocation::from_sample(&sample, FixReason::Good, 3);
        assert_eq!(fix.coordinates, Coordinates::new(1.5, 2.5));
        assert_eq!(fix.accuracy_meters, 42.0);
        assert_eq!(fix.captured_at, sample.captured_at);
        assert_eq!(fix.sample_count, 3);
    }
}
