use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
/// What a new request does while another session is still sampling
pub enum BusyPolicy {
    /// Fail the new request with [crate::ErrorKind::Busy]
    #[default]
    Reject,
    /// Cancel the running session, wait for it to release its subscription, then start
    Restart,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Options forwarded verbatim to the [crate::SampleSource]
pub struct SourceOptions {
    pub high_accuracy: bool,
    pub max_sample_age_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Thresholds and deadlines for one location fix
pub struct ResolverConfig {
    /// Accuracy at or below which a single sample is accepted immediately
    pub excellent_threshold_m: f64,
    /// Accuracy for the second tier, needs [Self::good_min_samples]
    pub good_threshold_m: f64,
    pub good_min_samples: u32,
    /// Accuracy for the weakest tier, needs [Self::acceptable_min_samples]
    pub acceptable_threshold_m: f64,
    pub acceptable_min_samples: u32,
    /// After this, the best sample so far is committed if one is usable
    pub soft_timeout_ms: u64,
    /// Commit the best sample once this many samples have been seen
    pub max_samples: u32,
    /// Absolute deadline, the session always ends here
    pub hard_timeout_ms: u64,
    /// When set, a best sample worse than this is never committed
    pub reject_threshold_m: Option<f64>,
    pub high_accuracy: bool,
    pub max_sample_age_ms: u64,
    pub on_busy: BusyPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            excellent_threshold_m: 50.0,
            good_threshold_m: 100.0,
            good_min_samples: 2,
            acceptable_threshold_m: 500.0,
            acceptable_min_samples: 4,
            soft_timeout_ms: 10_000,
            max_samples: 8,
            hard_timeout_ms: 15_000,
            reject_threshold_m: None,
            high_accuracy: true,
            max_sample_age_ms: 0,
            on_busy: BusyPolicy::Reject,
        }
    }
}

impl ResolverConfig {
    /// Used when capturing the location of a new complaint. Strict: a best sample further
    /// off than 5km is not worth attaching to a report.
    pub fn form_submission() -> Self {
        Self {
            soft_timeout_ms: 10_000,
            hard_timeout_ms: 15_000,
            reject_threshold_m: Some(5_000.0),
            ..Default::default()
        }
    }

    /// Used to centre the map picker. Permissive, the user corrects the pin by hand anyway.
    pub fn map_picker() -> Self {
        Self {
            soft_timeout_ms: 15_000,
            hard_timeout_ms: 20_000,
            reject_threshold_m: None,
            on_busy: BusyPolicy::Restart,
            ..Default::default()
        }
    }

    /// Used when re-capturing the location of an existing complaint
    pub fn edit_flow() -> Self {
        Self {
            acceptable_min_samples: 3,
            soft_timeout_ms: 10_000,
            hard_timeout_ms: 20_000,
            reject_threshold_m: Some(10_000.0),
            ..Default::default()
        }
    }

    pub fn soft_timeout(&self) -> Duration {
        Duration::from_millis(self.soft_timeout_ms)
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            high_accuracy: self.high_accuracy,
            max_sample_age_ms: self.max_sample_age_ms,
        }
    }

    /// Whether `accuracy` passes the reject threshold (always true in the permissive variant)
    pub fn accepts_accuracy(&self, accuracy: f64) -> bool {
        self.reject_threshold_m
            .is_none_or(|threshold| accuracy <= threshold)
    }

    /// Check the config is internally consistent
    pub fn validate(&self) -> Result {
        let thresholds = [
            ("excellent_threshold_m", self.excellent_threshold_m),
            ("good_threshold_m", self.good_threshold_m),
            ("acceptable_threshold_m", self.acceptable_threshold_m),
        ];

        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a finite, non-negative distance (got {value})");
            }
        }

        if self.excellent_threshold_m > self.good_threshold_m
            || self.good_threshold_m > self.acceptable_threshold_m
        {
            bail!(
                "Accuracy tiers must be ordered excellent <= good <= acceptable (got {} / {} / {})",
                self.excellent_threshold_m,
                self.good_threshold_m,
                self.acceptable_threshold_m
            );
        }

        if let Some(reject) = self.reject_threshold_m {
            if !reject.is_finite() || reject < self.acceptable_threshold_m {
                bail!(
                    "reject_threshold_m ({reject}) must be finite and no stricter than acceptable_threshold_m ({})",
                    self.acceptable_threshold_m
                );
            }
        }

        if self.hard_timeout_ms == 0 {
            bail!("hard_timeout_ms must be greater than zero");
        }

        if self.soft_timeout_ms > self.hard_timeout_ms {
            bail!(
                "soft_timeout_ms ({}) must not exceed hard_timeout_ms ({})",
                self.soft_timeout_ms,
                self.hard_timeout_ms
            );
        }

        if self.max_samples == 0 {
            bail!("max_samples must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for (name, config) in [
            ("default", ResolverConfig::default()),
            ("form", ResolverConfig::form_submission()),
            ("map", ResolverConfig::map_picker()),
            ("edit", ResolverConfig::edit_flow()),
        ] {
            assert!(config.validate().is_ok(), "Preset {name} failed to validate");
        }
    }

    #[test]
    fn test_reject_threshold_variants() {
        let permissive = ResolverConfig::map_picker();
        assert!(permissive.accepts_accuracy(1_000_000.0));

        let strict = ResolverConfig::form_submission();
        assert!(strict.accepts_accuracy(5_000.0));
        assert!(!strict.accepts_accuracy(5_000.1));
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let bad = [
            ResolverConfig {
                soft_timeout_ms: 30_000,
                hard_timeout_ms: 20_000,
                ..Default::default()
            },
            ResolverConfig {
                hard_timeout_ms: 0,
                soft_timeout_ms: 0,
                ..Default::default()
            },
            ResolverConfig {
                excellent_threshold_m: 200.0,
                ..Default::default()
            },
            ResolverConfig {
                good_threshold_m: f64::NAN,
                ..Default::default()
            },
            ResolverConfig {
                reject_threshold_m: Some(100.0),
                ..Default::default()
            },
            ResolverConfig {
                max_samples: 0,
                ..Default::default()
            },
        ];

        for (i, config) in bad.iter().enumerate() {
            assert!(config.validate().is_err(), "Config {i} validated");
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{ "hard_timeout_ms": 20000, "reject_threshold_m": 5000.0 }"#)
                .expect("Failed to parse");

        assert_eq!(config.hard_timeout_ms, 20_000);
        assert_eq!(config.reject_threshold_m, Some(5_000.0));
        assert_eq!(config.excellent_threshold_m, 50.0);
        assert_eq!(config.max_samples, 8);
        assert_eq!(config.on_busy, BusyPolicy::Reject);
    }
}
