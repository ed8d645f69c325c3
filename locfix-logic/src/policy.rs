//! Convergence policy, pure decisions over a session's samples.
//!
//! Sample-driven evaluation walks a three-tier acceptance ladder: an excellent reading is
//! taken immediately, a good one needs corroboration, an acceptable one needs more. When no
//! tier matches, the soft deadline and the sample cap may still commit the best sample seen.
//! Timer ticks have their own entry points.

use std::time::Duration;

use crate::{
    config::ResolverConfig,
    error::ErrorKind,
    sample::{FixReason, PositionSample},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep sampling
    Continue,
    /// Commit the sample that was just received
    FinalizeWithLatest(FixReason),
    /// Commit the best sample of the session
    FinalizeWithBest(FixReason),
    /// End the session with an error
    Fail(ErrorKind),
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// The best sample, provided it passes the reject threshold
fn usable_best<'a>(
    best: Option<&'a PositionSample>,
    config: &ResolverConfig,
) -> Option<&'a PositionSample> {
    best.filter(|best| config.accepts_accuracy(best.accuracy_meters))
}

/// Evaluate a newly received sample. `best` and `sample_count` must already include `latest`.
pub fn evaluate(
    latest: &PositionSample,
    best: Option<&PositionSample>,
    sample_count: u32,
    elapsed: Duration,
    config: &ResolverConfig,
) -> Decision {
    let accuracy = latest.accuracy_meters;

    if accuracy <= config.excellent_threshold_m {
        return Decision::FinalizeWithLatest(FixReason::Excellent);
    }

    if accuracy <= config.good_threshold_m && sample_count >= config.good_min_samples {
        return Decision::FinalizeWithLatest(FixReason::Good);
    }

    if accuracy <= config.acceptable_threshold_m && sample_count >= config.acceptable_min_samples
    {
        return Decision::FinalizeWithLatest(FixReason::Acceptable);
    }

    // A sample that lands after the soft deadline shouldn't have to wait for another tick
    if elapsed >= config.soft_timeout() {
        let decision = on_soft_timeout(best, config);
        if decision.is_terminal() {
            return decision;
        }
    }

    if sample_count >= config.max_samples {
        return on_max_samples(best, config);
    }

    Decision::Continue
}

pub fn on_soft_timeout(best: Option<&PositionSample>, config: &ResolverConfig) -> Decision {
    match usable_best(best, config) {
        Some(_) => Decision::FinalizeWithBest(FixReason::SoftTimeoutBest),
        None => Decision::Continue,
    }
}

pub fn on_max_samples(best: Option<&PositionSample>, config: &ResolverConfig) -> Decision {
    match usable_best(best, config) {
        Some(_) => Decision::FinalizeWithBest(FixReason::MaxSamplesBest),
        None => Decision::Continue,
    }
}

/// Always terminal
pub fn on_hard_timeout(best: Option<&PositionSample>, config: &ResolverConfig) -> Decision {
    match usable_best(best, config) {
        Some(_) => Decision::FinalizeWithBest(FixReason::HardTimeoutBest),
        None => Decision::Fail(ErrorKind::Timeout),
    }
}
