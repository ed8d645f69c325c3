use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    config::ResolverConfig,
    error::{ResolverError, SourceErrorKind},
    policy::{self, Decision},
    sample::{PositionSample, ResolvedLocation},
    source::SourceEvent,
    tracker::AccuracyTracker,
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Sampling,
    Resolved,
    Failed,
}

/// Input to a sampling session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    SampleReceived(PositionSample),
    SampleErrored(SourceErrorKind),
    SoftTimeoutTick,
    MaxSamplesReached,
    HardTimeoutTick,
}

impl From<SourceEvent> for SessionEvent {
    fn from(value: SourceEvent) -> Self {
        match value {
            SourceEvent::Sample(sample) => Self::SampleReceived(sample),
            SourceEvent::Error(kind) => Self::SampleErrored(kind),
        }
    }
}

pub type Outcome = Result<ResolvedLocation, ResolverError>;

/// State of one sampling session. Events are applied one at a time with [Self::handle],
/// which returns the terminal outcome exactly once.
#[derive(Debug, Clone)]
pub struct ResolverState {
    config: ResolverConfig,
    tracker: AccuracyTracker,
    sample_count: u32,
    started_at: Instant,
    status: SessionStatus,
}

impl ResolverState {
    pub fn start(config: ResolverConfig, now: Instant) -> Self {
        Self {
            config,
            tracker: AccuracyTracker::new(),
            sample_count: 0,
            started_at: now,
            status: SessionStatus::Sampling,
        }
    }

    pub fn best_sample(&self) -> Option<&PositionSample> {
        self.tracker.best()
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Apply an event. Returns `Some` only for the event that ends the session, events
    /// after that are ignored.
    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Option<Outcome> {
        if self.status != SessionStatus::Sampling {
            debug!("Ignoring {event:?}, session is {:?}", self.status);
            return None;
        }

        let (decision, latest) = match event {
            SessionEvent::SampleReceived(sample) => {
                self.sample_count = self.sample_count.saturating_add(1);
                self.tracker.consider(sample);
                let decision = policy::evaluate(
                    &sample,
                    self.tracker.best(),
                    self.sample_count,
                    self.elapsed(now),
                    &self.config,
                );
                debug!(
                    "Sample {} at ±{:.1}m (best ±{:.1}m): {decision:?}",
                    self.sample_count,
                    sample.accuracy_meters,
                    self.tracker.best().map_or(sample.accuracy_meters, |b| b.accuracy_meters)
                );
                (decision, Some(sample))
            }
            SessionEvent::SampleErrored(kind) => {
                // With any sample in hand the error only counts as a soft tick, a rejected
                // best keeps the session alive until the hard deadline
                let decision = match self.tracker.best() {
                    Some(best) => policy::on_soft_timeout(Some(best), &self.config),
                    None => Decision::Fail(kind.into()),
                };
                debug!("Source reported {kind:?}: {decision:?}");
                (decision, None)
            }
            SessionEvent::SoftTimeoutTick => {
                (policy::on_soft_timeout(self.tracker.best(), &self.config), None)
            }
            SessionEvent::MaxSamplesReached => {
                (policy::on_max_samples(self.tracker.best(), &self.config), None)
            }
            SessionEvent::HardTimeoutTick => {
                (policy::on_hard_timeout(self.tracker.best(), &self.config), None)
            }
        };

        self.apply(decision, latest)
    }

    fn apply(&mut self, decision: Decision, latest: Option<PositionSample>) -> Option<Outcome> {
        let best = self.tracker.best().copied();

        let committed = match decision {
            Decision::Continue => return None,
            Decision::FinalizeWithLatest(reason) => latest.or(best).map(|s| (s, reason)),
            Decision::FinalizeWithBest(reason) => best.map(|s| (s, reason)),
            Decision::Fail(kind) => {
                self.status = SessionStatus::Failed;
                return Some(Err(ResolverError::new(kind, best)));
            }
        };

        let (sample, reason) = committed?;
        self.status = SessionStatus::Resolved;
        Some(Ok(ResolvedLocation::from_sample(
            &sample,
            reason,
            self.sample_count,
        )))
    }
}
