use std::{path::Path, time::Duration};

use locfix_logic::{
    FixResult, PositionSample, ResolvedLocation, Resolver, ResolverConfig, ResolverError,
    SampleSink, SampleSource, SourceErrorKind, SourceOptions,
};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::{
    task::JoinHandle,
    time::{Instant, sleep_until},
};

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use prelude::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StepSample {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
    Sample(StepSample),
    Error(SourceErrorKind),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    /// Offset from the start of the subscription
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: StepEvent,
}

/// A recorded (or made up) stream of readings from a positioning subsystem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// When set the source refuses to start at all
    #[serde(default)]
    pub start_error: Option<SourceErrorKind>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(raw).context("Failed to parse scenario")?;

        if scenario.steps.windows(2).any(|w| w[0].at_ms > w[1].at_ms) {
            bail!("Steps in scenario {} are not in time order", scenario.name);
        }

        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("In {}", path.display()))
    }
}

/// Plays a [Scenario] into every subscription, in tokio time
pub struct ScriptedSource {
    scenario: Scenario,
}

impl ScriptedSource {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }
}

impl SampleSource for ScriptedSource {
    type Handle = JoinHandle<()>;

    fn start(
        &self,
        sink: SampleSink,
        options: SourceOptions,
    ) -> Result<Self::Handle, SourceErrorKind> {
        if let Some(kind) = self.scenario.start_error {
            return Err(kind);
        }

        debug!("Replaying {} with {options:?}", self.scenario.name);

        let steps = self.scenario.steps.clone();
        Ok(tokio::spawn(async move {
            let start = Instant::now();
            for step in steps {
                sleep_until(start + Duration::from_millis(step.at_ms)).await;
                match step.event {
                    StepEvent::Sample(s) => {
                        sink.on_sample(PositionSample::now(s.lat, s.lng, s.accuracy));
                    }
                    StepEvent::Error(kind) => {
                        sink.on_error(kind);
                    }
                }
            }
        }))
    }

    fn stop(&self, handle: Self::Handle) {
        handle.abort();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOutcome {
    Resolved(ResolvedLocation),
    Failed(ResolverError),
    Cancelled,
}

impl From<FixResult> for ReplayOutcome {
    fn from(value: FixResult) -> Self {
        match value {
            Ok(Some(fix)) => Self::Resolved(fix),
            Ok(None) => Self::Cancelled,
            Err(why) => Self::Failed(why),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayReport {
    pub scenario: String,
    pub elapsed_ms: u64,
    pub outcome: ReplayOutcome,
}

/// Run a scenario through a fresh [Resolver]
pub async fn run_scenario(scenario: &Scenario, config: ResolverConfig) -> ReplayReport {
    let resolver = Resolver::new(ScriptedSource::new(scenario.clone()));
    let start = Instant::now();
    let res = resolver.request_location_fix(config).await;

    ReplayReport {
        scenario: scenario.name.clone(),
        elapsed_ms: start.elapsed().as_millis() as u64,
        outcome: res.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locfix_logic::{ErrorKind, FixReason};

    const OPEN_SKY: &str = include_str!("../scenarios/open_sky.json");
    const URBAN_CANYON: &str = include_str!("../scenarios/urban_canyon.json");
    const PERMISSION_DENIED: &str = include_str!("../scenarios/permission_denied.json");
    const FLAKY_INDOOR: &str = include_str!("../scenarios/flaky_indoor.json");

    fn load(raw: &str) -> Scenario {
        Scenario::from_json(raw).expect("Bundled scenario failed to parse")
    }

    fn expect_resolved(report: &ReplayReport) -> &ResolvedLocation {
        match &report.outcome {
            ReplayOutcome::Resolved(fix) => fix,
            other => panic!("{} did not resolve: {other:?}", report.scenario),
        }
    }

    fn expect_failed(report: &ReplayReport) -> &ResolverError {
        match &report.outcome {
            ReplayOutcome::Failed(why) => why,
            other => panic!("{} did not fail: {other:?}", report.scenario),
        }
    }

    #[test]
    fn test_parse_steps() {
        let scenario = load(FLAKY_INDOOR);
        assert_eq!(scenario.steps.len(), 2);
        assert!(matches!(
            scenario.steps[0].event,
            StepEvent::Sample(StepSample { accuracy, .. }) if accuracy == 3500.0
        ));
        assert_eq!(
            scenario.steps[1],
            Step {
                at_ms: 4000,
                event: StepEvent::Error(SourceErrorKind::PositionUnavailable),
            }
        );
        assert!(scenario.start_error.is_none());
    }

    #[test]
    fn test_reject_out_of_order_steps() {
        let raw = r#"{
            "name": "backwards",
            "steps": [
                { "at_ms": 500, "error": "unsupported" },
                { "at_ms": 100, "error": "unsupported" }
            ]
        }"#;
        assert!(Scenario::from_json(raw).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_sky() {
        let report = run_scenario(&load(OPEN_SKY), ResolverConfig::form_submission()).await;
        let fix = expect_resolved(&report);
        assert_eq!(fix.reason, FixReason::Excellent);
        assert_eq!(fix.accuracy_meters, 38.0);
        assert_eq!(report.elapsed_ms, 2600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_urban_canyon_permissive_and_strict() {
        let scenario = load(URBAN_CANYON);

        let report = run_scenario(&scenario, ResolverConfig::default()).await;
        let fix = expect_resolved(&report);
        assert_eq!(fix.reason, FixReason::SoftTimeoutBest);
        assert_eq!(fix.accuracy_meters, 600.0);
        assert_eq!(report.elapsed_ms, 10_000);

        let strict = ResolverConfig {
            reject_threshold_m: Some(500.0),
            ..Default::default()
        };
        let report = run_scenario(&scenario, strict).await;
        let why = expect_failed(&report);
        assert_eq!(why.kind, ErrorKind::Timeout);
        assert_eq!(why.best_known.map(|s| s.accuracy_meters), Some(600.0));
        assert_eq!(report.elapsed_ms, 15_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied() {
        let report = run_scenario(&load(PERMISSION_DENIED), ResolverConfig::map_picker()).await;
        let why = expect_failed(&report);
        assert_eq!(why.kind, ErrorKind::PermissionDenied);
        assert_eq!(report.elapsed_ms, 800);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_indoor_by_preset() {
        let scenario = load(FLAKY_INDOOR);

        let report = run_scenario(&scenario, ResolverConfig::edit_flow()).await;
        let fix = expect_resolved(&report);
        assert_eq!(fix.reason, FixReason::SoftTimeoutBest);
        assert_eq!(fix.accuracy_meters, 3500.0);

        let strict = ResolverConfig {
            reject_threshold_m: Some(3000.0),
            ..Default::default()
        };
        let report = run_scenario(&scenario, strict).await;
        let why = expect_failed(&report);
        assert_eq!(why.kind, ErrorKind::Timeout);
        assert_eq!(why.best_known.map(|s| s.accuracy_meters), Some(3500.0));
        assert_eq!(report.elapsed_ms, 15_000);
    }

    #[tokio::test]
    async fn test_source_refuses_to_start() {
        let scenario = Scenario {
            name: "no_gps".to_string(),
            description: None,
            start_error: Some(SourceErrorKind::Unsupported),
            steps: vec![],
        };
        let report = run_scenario(&scenario, ResolverConfig::default()).await;
        assert_eq!(expect_failed(&report).kind, ErrorKind::SourceUnsupported);
    }

    #[test]
    fn test_report_json() {
        let report = ReplayReport {
            scenario: "x".to_string(),
            elapsed_ms: 12,
            outcome: ReplayOutcome::Cancelled,
        };
        let json = serde_json::to_value(&report).expect("Failed to serialize");
        assert_eq!(json["outcome"], "cancelled");
        assert_eq!(json["elapsed_ms"], 12);
    }
}
