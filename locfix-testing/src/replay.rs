use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use locfix_geocode::NominatimGeocoder;
use locfix_logic::{ResolverConfig, label_fix};
use locfix_test_shared::{ReplayOutcome, Scenario, prelude::*, run_scenario};
use log::{LevelFilter, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Preset {
    /// Library defaults
    Default,
    /// Capturing the location of a new complaint
    Form,
    /// Centring the map picker
    Map,
    /// Re-capturing the location of an existing complaint
    Edit,
}

impl From<Preset> for ResolverConfig {
    fn from(value: Preset) -> Self {
        match value {
            Preset::Default => ResolverConfig::default(),
            Preset::Form => ResolverConfig::form_submission(),
            Preset::Map => ResolverConfig::map_picker(),
            Preset::Edit => ResolverConfig::edit_flow(),
        }
    }
}

#[derive(Parser)]
/// Replay a recorded stream of position samples through the location fix resolver
struct Cli {
    /// Path to a JSON scenario file
    scenario: PathBuf,

    /// Named config to resolve with
    #[arg(long, value_enum, default_value_t = Preset::Default)]
    preset: Preset,

    /// JSON config file, replaces the preset. Missing fields take the library defaults
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Treat a best sample worse than this many meters as no fix
    #[arg(long, conflicts_with = "permissive")]
    reject_threshold: Option<f64>,

    /// Never reject a best sample on accuracy alone
    #[arg(long)]
    permissive: bool,

    /// Don't wait in real time, jump the clock between samples
    #[arg(long)]
    fast: bool,

    /// Reverse geocode the fix once it resolves
    #[arg(long)]
    geocode: bool,

    /// Log every sample decision
    #[arg(short, long)]
    verbose: bool,
}

const GEOCODE_BUDGET: Duration = Duration::from_secs(10);

fn build_config(cli: &Cli) -> Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<ResolverConfig>(&raw)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => cli.preset.into(),
    };

    if cli.permissive {
        config.reject_threshold_m = None;
    } else if let Some(threshold) = cli.reject_threshold {
        config.reject_threshold_m = Some(threshold);
    }

    config.validate().context("Invalid resolver config")?;

    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    colog::default_builder().filter_level(level).init();

    let scenario = Scenario::load(&cli.scenario)?;
    let config = build_config(&cli)?;

    info!(
        "Replaying {} ({} steps)",
        scenario.name,
        scenario.steps.len()
    );

    if cli.fast {
        tokio::time::pause();
    }

    let report = run_scenario(&scenario, config).await;

    if cli.fast {
        tokio::time::resume();
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to encode report")?
    );

    match report.outcome {
        ReplayOutcome::Resolved(fix) => {
            if cli.geocode {
                let geocoder = NominatimGeocoder::new()?;
                let label = label_fix(&fix, &geocoder, GEOCODE_BUDGET).await;
                println!("{}", label.display());
            } else {
                println!("{}", fix.coordinates.fallback_label());
            }
            Ok(())
        }
        ReplayOutcome::Cancelled => Ok(()),
        ReplayOutcome::Failed(why) => Err(anyhow!(why).context("Scenario did not resolve")),
    }
}
