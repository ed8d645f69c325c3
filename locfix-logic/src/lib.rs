mod config;
mod error;
mod geocode;
mod policy;
mod resolver;
mod sample;
mod session;
mod source;
mod tracker;

pub use config::{BusyPolicy, ResolverConfig, SourceOptions};
pub use error::{ErrorKind, GeocodeError, ResolverError, SourceErrorKind};
pub use geocode::{FixLabel, GeocodeClient, label_fix};
pub use policy::{Decision, evaluate, on_hard_timeout, on_max_samples, on_soft_timeout};
pub use resolver::{FixResult, Resolver};
pub use sample::{Coordinates, FixReason, PositionSample, ResolvedLocation, UtcDT};
pub use session::{ResolverState, SessionEvent, SessionStatus};
pub use source::{SampleSink, SampleSource, SourceEvent};
pub use tracker::AccuracyTracker;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
