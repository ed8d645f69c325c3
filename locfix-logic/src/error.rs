use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample::PositionSample;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Errors a [crate::SampleSource] can report
pub enum SourceErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Why a location fix could not be produced
pub enum ErrorKind {
    /// The user or platform refused access to positioning
    PermissionDenied,
    /// The source could not produce a position
    PositionUnavailable,
    /// The host has no usable positioning subsystem
    SourceUnsupported,
    /// The hard deadline passed without a usable sample
    Timeout,
    /// Another session is sampling and the request asked not to replace it
    Busy,
    /// The config failed validation, nothing was started
    InvalidConfig,
}

impl From<SourceErrorKind> for ErrorKind {
    fn from(value: SourceErrorKind) -> Self {
        match value {
            SourceErrorKind::PermissionDenied => Self::PermissionDenied,
            SourceErrorKind::PositionUnavailable => Self::PositionUnavailable,
            SourceErrorKind::Unsupported => Self::SourceUnsupported,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::PermissionDenied => "location permission denied",
            Self::PositionUnavailable => "position unavailable",
            Self::SourceUnsupported => "location is not supported on this device",
            Self::Timeout => "timed out waiting for an accurate location",
            Self::Busy => "a location fix is already in progress",
            Self::InvalidConfig => "invalid location fix configuration",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("Location fix failed: {kind}")]
pub struct ResolverError {
    pub kind: ErrorKind,
    /// The best sample seen before failing, if any, for diagnostics
    pub best_known: Option<PositionSample>,
}

impl ResolverError {
    pub fn new(kind: ErrorKind, best_known: Option<PositionSample>) -> Self {
        Self { kind, best_known }
    }
}

impl From<ErrorKind> for ResolverError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, None)
    }
}

/// Errors from a [crate::GeocodeClient]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("Geocode request failed: {0}")]
    Request(String),

    #[error("Geocode service returned status {0}")]
    Status(u16),

    #[error("No address found for these coordinates")]
    NoAddress,

    #[error("Could not decode geocode response: {0}")]
    Decode(String),
}
