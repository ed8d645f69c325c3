use log::{debug, warn};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{config::SourceOptions, error::SourceErrorKind, sample::PositionSample};

/// Something pushed by a [SampleSource]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceEvent {
    Sample(PositionSample),
    Error(SourceErrorKind),
}

/// Callback side of a subscription, handed to [SampleSource::start].
///
/// Pushes never block. Events are queued for the session that created the sink and are
/// dropped once that session has ended or if the queue is full.
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: mpsc::Sender<SourceEvent>,
}

impl SampleSink {
    pub(crate) fn new(tx: mpsc::Sender<SourceEvent>) -> Self {
        Self { tx }
    }

    /// Push a reading, returns whether it was queued. Invalid samples (negative or
    /// non-finite accuracy, coordinates off the globe) are never queued.
    pub fn on_sample(&self, sample: PositionSample) -> bool {
        if !sample.is_valid() {
            warn!("Dropping invalid position sample: {sample:?}");
            return false;
        }
        self.push(SourceEvent::Sample(sample))
    }

    /// Report a source error, returns whether it was queued
    pub fn on_error(&self, kind: SourceErrorKind) -> bool {
        self.push(SourceEvent::Error(kind))
    }

    /// Whether the session this sink feeds has ended
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn push(&self, event: SourceEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("Sample queue full, dropping {event:?}");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Session already ended, dropping event");
                false
            }
        }
    }
}

/// A push-based stream of position readings from the host platform
pub trait SampleSource: Send + Sync {
    /// Identifies one subscription so it can be stopped
    type Handle: Send;

    /// Begin pushing readings into `sink` until [Self::stop] is called. Pushes may come
    /// from any thread, any number of times.
    fn start(&self, sink: SampleSink, options: SourceOptions)
    -> Result<Self::Handle, SourceErrorKind>;

    /// Stop pushing into the sink of this subscription
    fn stop(&self, handle: Self::Handle);
}

/// A live subscription, stopped when dropped
pub(crate) struct Subscription<'a, S: SampleSource> {
    source: &'a S,
    handle: Option<S::Handle>,
}

impl<'a, S: SampleSource> Subscription<'a, S> {
    pub fn open(
        source: &'a S,
        sink: SampleSink,
        options: SourceOptions,
    ) -> Result<Self, SourceErrorKind> {
        let handle = source.start(sink, options)?;
        Ok(Self {
            source,
            handle: Some(handle),
        })
    }
}

impl<S: SampleSource> Drop for Subscription<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.source.stop(handle);
        }
    }
}
