use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};
use tokio::{
    sync::{Mutex as AsyncMutex, mpsc},
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    config::{BusyPolicy, ResolverConfig},
    error::{ErrorKind, ResolverError},
    sample::ResolvedLocation,
    session::{ResolverState, SessionEvent, SessionStatus},
    source::{SampleSink, SampleSource, Subscription},
};

/// Result of a location fix request, `Ok(None)` means the request was cancelled
pub type FixResult = Result<Option<ResolvedLocation>, ResolverError>;

/// Events queued between the source callbacks and the session loop
const SAMPLE_QUEUE_CAPACITY: usize = 16;

#[derive(Default)]
struct SessionSlot {
    cancel: Option<CancellationToken>,
    status: SessionStatus,
}

/// Resolves a single coordinate from a [SampleSource], one session at a time.
///
/// Each call to [Resolver::request_location_fix] subscribes to the source, feeds every
/// reading and timer tick through a [ResolverState] and unsubscribes as soon as the session
/// ends, however it ends.
pub struct Resolver<S: SampleSource> {
    source: S,
    running: AsyncMutex<()>,
    slot: Mutex<SessionSlot>,
}

/// Marks the slot as Sampling for as long as it lives, records the final status on drop
struct ActiveSession<'a> {
    slot: &'a Mutex<SessionSlot>,
    status: SessionStatus,
}

impl<'a> ActiveSession<'a> {
    fn begin(slot: &'a Mutex<SessionSlot>, cancel: CancellationToken) -> Self {
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.cancel = Some(cancel);
        guard.status = SessionStatus::Sampling;
        Self {
            slot,
            status: SessionStatus::Idle,
        }
    }
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.cancel = None;
        guard.status = self.status;
    }
}

impl<S: SampleSource> Resolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            running: AsyncMutex::new(()),
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Status of the current session, or how the last one ended
    pub fn status(&self) -> SessionStatus {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Abandon the session currently sampling, if any. Its request resolves to `Ok(None)`.
    pub fn cancel_location_fix(&self) {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = slot.cancel.as_ref() {
            cancel.cancel();
        }
    }

    pub async fn request_location_fix(&self, config: ResolverConfig) -> FixResult {
        self.request_location_fix_with(config, CancellationToken::new())
            .await
    }

    /// Same as [Self::request_location_fix], but also stops when `cancel` is cancelled
    pub async fn request_location_fix_with(
        &self,
        config: ResolverConfig,
        cancel: CancellationToken,
    ) -> FixResult {
        if let Err(why) = config.validate() {
            warn!("Refusing to start location fix: {why:#}");
            return Err(ErrorKind::InvalidConfig.into());
        }

        let _running = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => match config.on_busy {
                BusyPolicy::Reject => {
                    debug!("Rejecting location fix, another one is in progress");
                    return Err(ErrorKind::Busy.into());
                }
                BusyPolicy::Restart => {
                    info!("Restarting in-progress location fix");
                    self.cancel_location_fix();
                    self.running.lock().await
                }
            },
        };

        // Cancelling the session must not cancel the caller's token
        let cancel = cancel.child_token();
        let mut active = ActiveSession::begin(&self.slot, cancel.clone());

        let res = self.run_session(&config, &cancel).await;

        active.status = match &res {
            Ok(Some(_)) => SessionStatus::Resolved,
            Ok(None) => SessionStatus::Idle,
            Err(_) => SessionStatus::Failed,
        };

        res
    }

    /// Main loop of a session, handles samples from the source and both deadlines
    async fn run_session(&self, config: &ResolverConfig, cancel: &CancellationToken) -> FixResult {
        let id = Uuid::new_v4();
        let started = Instant::now();
        let mut state = ResolverState::start(config.clone(), started);

        let (tx, mut rx) = mpsc::channel(SAMPLE_QUEUE_CAPACITY);

        let subscription =
            match Subscription::open(&self.source, SampleSink::new(tx), config.source_options()) {
                Ok(sub) => sub,
                Err(kind) => {
                    warn!("Location fix {id}: source failed to start: {kind:?}");
                    return Err(ResolverError::new(kind.into(), None));
                }
            };

        debug!("Location fix {id} started with {config:?}");

        let soft = sleep_until(started + config.soft_timeout());
        let hard = sleep_until(started + config.hard_timeout());
        tokio::pin!(soft, hard);

        let mut soft_fired = false;
        let mut source_open = true;

        let outcome = loop {
            let event = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Location fix {id} cancelled");
                    break None;
                }

                _ = &mut hard => SessionEvent::HardTimeoutTick,

                event = rx.recv(), if source_open => {
                    match event {
                        Some(event) => event.into(),
                        None => {
                            // The source dropped every sink without stopping, only the
                            // timers can end the session now
                            debug!("Location fix {id}: source closed its sinks");
                            source_open = false;
                            continue;
                        }
                    }
                }

                _ = &mut soft, if !soft_fired => {
                    soft_fired = true;
                    SessionEvent::SoftTimeoutTick
                }
            };

            if let Some(outcome) = state.handle(event, Instant::now()) {
                break Some(outcome);
            }
        };

        drop(subscription);
        drop(rx);

        match &outcome {
            Some(Ok(fix)) => info!(
                "Location fix {id} resolved ({:?}) at ±{:.0}m after {} samples in {:?}",
                fix.reason,
                fix.accuracy_meters,
                fix.sample_count,
                state.elapsed(Instant::now())
            ),
            Some(Err(why)) => warn!(
                "Location fix {id} failed after {} samples: {why}",
                state.sample_count()
            ),
            None => {}
        }

        outcome.transpose()
    }
}
