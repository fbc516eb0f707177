//! # Playback Coordinator
//!
//! Owns the [`EngineState`] and serializes every change to it.
//!
//! ## Architecture
//!
//! A single task (the coordinator) receives three kinds of input:
//!
//! - control commands from [`PlayerHandle`] (with a reply channel),
//! - events from the rendering surface,
//! - progress reports from the in-flight resolution task.
//!
//! Each input becomes an [`Action`] for [`reduce`]; the resulting
//! [`Effect`]s are carried out before the next input is taken. Resolutions
//! run in their own task so a slow catalog or a backoff delay never blocks
//! commands. Every resolution is tagged with a generation number and
//! cancelled when superseded, so late results of abandoned work are
//! discarded by the reducer.
//!
//! A watchdog tick detects confirmed playback that stopped advancing and
//! triggers a fresh resolution at the current position.
//!
//! A URL that loaded while the listener was paused is only trusted once
//! playback later advances on it. Until then its cache entry stays
//! unconfirmed and the next track is not preloaded.

use async_trait::async_trait;
use bridge_traits::{
    AudioQuality, BridgeError, RenderingSurface, StreamUrl, SurfaceEvent, SurfaceEventStream,
};
use core_async::sync::{mpsc, oneshot, watch, CancellationToken};
use core_async::task::JoinHandle;
use core_async::time::{interval, sleep_until, Instant, MissedTickBehavior};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::{StreamCache, TieredStore};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::preload::Preloader;
use crate::queue::QueueState;
use crate::resolver::{AttemptLoader, AttemptOutcome, ResolveRequest, StreamResolver};
use crate::state::{reduce, Action, Effect, EngineState, Intent, ResolveJob, RetryPhase};
use crate::telemetry::{FailureReason, Telemetry, TelemetryEvent, TelemetryKind};
use crate::types::{PlaybackStatus, PlayerSnapshot, RepeatMode, Track};

const COMMAND_BUFFER: usize = 64;
const ATTEMPT_EVENT_BUFFER: usize = 64;

struct Command {
    action: Action,
    reply: oneshot::Sender<Result<()>>,
}

/// Entry point that wires the bridges together and spawns the coordinator.
pub struct PlayerEngine;

impl PlayerEngine {
    /// Starts the engine.
    ///
    /// Selects the cache backend (durable first, fallback otherwise),
    /// subscribes to the rendering surface and spawns the coordinator task.
    pub async fn start(core: CoreConfig, config: PlaybackConfig) -> Result<PlayerHandle> {
        config.validate()?;
        core.validate()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;
        let config = Arc::new(config);
        let bus = core.event_bus.clone();

        let durable = core.open_durable_store().await;
        let store = TieredStore::select(durable, core.fallback_store.clone())
            .await
            .with_events(bus.clone());
        let cache = Arc::new(
            StreamCache::new(
                Arc::new(store),
                Arc::clone(&core.clock),
                config.cache_ttl,
                config.max_cache_failures,
            )
            .with_events(bus.clone()),
        );
        let telemetry = Arc::new(Telemetry::new(
            config.telemetry_capacity,
            Arc::clone(&core.clock),
        ));

        let mut resolver = StreamResolver::new(
            Arc::clone(&core.catalog),
            Arc::clone(&cache),
            Arc::clone(&telemetry),
            Arc::clone(&config),
        );
        if let Some(http) = &core.http_client {
            if core.features.enable_probe || core.features.enable_preload {
                resolver = resolver.with_http(Arc::clone(http), core.features.enable_probe);
            }
        }
        let resolver = Arc::new(resolver);

        let preloader = if core.features.enable_preload {
            let mut preloader = Preloader::new(
                Arc::clone(&resolver),
                Arc::clone(&telemetry),
                config.preload_max_error_rate,
                bus.clone(),
            );
            if core.features.enable_network_awareness {
                if let Some(monitor) = &core.network_monitor {
                    preloader = preloader.with_network_monitor(Arc::clone(monitor));
                }
            }
            Some(Arc::new(preloader))
        } else {
            None
        };

        let surface = Arc::clone(&core.surface);
        let surface_events = surface.subscribe_events().await?;
        if let Err(e) = surface.set_volume(config.initial_volume.clamp(0.0, 1.0)).await {
            warn!(error = %e, "Failed to apply initial volume");
        }

        let state = EngineState::new(
            QueueState::new(),
            config.default_quality,
            config.initial_volume,
        );
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
        let (intent_tx, _) = watch::channel(state.intent);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        info!(
            backend = cache.backend_name(),
            probe = core.features.enable_probe,
            preload = preloader.is_some(),
            max_attempts = config.max_attempts,
            "Player engine starting"
        );

        let coordinator = Coordinator {
            state,
            surface,
            surface_events,
            resolver,
            preloader,
            telemetry: Arc::clone(&telemetry),
            bus: bus.clone(),
            config,
            snapshot_tx,
            intent_tx,
            internal_tx,
            resolution: None,
            awaiting_confirmation: None,
            last_progress: Instant::now(),
            last_time: 0.0,
            shutdown: shutdown.clone(),
        };
        let task = core_async::spawn(coordinator.run(command_rx, internal_rx));

        Ok(PlayerHandle {
            commands: command_tx,
            state: snapshot_rx,
            telemetry,
            cache,
            events: bus,
            shutdown,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}

/// Control surface of a running engine. Cheap to clone.
///
/// Commands resolve once the coordinator has applied them, which is before
/// any resolution they start has finished.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PlayerSnapshot>,
    telemetry: Arc<Telemetry>,
    cache: Arc<StreamCache>,
    events: EventBus,
    shutdown: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PlayerHandle {
    /// Replaces the queue, starts at `index` and plays.
    pub async fn play_queue(&self, tracks: Vec<Track>, index: usize) -> Result<()> {
        self.dispatch(Action::PlayQueue { tracks, index }).await
    }

    /// Replaces the queue without interrupting a track that stays current.
    ///
    /// `current` names the track that should be current; when it is absent
    /// from `tracks`, `index` is used.
    pub async fn set_queue(
        &self,
        tracks: Vec<Track>,
        index: usize,
        current: Option<String>,
    ) -> Result<()> {
        self.dispatch(Action::SetQueue {
            tracks,
            index,
            current,
        })
        .await
    }

    pub async fn play(&self) -> Result<()> {
        self.dispatch(Action::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.dispatch(Action::Pause).await
    }

    pub async fn next(&self) -> Result<()> {
        self.dispatch(Action::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.dispatch(Action::Previous).await
    }

    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        self.dispatch(Action::SeekTo(seconds)).await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.dispatch(Action::SetRepeatMode(mode)).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.dispatch(Action::ToggleShuffle).await
    }

    /// Seed for the next shuffle order; makes shuffling reproducible.
    pub async fn set_shuffle_seed(&self, seed: u64) -> Result<()> {
        self.dispatch(Action::SetShuffleSeed(seed)).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.dispatch(Action::SetVolume(volume)).await
    }

    pub async fn set_quality(&self, quality: AudioQuality) -> Result<()> {
        self.dispatch(Action::SetQuality(quality)).await
    }

    /// Latest published state.
    pub fn get_state(&self) -> PlayerSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<PlayerSnapshot> {
        self.state.clone()
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    pub fn cache(&self) -> &Arc<StreamCache> {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Stops the coordinator and cancels in-flight work. Later commands fail
    /// with [`PlaybackError::EngineClosed`].
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Player engine task failed");
            }
        }
    }

    async fn dispatch(&self, action: Action) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(PlaybackError::EngineClosed);
        }
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { action, reply })
            .await
            .map_err(|_| PlaybackError::EngineClosed)?;
        response.await.map_err(|_| PlaybackError::EngineClosed)?
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("status", &self.state.borrow().status())
            .field("running", &self.is_running())
            .finish()
    }
}

/// The resolution currently allowed to report back.
struct Resolution {
    generation: u64,
    token: CancellationToken,
    surface_events: mpsc::Sender<SurfaceEvent>,
}

/// A stream that loaded while paused and has not played yet.
struct PendingConfirmation {
    generation: u64,
    track_id: String,
    quality: AudioQuality,
    stream: StreamUrl,
    baseline: Option<f64>,
}

struct Coordinator {
    state: EngineState,
    surface: Arc<dyn RenderingSurface>,
    surface_events: Box<dyn SurfaceEventStream>,
    resolver: Arc<StreamResolver>,
    preloader: Option<Arc<Preloader>>,
    telemetry: Arc<Telemetry>,
    bus: EventBus,
    config: Arc<PlaybackConfig>,
    snapshot_tx: watch::Sender<PlayerSnapshot>,
    intent_tx: watch::Sender<Intent>,
    internal_tx: mpsc::UnboundedSender<Action>,
    resolution: Option<Resolution>,
    awaiting_confirmation: Option<PendingConfirmation>,
    /// Last time confirmed playback advanced (or was expected to restart).
    last_progress: Instant,
    last_time: f64,
    shutdown: CancellationToken,
}

impl Coordinator {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Action>,
    ) {
        let mut watchdog = interval(self.config.watchdog_interval);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut surface_open = true;

        loop {
            core_async::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(action) = internal.recv() => {
                    if let Err(e) = self.step(action).await {
                        debug!(error = %e, "Internal action rejected");
                    }
                }
                event = self.surface_events.next(), if surface_open => match event {
                    Some(event) => self.on_surface_event(event).await,
                    None => {
                        warn!("Rendering surface event stream closed");
                        surface_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(Command { action, reply }) => {
                        let result = self.step(action).await;
                        reply.send(result).ok();
                    }
                    None => break,
                },
                _ = watchdog.tick() => self.check_stall().await,
            }
        }

        if let Some(resolution) = self.resolution.take() {
            resolution.token.cancel();
        }
        if let Some(preloader) = &self.preloader {
            preloader.cancel();
        }
        info!("Player engine stopped");
    }

    /// Applies `action` and everything it triggers, then publishes the new
    /// state once.
    async fn step(&mut self, action: Action) -> Result<()> {
        let before = self.state.status();
        let before_track = self.state.current_track().map(|t| t.id.clone());

        if action.is_command() {
            self.record(TelemetryKind::Command, action.name());
        }
        if !matches!(action, Action::Surface(_)) {
            self.last_progress = Instant::now();
        }

        let mut pending = VecDeque::from([action]);
        let mut first = true;
        while let Some(action) = pending.pop_front() {
            let effects = match reduce(&mut self.state, action) {
                Ok(effects) => effects,
                Err(e) if first => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Follow-up action rejected");
                    continue;
                }
            };
            first = false;
            self.intent_tx.send_replace(self.state.intent);

            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }

        self.publish(before, before_track);
        Ok(())
    }

    async fn execute(&mut self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::CancelResolution => {
                self.awaiting_confirmation = None;
                if let Some(resolution) = self.resolution.take() {
                    debug!(generation = resolution.generation, "Cancelling resolution");
                    resolution.token.cancel();
                }
            }
            Effect::Resolve(job) => {
                self.awaiting_confirmation = None;
                self.spawn_resolution(job);
            }
            Effect::AwaitConfirmation {
                generation,
                track_id,
                quality,
                stream,
            } => {
                debug!(generation, track_id = %track_id, "Stream loaded paused, awaiting playback");
                self.awaiting_confirmation = Some(PendingConfirmation {
                    generation,
                    track_id,
                    quality,
                    stream,
                    baseline: None,
                });
            }
            Effect::SurfacePlay { generation } => match self.surface.play().await {
                Ok(()) => {}
                Err(BridgeError::Rejected(message)) => {
                    return Some(Action::PlayRejected {
                        generation,
                        message,
                    })
                }
                Err(e) => warn!(error = %e, "Surface play failed"),
            },
            Effect::SurfacePause => {
                if let Err(e) = self.surface.pause().await {
                    warn!(error = %e, "Surface pause failed");
                }
            }
            Effect::SurfaceSeek(position) => {
                self.last_time = position;
                if let Err(e) = self.surface.seek(position).await {
                    warn!(position, error = %e, "Surface seek failed");
                }
            }
            Effect::SurfaceVolume(volume) => {
                if let Err(e) = self.surface.set_volume(volume).await {
                    warn!(volume, error = %e, "Surface volume change failed");
                }
            }
            Effect::Preload { track, quality } => {
                if let Some(preloader) = &self.preloader {
                    debug!(track_id = %track.id, "Requesting preload");
                    drop(preloader.hint(&track.id, quality));
                }
            }
            Effect::Emit(event) => self.emit(event),
        }
        None
    }

    fn spawn_resolution(&mut self, job: ResolveJob) {
        let token = self.shutdown.child_token();
        let (events_tx, events_rx) = mpsc::channel(ATTEMPT_EVENT_BUFFER);
        self.resolution = Some(Resolution {
            generation: job.generation,
            token: token.clone(),
            surface_events: events_tx,
        });

        debug!(
            generation = job.generation,
            track_id = %job.track.id,
            quality = %job.quality,
            resume_at = job.resume_at,
            skip_cache = job.skip_cache,
            "Starting resolution"
        );

        let mut loader = SurfaceAttempt {
            surface: Arc::clone(&self.surface),
            events: events_rx,
            intent: self.intent_tx.subscribe(),
            internal: self.internal_tx.clone(),
            generation: job.generation,
            resume_at: job.resume_at,
            config: Arc::clone(&self.config),
        };
        let resolver = Arc::clone(&self.resolver);
        let internal = self.internal_tx.clone();
        let request = ResolveRequest::new(job.track.id, job.quality).skip_cache(job.skip_cache);
        let generation = job.generation;

        core_async::spawn(async move {
            let action = match resolver.resolve(&request, &mut loader, &token).await {
                Ok(resolved) => Action::ResolutionSucceeded {
                    generation,
                    confirmed: resolved.confirmed,
                    stream: resolved.stream_url(),
                },
                Err(error) => Action::ResolutionFailed { generation, error },
            };
            internal.send(action).ok();
        });
    }

    async fn on_surface_event(&mut self, event: SurfaceEvent) {
        match &event {
            SurfaceEvent::TimeUpdate(t) => {
                if (t - self.last_time).abs() > f64::EPSILON {
                    self.last_time = *t;
                    self.last_progress = Instant::now();
                }
            }
            SurfaceEvent::Playing => self.last_progress = Instant::now(),
            other => self.record(TelemetryKind::SurfaceEvent, other.name()),
        }

        if let SurfaceEvent::Error(code) = &event {
            if self.state.retry == RetryPhase::Ready && self.state.accept_surface {
                self.record_playback_failure(PlaybackError::from_media_error(*code))
                    .await;
            }
        }

        self.track_confirmation(&event).await;

        if let Some(resolution) = &self.resolution {
            resolution.surface_events.try_send(event.clone()).ok();
        }

        if let Err(e) = self.step(Action::Surface(event)).await {
            debug!(error = %e, "Surface event rejected");
        }
    }

    async fn check_stall(&mut self) {
        if !self.state.expects_progress() {
            return;
        }
        let stalled_for = self.last_progress.elapsed();
        if stalled_for < self.config.stall_timeout {
            return;
        }

        warn!(
            stalled_ms = stalled_for.as_millis() as u64,
            position = self.state.current_time,
            "Playback stalled, re-resolving"
        );
        self.record_playback_failure(PlaybackError::Stall(stalled_for))
            .await;
        self.last_progress = Instant::now();

        let generation = self.state.generation;
        if let Err(e) = self.step(Action::StallDetected { generation }).await {
            debug!(error = %e, "Stall recovery rejected");
        }
    }

    /// Counts a failure of the confirmed URL against its cache entry.
    async fn record_playback_failure(&mut self, error: PlaybackError) {
        let Some(track) = self.state.current_track() else {
            return;
        };
        let track_id = track.id.clone();
        let quality = track.effective_quality(self.state.quality);
        self.telemetry.record(
            TelemetryEvent::new(TelemetryKind::SurfaceEvent, "playback_failure")
                .track(&track_id)
                .position(self.state.current_time, self.state.duration, false)
                .reason(error.failure_reason())
                .detail(error.to_string()),
        );
        let cache = Arc::clone(self.resolver.cache());
        cache.record_failure(&track_id, quality, &error).await;
    }

    /// Confirms a paused-ready stream once playback advances on it by the
    /// sustain threshold, or reaches the end.
    ///
    /// Runs before the event is reduced so an `Ended` that moves the queue
    /// on still credits the finished track.
    async fn track_confirmation(&mut self, event: &SurfaceEvent) {
        let Some(pending) = self.awaiting_confirmation.as_mut() else {
            return;
        };
        if pending.generation != self.state.generation || self.state.retry != RetryPhase::Ready {
            self.awaiting_confirmation = None;
            return;
        }

        let sustained = match event {
            SurfaceEvent::Ended => true,
            SurfaceEvent::TimeUpdate(t) if self.state.status() == PlaybackStatus::Playing => {
                match pending.baseline {
                    None => {
                        pending.baseline = Some(*t);
                        false
                    }
                    Some(start) => t - start >= self.config.sustain_progress,
                }
            }
            _ => false,
        };
        if !sustained {
            return;
        }
        let Some(pending) = self.awaiting_confirmation.take() else {
            return;
        };

        let cache = Arc::clone(self.resolver.cache());
        cache
            .confirm(&pending.track_id, pending.quality, &pending.stream)
            .await;
        info!(track_id = %pending.track_id, "Stream confirmed after resume");

        let generation = pending.generation;
        if let Err(e) = self.step(Action::PlaybackConfirmed { generation }).await {
            debug!(error = %e, "Playback confirmation rejected");
        }
    }

    fn publish(&mut self, before: PlaybackStatus, before_track: Option<String>) {
        let after = self.state.status();
        let track_id = self.state.current_track().map(|t| t.id.clone());

        if after != before || track_id != before_track {
            info!(
                from = before.as_str(),
                to = after.as_str(),
                track_id = track_id.as_deref().unwrap_or(""),
                "Playback status changed"
            );
            let mut event = TelemetryEvent::new(TelemetryKind::StateTransition, after.as_str())
                .position(
                    self.state.current_time,
                    self.state.duration,
                    self.state.intent == Intent::Pause,
                )
                .detail(format!("{} -> {}", before, after));
            if let Some(id) = &track_id {
                event = event.track(id);
            }
            self.telemetry.record(event);
            if after != before {
                self.emit(PlaybackEvent::StatusChanged {
                    track_id: track_id.clone(),
                    status: after.as_str().to_string(),
                });
            }
        }

        self.snapshot_tx.send_replace(self.state.snapshot());
    }

    fn record(&self, kind: TelemetryKind, name: &str) {
        let mut event = TelemetryEvent::new(kind, name).position(
            self.state.current_time,
            self.state.duration,
            self.state.intent == Intent::Pause,
        );
        if let Some(track) = self.state.current_track() {
            event = event.track(&track.id);
        }
        self.telemetry.record(event);
    }

    fn emit(&self, event: PlaybackEvent) {
        self.bus.emit(CoreEvent::Playback(event)).ok();
    }
}

/// Plays one candidate URL on the shared rendering surface.
///
/// Surface events reach it through the coordinator, which forwards
/// everything it receives while this attempt's resolution is current.
struct SurfaceAttempt {
    surface: Arc<dyn RenderingSurface>,
    events: mpsc::Receiver<SurfaceEvent>,
    intent: watch::Receiver<Intent>,
    internal: mpsc::UnboundedSender<Action>,
    generation: u64,
    resume_at: f64,
    config: Arc<PlaybackConfig>,
}

impl SurfaceAttempt {
    async fn await_sustained(&mut self) -> Result<AttemptOutcome> {
        let load_deadline = Instant::now() + self.config.load_timeout;
        let mut ready = false;
        let mut play_requested = false;
        let mut playing = false;
        let mut baseline: Option<f64> = None;
        let mut last_time: Option<f64> = None;
        let mut last_progress = Instant::now();

        loop {
            let intent = *self.intent.borrow();
            if ready && intent == Intent::Pause {
                return Ok(AttemptOutcome::ReadyPaused);
            }
            if ready && !play_requested {
                play_requested = true;
                self.surface.play().await.map_err(|e| match e {
                    BridgeError::Rejected(message) => PlaybackError::PlaybackRejected(message),
                    other => PlaybackError::from(other),
                })?;
            }

            let deadline = if playing {
                last_progress + self.config.stall_timeout
            } else {
                load_deadline
            };

            core_async::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        return Err(PlaybackError::Cancelled);
                    };
                    match event {
                        SurfaceEvent::CanPlay => {
                            if !ready {
                                ready = true;
                                if self.resume_at > 0.0 {
                                    if let Err(e) = self.surface.seek(self.resume_at).await {
                                        warn!(position = self.resume_at, error = %e, "Resume seek failed");
                                    }
                                }
                            }
                        }
                        SurfaceEvent::Playing => {
                            ready = true;
                            play_requested = true;
                            if !playing {
                                playing = true;
                                last_progress = Instant::now();
                            }
                        }
                        SurfaceEvent::TimeUpdate(t) if playing => {
                            match baseline {
                                None => baseline = Some(t),
                                Some(start) if t - start >= self.config.sustain_progress => {
                                    return Ok(AttemptOutcome::Sustained);
                                }
                                Some(_) => {}
                            }
                            if last_time != Some(t) {
                                last_time = Some(t);
                                last_progress = Instant::now();
                            }
                        }
                        SurfaceEvent::Ended if ready => return Ok(AttemptOutcome::Sustained),
                        SurfaceEvent::Error(code) => {
                            return Err(PlaybackError::from_media_error(code));
                        }
                        _ => {}
                    }
                }
                changed = self.intent.changed() => {
                    if changed.is_err() {
                        return Err(PlaybackError::Cancelled);
                    }
                }
                _ = sleep_until(deadline) => {
                    return Err(if playing {
                        PlaybackError::Stall(self.config.stall_timeout)
                    } else {
                        PlaybackError::Timeout(self.config.load_timeout)
                    });
                }
            }
        }
    }
}

#[async_trait]
impl AttemptLoader for SurfaceAttempt {
    async fn attempt(&mut self, attempt: u32, url: &str) -> Result<AttemptOutcome> {
        self.internal
            .send(Action::AttemptStarted {
                generation: self.generation,
                attempt,
            })
            .ok();
        while self.events.try_recv().is_ok() {}

        self.surface.load(url).await?;
        self.await_sustained().await
    }

    fn attempt_failed(&mut self, attempt: u32, error: &PlaybackError) {
        if error.failure_reason() != FailureReason::Cancelled {
            self.internal
                .send(Action::AttemptFailed {
                    generation: self.generation,
                    attempt,
                    error: error.clone(),
                })
                .ok();
        }
    }
}
