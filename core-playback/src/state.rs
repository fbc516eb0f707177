//! # Playback State Machine
//!
//! The engine's state container and its transition function.
//!
//! Every command and every rendering-surface event becomes an [`Action`];
//! [`reduce`] applies it to [`EngineState`] and returns the [`Effect`]s the
//! coordinator must carry out (surface commands, resolution jobs, events).
//! The reducer performs no I/O, so transitions are unit-testable without a
//! surface or a network.
//!
//! The visible [`PlaybackStatus`] is never stored. It is projected by
//! [`project_status`] from three independent pieces of state: the user's
//! intent, the last relevant surface phase and the retry phase of the
//! current resolution.

use bridge_traits::{AudioQuality, StreamUrl, SurfaceEvent};
use core_runtime::events::PlaybackEvent;
use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};
use crate::queue::QueueState;
use crate::types::{PlaybackState, PlaybackStatus, PlayerSnapshot, RepeatMode, Track};

/// Whether the user last asked to play or to pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Play,
    #[default]
    Pause,
}

/// Last relevant signal from the rendering surface for the current load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfacePhase {
    /// Nothing loaded for the current generation.
    #[default]
    Empty,
    /// `load` issued, no readiness yet.
    Loading,
    CanPlay,
    Playing,
    Waiting,
    Paused,
    Ended,
}

/// Where the current track's resolution stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum RetryPhase {
    /// No resolution for the current track (nothing loaded or queue ended).
    #[default]
    Idle,
    /// Attempt `attempt` is in progress.
    Resolving { attempt: u32 },
    /// Attempt `attempt` failed; waiting before the next one.
    Backoff { attempt: u32 },
    /// A URL reached sustained playback.
    Ready,
    /// The host refused to start playback.
    Rejected,
    /// Every attempt failed.
    Failed,
}

impl RetryPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, RetryPhase::Resolving { .. } | RetryPhase::Backoff { .. })
    }
}

/// Status shown to the host, derived from intent, surface and retry phase.
pub fn project_status(
    has_track: bool,
    intent: Intent,
    surface: SurfacePhase,
    retry: RetryPhase,
) -> PlaybackStatus {
    if !has_track {
        return PlaybackStatus::Idle;
    }

    match retry {
        RetryPhase::Idle => PlaybackStatus::Idle,
        RetryPhase::Failed => PlaybackStatus::Error,
        RetryPhase::Rejected => PlaybackStatus::Paused,
        RetryPhase::Resolving { .. } | RetryPhase::Backoff { .. } => match intent {
            Intent::Pause => PlaybackStatus::Paused,
            Intent::Play => match surface {
                SurfacePhase::Playing => PlaybackStatus::Playing,
                SurfacePhase::Waiting => PlaybackStatus::Buffering,
                _ => PlaybackStatus::Loading,
            },
        },
        RetryPhase::Ready => match intent {
            Intent::Pause => PlaybackStatus::Paused,
            Intent::Play => match surface {
                SurfacePhase::Playing => PlaybackStatus::Playing,
                _ => PlaybackStatus::Buffering,
            },
        },
    }
}

/// A resolution the coordinator must start.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveJob {
    pub generation: u64,
    pub track: Track,
    pub quality: AudioQuality,
    /// Position to seek to once the URL is ready.
    pub resume_at: f64,
    /// Go straight to the catalog (the cached URL is known bad).
    pub skip_cache: bool,
}

/// Inputs to the transition function.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Commands
    PlayQueue {
        tracks: Vec<Track>,
        index: usize,
    },
    SetQueue {
        tracks: Vec<Track>,
        index: usize,
        /// Identity of the track that should be current, overriding `index`
        /// when it is found in `tracks`.
        current: Option<String>,
    },
    Play,
    Pause,
    Next,
    Previous,
    SeekTo(f64),
    SetRepeatMode(RepeatMode),
    ToggleShuffle,
    SetShuffleSeed(u64),
    SetVolume(f32),
    SetQuality(AudioQuality),

    // Rendering surface
    Surface(SurfaceEvent),

    // Resolution progress
    AttemptStarted {
        generation: u64,
        attempt: u32,
    },
    AttemptFailed {
        generation: u64,
        attempt: u32,
        error: PlaybackError,
    },
    ResolutionSucceeded {
        generation: u64,
        /// Whether playback already advanced on the stream. A stream that
        /// loaded while paused is confirmed later by the coordinator.
        confirmed: bool,
        stream: StreamUrl,
    },
    ResolutionFailed {
        generation: u64,
        error: PlaybackError,
    },

    // Coordinator observations
    PlayRejected {
        generation: u64,
        message: String,
    },
    StallDetected {
        generation: u64,
    },
    /// A paused-ready stream played past the sustain threshold.
    PlaybackConfirmed {
        generation: u64,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::PlayQueue { .. } => "play_queue",
            Action::SetQueue { .. } => "set_queue",
            Action::Play => "play",
            Action::Pause => "pause",
            Action::Next => "next",
            Action::Previous => "previous",
            Action::SeekTo(_) => "seek_to",
            Action::SetRepeatMode(_) => "set_repeat_mode",
            Action::ToggleShuffle => "toggle_shuffle",
            Action::SetShuffleSeed(_) => "set_shuffle_seed",
            Action::SetVolume(_) => "set_volume",
            Action::SetQuality(_) => "set_quality",
            Action::Surface(event) => event.name(),
            Action::AttemptStarted { .. } => "attempt_started",
            Action::AttemptFailed { .. } => "attempt_failed",
            Action::ResolutionSucceeded { .. } => "resolution_succeeded",
            Action::ResolutionFailed { .. } => "resolution_failed",
            Action::PlayRejected { .. } => "play_rejected",
            Action::StallDetected { .. } => "stall_detected",
            Action::PlaybackConfirmed { .. } => "playback_confirmed",
        }
    }

    /// Commands issued through the control surface.
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Action::PlayQueue { .. }
                | Action::SetQueue { .. }
                | Action::Play
                | Action::Pause
                | Action::Next
                | Action::Previous
                | Action::SeekTo(_)
                | Action::SetRepeatMode(_)
                | Action::ToggleShuffle
                | Action::SetShuffleSeed(_)
                | Action::SetVolume(_)
                | Action::SetQuality(_)
        )
    }
}

/// Work the coordinator performs after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Abandon the in-flight resolution, if any.
    CancelResolution,
    Resolve(ResolveJob),
    SurfacePlay {
        generation: u64,
    },
    SurfacePause,
    SurfaceSeek(f64),
    SurfaceVolume(f32),
    /// Watch the current load and confirm `stream` once it really plays.
    AwaitConfirmation {
        generation: u64,
        track_id: String,
        quality: AudioQuality,
        stream: StreamUrl,
    },
    /// Warm the cache for the likely-next track.
    Preload {
        track: Track,
        quality: AudioQuality,
    },
    Emit(PlaybackEvent),
}

/// Everything the engine knows about playback.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub queue: QueueState,
    pub intent: Intent,
    pub surface: SurfacePhase,
    pub retry: RetryPhase,
    /// Bumped whenever a new resolution starts; results carrying an older
    /// generation are stale.
    pub generation: u64,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f32,
    pub quality: AudioQuality,
    pub last_error: Option<String>,
    /// Seek requested while resolving, applied on success.
    pub pending_seek: Option<f64>,
    /// Whether surface events belong to the current load.
    pub accept_surface: bool,
}

impl EngineState {
    pub fn new(queue: QueueState, quality: AudioQuality, volume: f32) -> Self {
        Self {
            queue,
            intent: Intent::Pause,
            surface: SurfacePhase::Empty,
            retry: RetryPhase::Idle,
            generation: 0,
            current_time: 0.0,
            duration: 0.0,
            volume: clamp_volume(volume),
            quality,
            last_error: None,
            pending_seek: None,
            accept_surface: false,
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub fn status(&self) -> PlaybackStatus {
        project_status(
            self.current_track().is_some(),
            self.intent,
            self.surface,
            self.retry,
        )
    }

    /// Whether confirmed playback should be advancing time right now.
    pub fn expects_progress(&self) -> bool {
        self.retry == RetryPhase::Ready
            && self.intent == Intent::Play
            && self.surface != SurfacePhase::Ended
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            status: self.status(),
            current_track: self.current_track().cloned(),
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
            quality: self.quality,
            last_error: self.last_error.clone(),
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.playback_state(),
            queue: self.queue.tracks().to_vec(),
            queue_index: self.queue.index(),
            shuffle_enabled: self.queue.is_shuffled(),
            shuffle_order: self.queue.shuffle_order().map(<[usize]>::to_vec),
            shuffle_seed: self.queue.shuffle_seed(),
            repeat_mode: self.queue.repeat_mode(),
        }
    }

    fn clamp_time(&self, t: f64) -> f64 {
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        if self.duration > 0.0 {
            t.min(self.duration)
        } else {
            t
        }
    }

    /// Starts a fresh resolution of the current queue position.
    fn start_resolution(&mut self, resume_at: f64, skip_cache: bool, effects: &mut Vec<Effect>) {
        effects.push(Effect::CancelResolution);
        let Some(track) = self.queue.current().cloned() else {
            return;
        };

        self.generation += 1;
        self.retry = RetryPhase::Resolving { attempt: 1 };
        self.surface = SurfacePhase::Empty;
        self.accept_surface = false;
        self.pending_seek = None;
        self.last_error = None;
        self.current_time = resume_at;

        effects.push(Effect::Resolve(ResolveJob {
            generation: self.generation,
            quality: track.effective_quality(self.quality),
            track,
            resume_at,
            skip_cache,
        }));
    }

    /// The queue position moved to a different track: reset position and
    /// duration, then resolve it.
    fn enter_new_track(&mut self, effects: &mut Vec<Effect>) {
        let Some(track) = self.queue.current() else {
            self.clear_playback(effects);
            return;
        };
        let event = PlaybackEvent::TrackChanged {
            track_id: track.id.clone(),
            index: self.queue.index().unwrap_or(0),
        };
        self.duration = track.duration;
        self.start_resolution(0.0, false, effects);
        effects.push(Effect::Emit(event));
    }

    /// Same as [`Self::enter_new_track`] without starting a resolution.
    fn stage_new_track(&mut self, effects: &mut Vec<Effect>) {
        let Some(track) = self.queue.current() else {
            self.clear_playback(effects);
            return;
        };
        let event = PlaybackEvent::TrackChanged {
            track_id: track.id.clone(),
            index: self.queue.index().unwrap_or(0),
        };
        self.duration = track.duration;
        self.current_time = 0.0;
        self.generation += 1;
        self.retry = RetryPhase::Idle;
        self.surface = SurfacePhase::Empty;
        self.accept_surface = false;
        self.pending_seek = None;
        self.last_error = None;
        effects.push(Effect::CancelResolution);
        effects.push(Effect::Emit(event));
    }

    fn clear_playback(&mut self, effects: &mut Vec<Effect>) {
        self.generation += 1;
        self.intent = Intent::Pause;
        self.retry = RetryPhase::Idle;
        self.surface = SurfacePhase::Empty;
        self.accept_surface = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.pending_seek = None;
        self.last_error = None;
        effects.push(Effect::CancelResolution);
        effects.push(Effect::SurfacePause);
    }

    fn on_ended(&mut self, effects: &mut Vec<Effect>) {
        self.surface = SurfacePhase::Ended;

        if self.queue.repeat_mode() == RepeatMode::One {
            self.current_time = 0.0;
            self.surface = SurfacePhase::Loading;
            effects.push(Effect::SurfaceSeek(0.0));
            effects.push(Effect::SurfacePlay {
                generation: self.generation,
            });
            return;
        }

        if self.queue.next().is_some() {
            self.enter_new_track(effects);
            return;
        }

        self.retry = RetryPhase::Idle;
        self.intent = Intent::Pause;
        effects.push(Effect::Emit(PlaybackEvent::QueueEnded));
    }

    fn preload_upcoming(&self, effects: &mut Vec<Effect>) {
        let current_id = self.current_track_id();
        if let Some(next) = self.queue.upcoming() {
            if next.id != current_id {
                effects.push(Effect::Preload {
                    quality: next.effective_quality(self.quality),
                    track: next.clone(),
                });
            }
        }
    }

    fn current_track_id(&self) -> String {
        self.current_track()
            .map(|t| t.id.clone())
            .unwrap_or_default()
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Applies `action` to `state`.
///
/// On error the state is left untouched.
pub fn reduce(state: &mut EngineState, action: Action) -> Result<Vec<Effect>> {
    let mut effects = Vec::new();

    match action {
        Action::PlayQueue { tracks, index } => {
            state.queue.set_queue(tracks, index)?;
            if state.queue.is_empty() {
                state.clear_playback(&mut effects);
            } else {
                state.intent = Intent::Play;
                state.enter_new_track(&mut effects);
            }
        }

        Action::SetQueue {
            tracks,
            index,
            current,
        } => {
            let index = current
                .as_deref()
                .and_then(|id| tracks.iter().position(|t| t.id == id))
                .unwrap_or(index);
            let previous = state.current_track().map(|t| t.id.clone());

            state.queue.set_queue(tracks, index)?;
            let now_current = state.current_track().map(|t| t.id.clone());

            match now_current {
                None => state.clear_playback(&mut effects),
                Some(id) if Some(&id) == previous.as_ref() => {}
                Some(_) => {
                    if state.retry == RetryPhase::Idle && state.intent == Intent::Pause {
                        state.stage_new_track(&mut effects);
                    } else {
                        state.enter_new_track(&mut effects);
                    }
                }
            }
        }

        Action::Play => {
            if state.current_track().is_none() {
                return Err(PlaybackError::EmptyQueue);
            }
            state.intent = Intent::Play;
            match state.retry {
                RetryPhase::Idle => {
                    let resume_at = if state.surface == SurfacePhase::Ended {
                        0.0
                    } else {
                        state.current_time
                    };
                    state.start_resolution(resume_at, false, &mut effects);
                }
                RetryPhase::Failed => {
                    state.start_resolution(state.current_time, false, &mut effects);
                }
                RetryPhase::Rejected => {
                    state.retry = RetryPhase::Ready;
                    state.last_error = None;
                    effects.push(Effect::SurfacePlay {
                        generation: state.generation,
                    });
                }
                RetryPhase::Ready => effects.push(Effect::SurfacePlay {
                    generation: state.generation,
                }),
                RetryPhase::Resolving { .. } | RetryPhase::Backoff { .. } => {}
            }
        }

        Action::Pause => {
            if state.current_track().is_some() {
                state.intent = Intent::Pause;
                if !matches!(state.retry, RetryPhase::Idle | RetryPhase::Failed) {
                    effects.push(Effect::SurfacePause);
                }
            }
        }

        Action::Next => {
            if state.queue.next().is_some() {
                state.enter_new_track(&mut effects);
            }
        }

        Action::Previous => {
            if state.queue.previous().is_some() {
                state.enter_new_track(&mut effects);
            }
        }

        Action::SeekTo(seconds) => {
            if state.current_track().is_none() {
                return Err(PlaybackError::EmptyQueue);
            }
            let t = state.clamp_time(seconds);
            state.current_time = t;
            match state.retry {
                RetryPhase::Ready | RetryPhase::Rejected => effects.push(Effect::SurfaceSeek(t)),
                RetryPhase::Resolving { .. } | RetryPhase::Backoff { .. } => {
                    state.pending_seek = Some(t)
                }
                // A seek after the queue ended picks the resume point.
                RetryPhase::Idle => state.surface = SurfacePhase::Empty,
                RetryPhase::Failed => {}
            }
        }

        Action::SetRepeatMode(mode) => state.queue.set_repeat_mode(mode),

        Action::ToggleShuffle => {
            state.queue.toggle_shuffle();
        }

        Action::SetShuffleSeed(seed) => state.queue.set_shuffle_seed(seed),

        Action::SetVolume(volume) => {
            state.volume = clamp_volume(volume);
            effects.push(Effect::SurfaceVolume(state.volume));
        }

        Action::SetQuality(quality) => {
            if quality != state.quality {
                state.quality = quality;
                if state.current_track().is_some() && state.retry != RetryPhase::Idle {
                    state.start_resolution(state.current_time, false, &mut effects);
                }
            }
        }

        Action::Surface(event) => {
            if state.accept_surface {
                apply_surface_event(state, event, &mut effects);
            }
        }

        Action::AttemptStarted {
            generation,
            attempt,
        } => {
            if generation == state.generation && state.retry.is_in_flight() {
                state.retry = RetryPhase::Resolving { attempt };
                state.surface = SurfacePhase::Loading;
                state.accept_surface = true;
            }
        }

        Action::AttemptFailed {
            generation,
            attempt,
            error,
        } => {
            if generation == state.generation && state.retry.is_in_flight() {
                state.retry = RetryPhase::Backoff { attempt };
                state.surface = SurfacePhase::Empty;
                state.accept_surface = false;
                effects.push(Effect::Emit(PlaybackEvent::AttemptFailed {
                    track_id: state.current_track_id(),
                    attempt,
                    reason: error.failure_reason().to_string(),
                }));
            }
        }

        Action::ResolutionSucceeded {
            generation,
            confirmed,
            stream,
        } => {
            if generation == state.generation && state.retry.is_in_flight() {
                state.retry = RetryPhase::Ready;
                state.accept_surface = true;
                state.last_error = None;
                if let Some(t) = state.pending_seek.take() {
                    state.current_time = t;
                    effects.push(Effect::SurfaceSeek(t));
                }
                if confirmed {
                    state.preload_upcoming(&mut effects);
                } else if let Some(track) = state.current_track() {
                    effects.push(Effect::AwaitConfirmation {
                        generation,
                        track_id: track.id.clone(),
                        quality: track.effective_quality(state.quality),
                        stream,
                    });
                }
            }
        }

        Action::PlaybackConfirmed { generation } => {
            if generation == state.generation && state.retry == RetryPhase::Ready {
                state.preload_upcoming(&mut effects);
            }
        }

        Action::ResolutionFailed { generation, error } => {
            if generation == state.generation && state.retry.is_in_flight() {
                match error {
                    PlaybackError::Cancelled => {}
                    PlaybackError::PlaybackRejected(_) => {
                        state.retry = RetryPhase::Rejected;
                        state.intent = Intent::Pause;
                        state.last_error = Some(error.to_string());
                        effects.push(Effect::Emit(PlaybackEvent::PlayRejected {
                            track_id: state.current_track_id(),
                        }));
                    }
                    error => {
                        let attempts = match &error {
                            PlaybackError::AttemptsExhausted { attempts, .. } => *attempts,
                            _ => 1,
                        };
                        state.retry = RetryPhase::Failed;
                        state.accept_surface = false;
                        state.pending_seek = None;
                        state.last_error = Some(error.to_string());
                        effects.push(Effect::Emit(PlaybackEvent::TrackFailed {
                            track_id: state.current_track_id(),
                            reason: error.failure_reason().to_string(),
                            attempts,
                        }));
                    }
                }
            }
        }

        Action::PlayRejected {
            generation,
            message,
        } => {
            if generation == state.generation {
                state.intent = Intent::Pause;
                if state.retry == RetryPhase::Ready {
                    state.retry = RetryPhase::Rejected;
                }
                state.last_error = Some(PlaybackError::PlaybackRejected(message).to_string());
                effects.push(Effect::Emit(PlaybackEvent::PlayRejected {
                    track_id: state.current_track_id(),
                }));
            }
        }

        Action::StallDetected { generation } => {
            if generation == state.generation && state.retry == RetryPhase::Ready {
                state.start_resolution(state.current_time, true, &mut effects);
            }
        }
    }

    Ok(effects)
}

fn apply_surface_event(state: &mut EngineState, event: SurfaceEvent, effects: &mut Vec<Effect>) {
    match event {
        SurfaceEvent::CanPlay => {
            if state.surface != SurfacePhase::Playing {
                state.surface = SurfacePhase::CanPlay;
            }
        }
        SurfaceEvent::Playing => state.surface = SurfacePhase::Playing,
        SurfaceEvent::Waiting => state.surface = SurfacePhase::Waiting,
        SurfaceEvent::Paused => state.surface = SurfacePhase::Paused,
        SurfaceEvent::TimeUpdate(t) => {
            if t.is_finite() {
                state.current_time = state.clamp_time(t);
            }
        }
        SurfaceEvent::DurationChange(d) => {
            if d.is_finite() && d > 0.0 {
                state.duration = d;
                state.current_time = state.current_time.min(d);
            }
        }
        SurfaceEvent::Ended => state.on_ended(effects),
        SurfaceEvent::Error(_) => {
            // Errors during an attempt belong to the resolver.
            if state.retry == RetryPhase::Ready {
                state.start_resolution(state.current_time, true, effects);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::MediaErrorCode;

    fn track(id: &str, duration: f64) -> Track {
        Track::new(id, id.to_uppercase(), duration)
    }

    fn fresh() -> EngineState {
        EngineState::new(QueueState::with_seed(1), AudioQuality::High, 1.0)
    }

    fn apply(state: &mut EngineState, action: Action) -> Vec<Effect> {
        reduce(state, action).unwrap()
    }

    fn succeeded(generation: u64) -> Action {
        Action::ResolutionSucceeded {
            generation,
            confirmed: true,
            stream: StreamUrl::new("https://cdn.example/a.flac"),
        }
    }

    /// State with `tracks[index]` confirmed and playing at `time`.
    fn playing(tracks: Vec<Track>, index: usize, time: f64) -> EngineState {
        let mut state = fresh();
        apply(&mut state, Action::PlayQueue { tracks, index });
        let generation = state.generation;
        apply(&mut state, Action::AttemptStarted { generation, attempt: 1 });
        apply(&mut state, Action::Surface(SurfaceEvent::CanPlay));
        apply(&mut state, Action::Surface(SurfaceEvent::Playing));
        apply(&mut state, succeeded(generation));
        apply(&mut state, Action::Surface(SurfaceEvent::TimeUpdate(time)));
        state
    }

    fn resolve_jobs(effects: &[Effect]) -> Vec<&ResolveJob> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Resolve(job) => Some(job),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_projection_table() {
        use PlaybackStatus::*;
        let cases = [
            (Intent::Play, SurfacePhase::Loading, RetryPhase::Resolving { attempt: 1 }, Loading),
            (Intent::Play, SurfacePhase::Waiting, RetryPhase::Resolving { attempt: 1 }, Buffering),
            (Intent::Play, SurfacePhase::Empty, RetryPhase::Backoff { attempt: 1 }, Loading),
            (Intent::Pause, SurfacePhase::Loading, RetryPhase::Resolving { attempt: 2 }, Paused),
            (Intent::Play, SurfacePhase::Playing, RetryPhase::Ready, Playing),
            (Intent::Play, SurfacePhase::Waiting, RetryPhase::Ready, Buffering),
            (Intent::Pause, SurfacePhase::Waiting, RetryPhase::Ready, Paused),
            (Intent::Pause, SurfacePhase::Paused, RetryPhase::Ready, Paused),
            (Intent::Pause, SurfacePhase::CanPlay, RetryPhase::Rejected, Paused),
            (Intent::Play, SurfacePhase::Empty, RetryPhase::Failed, Error),
            (Intent::Pause, SurfacePhase::Ended, RetryPhase::Idle, Idle),
        ];
        for (intent, surface, retry, expected) in cases {
            assert_eq!(
                project_status(true, intent, surface, retry),
                expected,
                "{:?} {:?} {:?}",
                intent,
                surface,
                retry
            );
        }
        assert_eq!(
            project_status(false, Intent::Play, SurfacePhase::Playing, RetryPhase::Ready),
            Idle
        );
    }

    #[test]
    fn test_play_queue_starts_resolution() {
        let mut state = fresh();
        let effects = apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 100.0), track("b", 140.0)],
                index: 1,
            },
        );

        let jobs = resolve_jobs(&effects);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].track.id, "b");
        assert_eq!(jobs[0].generation, state.generation);
        assert_eq!(jobs[0].resume_at, 0.0);
        assert!(effects.contains(&Effect::Emit(PlaybackEvent::TrackChanged {
            track_id: "b".to_string(),
            index: 1,
        })));
        assert_eq!(state.status(), PlaybackStatus::Loading);
        assert_eq!(state.duration, 140.0);
    }

    #[test]
    fn test_play_queue_rejects_bad_index_without_changes() {
        let mut state = playing(vec![track("a", 100.0)], 0, 10.0);
        let before = state.clone();
        let err = reduce(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("x", 1.0)],
                index: 4,
            },
        )
        .unwrap_err();
        assert_eq!(err, PlaybackError::InvalidIndex { index: 4, len: 1 });
        assert_eq!(state, before);
    }

    #[test]
    fn test_set_queue_keeps_time_for_same_track() {
        let a = track("a", 100.0);
        let mut state = playing(vec![a.clone(), track("c", 90.0)], 0, 42.0);
        let generation = state.generation;

        let effects = apply(
            &mut state,
            Action::SetQueue {
                tracks: vec![a, track("b", 140.0)],
                index: 0,
                current: Some("a".to_string()),
            },
        );

        assert!(effects.is_empty());
        assert_eq!(state.current_time, 42.0);
        assert_eq!(state.duration, 100.0);
        assert_eq!(state.generation, generation);
        assert_eq!(state.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_set_queue_resets_time_for_new_track() {
        let mut state = playing(vec![track("a", 100.0)], 0, 42.0);

        let effects = apply(
            &mut state,
            Action::SetQueue {
                tracks: vec![track("b", 140.0)],
                index: 0,
                current: Some("b".to_string()),
            },
        );

        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.duration, 140.0);
        assert_eq!(resolve_jobs(&effects)[0].track.id, "b");
    }

    #[test]
    fn test_set_queue_current_overrides_index() {
        let a = track("a", 100.0);
        let mut state = playing(vec![a.clone()], 0, 12.0);
        apply(
            &mut state,
            Action::SetQueue {
                tracks: vec![track("z", 10.0), a],
                index: 0,
                current: Some("a".to_string()),
            },
        );
        assert_eq!(state.queue.index(), Some(1));
        assert_eq!(state.current_time, 12.0);
    }

    #[test]
    fn test_set_queue_while_idle_does_not_load() {
        let mut state = fresh();
        let effects = apply(
            &mut state,
            Action::SetQueue {
                tracks: vec![track("a", 100.0)],
                index: 0,
                current: None,
            },
        );
        assert!(resolve_jobs(&effects).is_empty());
        assert_eq!(state.status(), PlaybackStatus::Idle);
        assert_eq!(state.duration, 100.0);

        let effects = apply(&mut state, Action::Play);
        assert_eq!(resolve_jobs(&effects).len(), 1);
        assert_eq!(state.status(), PlaybackStatus::Loading);
    }

    #[test]
    fn test_empty_queue_goes_idle() {
        let mut state = playing(vec![track("a", 100.0)], 0, 42.0);
        let effects = apply(
            &mut state,
            Action::SetQueue {
                tracks: Vec::new(),
                index: 0,
                current: None,
            },
        );
        assert!(effects.contains(&Effect::CancelResolution));
        assert_eq!(state.status(), PlaybackStatus::Idle);
        assert!(state.current_track().is_none());
        assert_eq!(state.current_time, 0.0);
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let mut state = fresh();
        apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 100.0), track("b", 100.0)],
                index: 0,
            },
        );
        let old = state.generation;
        apply(&mut state, Action::Next);
        assert_ne!(state.generation, old);

        let before = state.clone();
        assert!(apply(&mut state, succeeded(old)).is_empty());
        assert!(apply(
            &mut state,
            Action::ResolutionFailed {
                generation: old,
                error: PlaybackError::Timeout(std::time::Duration::from_secs(1)),
            }
        )
        .is_empty());
        assert_eq!(state, before);
        assert_eq!(state.current_track().map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn test_surface_events_ignored_until_attempt_loads() {
        let mut state = fresh();
        apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 100.0)],
                index: 0,
            },
        );
        apply(&mut state, Action::Surface(SurfaceEvent::TimeUpdate(77.0)));
        assert_eq!(state.current_time, 0.0);

        let generation = state.generation;
        apply(&mut state, Action::AttemptStarted { generation, attempt: 1 });
        apply(&mut state, Action::Surface(SurfaceEvent::Waiting));
        assert_eq!(state.status(), PlaybackStatus::Buffering);
    }

    #[test]
    fn test_waiting_while_paused_stays_paused() {
        let mut state = playing(vec![track("a", 100.0)], 0, 5.0);
        apply(&mut state, Action::Pause);
        apply(&mut state, Action::Surface(SurfaceEvent::Waiting));
        assert_eq!(state.status(), PlaybackStatus::Paused);

        apply(&mut state, Action::Play);
        assert_eq!(state.status(), PlaybackStatus::Buffering);
        apply(&mut state, Action::Surface(SurfaceEvent::Playing));
        assert_eq!(state.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_ended_repeat_one_restarts() {
        let mut state = playing(vec![track("a", 100.0), track("b", 100.0)], 0, 99.9);
        apply(&mut state, Action::SetRepeatMode(RepeatMode::One));

        let effects = apply(&mut state, Action::Surface(SurfaceEvent::Ended));
        assert!(effects.contains(&Effect::SurfaceSeek(0.0)));
        assert!(effects.iter().any(|e| matches!(e, Effect::SurfacePlay { .. })));
        assert!(resolve_jobs(&effects).is_empty());
        assert_eq!(state.queue.index(), Some(0));
        assert_eq!(state.current_time, 0.0);
        assert!(state.status().is_playing());
    }

    #[test]
    fn test_ended_repeat_off_advances_then_stops() {
        let mut state = playing(vec![track("a", 10.0), track("b", 20.0)], 0, 10.0);

        let effects = apply(&mut state, Action::Surface(SurfaceEvent::Ended));
        assert_eq!(state.queue.index(), Some(1));
        assert_eq!(resolve_jobs(&effects)[0].track.id, "b");
        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.duration, 20.0);

        let generation = state.generation;
        apply(&mut state, Action::AttemptStarted { generation, attempt: 1 });
        apply(&mut state, Action::Surface(SurfaceEvent::Playing));
        apply(&mut state, succeeded(generation));
        apply(&mut state, Action::Surface(SurfaceEvent::TimeUpdate(20.0)));

        let effects = apply(&mut state, Action::Surface(SurfaceEvent::Ended));
        assert!(effects.contains(&Effect::Emit(PlaybackEvent::QueueEnded)));
        assert_eq!(state.queue.index(), Some(1));
        assert_eq!(state.status(), PlaybackStatus::Idle);
        assert_eq!(state.current_track().map(|t| t.id.as_str()), Some("b"));
        assert_eq!(state.current_time, 20.0);
    }

    #[test]
    fn test_ended_repeat_all_wraps() {
        let mut state = playing(vec![track("a", 10.0), track("b", 10.0)], 1, 10.0);
        apply(&mut state, Action::SetRepeatMode(RepeatMode::All));
        let effects = apply(&mut state, Action::Surface(SurfaceEvent::Ended));
        assert_eq!(state.queue.index(), Some(0));
        assert_eq!(resolve_jobs(&effects)[0].track.id, "a");
    }

    #[test]
    fn test_play_after_queue_end_restarts_from_zero() {
        let mut state = playing(vec![track("a", 10.0)], 0, 10.0);
        apply(&mut state, Action::Surface(SurfaceEvent::Ended));
        assert_eq!(state.status(), PlaybackStatus::Idle);

        let effects = apply(&mut state, Action::Play);
        assert_eq!(resolve_jobs(&effects)[0].resume_at, 0.0);
    }

    #[test]
    fn test_resolution_failure_is_error_and_navigation_still_works() {
        let mut state = fresh();
        apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 10.0), track("b", 10.0)],
                index: 0,
            },
        );
        let generation = state.generation;
        let effects = apply(
            &mut state,
            Action::ResolutionFailed {
                generation,
                error: PlaybackError::AttemptsExhausted {
                    attempts: 3,
                    last: Box::new(PlaybackError::Network("reset".into())),
                },
            },
        );
        assert_eq!(state.status(), PlaybackStatus::Error);
        assert!(state.last_error.is_some());
        assert!(effects.contains(&Effect::Emit(PlaybackEvent::TrackFailed {
            track_id: "a".to_string(),
            reason: "network".to_string(),
            attempts: 3,
        })));

        let effects = apply(&mut state, Action::Next);
        assert_eq!(resolve_jobs(&effects)[0].track.id, "b");
        assert_eq!(state.status(), PlaybackStatus::Loading);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_rejection_pauses_without_retry() {
        let mut state = fresh();
        apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 10.0)],
                index: 0,
            },
        );
        let generation = state.generation;
        let effects = apply(
            &mut state,
            Action::ResolutionFailed {
                generation,
                error: PlaybackError::PlaybackRejected("NotAllowedError".into()),
            },
        );
        assert!(resolve_jobs(&effects).is_empty());
        assert_eq!(state.status(), PlaybackStatus::Paused);
        assert!(state.last_error.as_deref().unwrap().contains("NotAllowedError"));

        let effects = apply(&mut state, Action::Play);
        assert_eq!(effects, vec![Effect::SurfacePlay { generation }]);
        assert!(resolve_jobs(&effects).is_empty());
    }

    #[test]
    fn test_seek_during_resolution_is_deferred() {
        let mut state = fresh();
        apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 140.0)],
                index: 0,
            },
        );
        let effects = apply(&mut state, Action::SeekTo(30.0));
        assert!(effects.is_empty());
        assert_eq!(state.pending_seek, Some(30.0));

        let generation = state.generation;
        let effects = apply(&mut state, succeeded(generation));
        assert!(effects.contains(&Effect::SurfaceSeek(30.0)));
        assert_eq!(state.pending_seek, None);
        assert_eq!(state.current_time, 30.0);
    }

    #[test]
    fn test_seek_is_clamped() {
        let mut state = playing(vec![track("a", 140.0)], 0, 1.0);
        assert_eq!(
            apply(&mut state, Action::SeekTo(500.0)),
            vec![Effect::SurfaceSeek(140.0)]
        );
        assert_eq!(
            apply(&mut state, Action::SeekTo(-3.0)),
            vec![Effect::SurfaceSeek(0.0)]
        );
        assert_eq!(reduce(&mut fresh(), Action::SeekTo(1.0)), Err(PlaybackError::EmptyQueue));
    }

    #[test]
    fn test_duration_change_replaces_nominal() {
        let mut state = playing(vec![track("a", 100.0)], 0, 1.0);
        apply(&mut state, Action::Surface(SurfaceEvent::DurationChange(187.5)));
        assert_eq!(state.duration, 187.5);
        apply(&mut state, Action::Surface(SurfaceEvent::DurationChange(f64::INFINITY)));
        assert_eq!(state.duration, 187.5);
    }

    #[test]
    fn test_quality_switch_resumes_position() {
        let mut state = playing(vec![track("a", 100.0)], 0, 33.0);
        let effects = apply(&mut state, Action::SetQuality(AudioQuality::Lossless));
        let jobs = resolve_jobs(&effects);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].quality, AudioQuality::Lossless);
        assert_eq!(jobs[0].resume_at, 33.0);
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::Emit(PlaybackEvent::TrackChanged { .. }))));

        assert!(apply(&mut state, Action::SetQuality(AudioQuality::Lossless)).is_empty());
    }

    #[test]
    fn test_stall_and_media_error_trigger_fresh_resolution() {
        let mut state = playing(vec![track("a", 100.0)], 0, 50.0);
        let generation = state.generation;
        let effects = apply(&mut state, Action::StallDetected { generation });
        let jobs = resolve_jobs(&effects);
        assert!(jobs[0].skip_cache);
        assert_eq!(jobs[0].resume_at, 50.0);

        let mut state = playing(vec![track("a", 100.0)], 0, 20.0);
        let effects = apply(
            &mut state,
            Action::Surface(SurfaceEvent::Error(MediaErrorCode::Network)),
        );
        assert!(resolve_jobs(&effects)[0].skip_cache);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut state = fresh();
        assert_eq!(
            apply(&mut state, Action::SetVolume(1.7)),
            vec![Effect::SurfaceVolume(1.0)]
        );
        apply(&mut state, Action::SetVolume(f32::NAN));
        assert_eq!(state.volume, 0.0);
    }

    #[test]
    fn test_success_requests_preload_of_upcoming() {
        let state = playing(vec![track("a", 10.0), track("b", 10.0)], 0, 0.0);
        assert_eq!(state.retry, RetryPhase::Ready);

        let mut state = fresh();
        apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 10.0), track("b", 10.0)],
                index: 0,
            },
        );
        let generation = state.generation;
        let effects = apply(&mut state, succeeded(generation));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Preload { track, .. } if track.id == "b"
        )));
    }

    #[test]
    fn test_paused_ready_defers_preload_until_confirmed() {
        let mut state = fresh();
        apply(
            &mut state,
            Action::PlayQueue {
                tracks: vec![track("a", 10.0), track("b", 10.0)],
                index: 0,
            },
        );
        apply(&mut state, Action::Pause);
        let generation = state.generation;
        let stream = StreamUrl::new("https://cdn.example/a.flac");
        let effects = apply(
            &mut state,
            Action::ResolutionSucceeded {
                generation,
                confirmed: false,
                stream: stream.clone(),
            },
        );
        assert_eq!(state.retry, RetryPhase::Ready);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Preload { .. })));
        assert!(effects.contains(&Effect::AwaitConfirmation {
            generation,
            track_id: "a".to_string(),
            quality: AudioQuality::High,
            stream,
        }));

        assert!(apply(&mut state, Action::PlaybackConfirmed { generation: generation + 1 }).is_empty());
        let effects = apply(&mut state, Action::PlaybackConfirmed { generation });
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Preload { track, .. } if track.id == "b"
        )));
    }

    #[test]
    fn test_seek_after_queue_end_sets_resume_point() {
        let mut state = playing(vec![track("a", 100.0)], 0, 99.0);
        apply(&mut state, Action::Surface(SurfaceEvent::Ended));
        assert_eq!(state.retry, RetryPhase::Idle);
        assert_eq!(state.surface, SurfacePhase::Ended);

        assert!(apply(&mut state, Action::SeekTo(30.0)).is_empty());
        assert_eq!(state.status(), PlaybackStatus::Idle);

        let effects = apply(&mut state, Action::Play);
        let jobs = resolve_jobs(&effects);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].resume_at, 30.0);
    }

    #[test]
    fn test_play_after_queue_end_restarts_from_zero_near_end() {
        let mut state = playing(vec![track("a", 100.0)], 0, 99.0);
        apply(&mut state, Action::Surface(SurfaceEvent::Ended));
        let effects = apply(&mut state, Action::Play);
        assert_eq!(resolve_jobs(&effects)[0].resume_at, 0.0);
    }
}
