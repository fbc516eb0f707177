//! Shared test doubles for the engine and resolver suites.
//!
//! - [`FakeSurface`]: a rendering surface simulated on Tokio's clock. It
//!   becomes ready 50 ms after `load`, then advances 0.1 s of media time
//!   every 100 ms while playing.
//! - [`ScriptedCatalog`]: hands out a fresh URL per call,
//!   `https://cdn.test/{track}/{QUALITY}/{n}`.
//! - [`ScriptedHttp`]: answers `206 audio/flac` unless a rule matches.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::MemoryKeyValueStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioQuality, BridgeError, HttpClient, HttpRequest, HttpResponse, MediaErrorCode,
    NetworkInfo, NetworkMonitor, RenderingSurface, StreamUrl, StreamUrlProvider, SurfaceEvent,
    SurfaceEventStream,
};
use bytes::Bytes;
use core_playback::{PlaybackConfig, PlayerEngine, PlayerHandle, PlayerSnapshot, Track};
use core_runtime::config::CoreConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Rendering surface
// ============================================================================

/// How the simulated surface treats a URL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Healthy,
    /// Emits `error` instead of `canplay`.
    LoadError(MediaErrorCode),
    /// Never emits anything after `load`.
    NeverReady,
    /// Plays normally, then stops advancing at this position (seconds).
    StallAt(f64),
    /// `play()` is refused by the host.
    RejectPlay,
}

struct SurfaceInner {
    generation: u64,
    behavior: Behavior,
    ready: bool,
    playing: bool,
    /// Tenths of a second.
    position: u64,
    duration: u64,
    volume: f32,
    loads: Vec<String>,
    seeks: Vec<f64>,
    sender: Option<mpsc::UnboundedSender<SurfaceEvent>>,
}

impl SurfaceInner {
    fn emit(&self, event: SurfaceEvent) {
        if let Some(sender) = &self.sender {
            sender.send(event).ok();
        }
    }

    fn seconds(&self) -> f64 {
        self.position as f64 / 10.0
    }
}

pub struct FakeSurface {
    inner: Arc<Mutex<SurfaceInner>>,
    rules: Mutex<Vec<(String, Behavior)>>,
}

impl FakeSurface {
    /// Every loaded URL reports `duration` seconds of media.
    pub fn new(duration: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SurfaceInner {
                generation: 0,
                behavior: Behavior::Healthy,
                ready: false,
                playing: false,
                position: 0,
                duration: (duration * 10.0).round() as u64,
                volume: 1.0,
                loads: Vec::new(),
                seeks: Vec::new(),
                sender: None,
            })),
            rules: Mutex::new(Vec::new()),
        }
    }

    /// URLs containing `pattern` get `behavior`. First matching rule wins.
    pub fn rule(self, pattern: &str, behavior: Behavior) -> Self {
        self.rules.lock().push((pattern.to_string(), behavior));
        self
    }

    pub fn loads(&self) -> Vec<String> {
        self.inner.lock().loads.clone()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.inner.lock().seeks.clone()
    }

    pub fn volume(&self) -> f32 {
        self.inner.lock().volume
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    fn behavior_for(&self, url: &str) -> Behavior {
        self.rules
            .lock()
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, behavior)| *behavior)
            .unwrap_or(Behavior::Healthy)
    }
}

async fn run_media(inner: Arc<Mutex<SurfaceInner>>, generation: u64) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    {
        let mut s = inner.lock();
        if s.generation != generation {
            return;
        }
        match s.behavior {
            Behavior::LoadError(code) => {
                s.emit(SurfaceEvent::Error(code));
                return;
            }
            Behavior::NeverReady => return,
            _ => {}
        }
        s.ready = true;
        let duration = s.duration as f64 / 10.0;
        s.emit(SurfaceEvent::DurationChange(duration));
        s.emit(SurfaceEvent::CanPlay);
        if s.playing {
            s.emit(SurfaceEvent::Playing);
        }
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut s = inner.lock();
        if s.generation != generation {
            return;
        }
        if !s.playing {
            continue;
        }
        if let Behavior::StallAt(at) = s.behavior {
            if s.seconds() >= at - 1e-9 {
                continue;
            }
        }
        s.position += 1;
        let now = s.seconds();
        s.emit(SurfaceEvent::TimeUpdate(now));
        if s.position >= s.duration {
            s.playing = false;
            s.emit(SurfaceEvent::Ended);
        }
    }
}

#[async_trait]
impl RenderingSurface for FakeSurface {
    async fn load(&self, url: &str) -> BridgeResult<()> {
        let behavior = self.behavior_for(url);
        let generation = {
            let mut s = self.inner.lock();
            s.generation += 1;
            s.behavior = behavior;
            s.ready = false;
            s.playing = false;
            s.position = 0;
            s.loads.push(url.to_string());
            s.generation
        };
        tokio::spawn(run_media(Arc::clone(&self.inner), generation));
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        let mut s = self.inner.lock();
        if s.behavior == Behavior::RejectPlay {
            return Err(BridgeError::Rejected("NotAllowedError".to_string()));
        }
        s.playing = true;
        if s.ready {
            s.emit(SurfaceEvent::Playing);
        }
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        let mut s = self.inner.lock();
        s.playing = false;
        s.emit(SurfaceEvent::Paused);
        Ok(())
    }

    async fn seek(&self, position: f64) -> BridgeResult<()> {
        let mut s = self.inner.lock();
        s.position = ((position * 10.0).round() as u64).min(s.duration);
        s.seeks.push(position);
        let now = s.seconds();
        s.emit(SurfaceEvent::TimeUpdate(now));
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> BridgeResult<()> {
        self.inner.lock().volume = volume;
        Ok(())
    }

    async fn subscribe_events(&self) -> BridgeResult<Box<dyn SurfaceEventStream>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().sender = Some(tx);
        Ok(Box::new(FakeEventStream { rx }))
    }
}

struct FakeEventStream {
    rx: mpsc::UnboundedReceiver<SurfaceEvent>,
}

#[async_trait]
impl SurfaceEventStream for FakeEventStream {
    async fn next(&mut self) -> Option<SurfaceEvent> {
        self.rx.recv().await
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
pub struct ScriptedCatalog {
    calls: Mutex<HashMap<String, u32>>,
    unavailable: Mutex<HashSet<String>>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests for `track_id` fail with an authorization error.
    pub fn refuse(self, track_id: &str) -> Self {
        self.unavailable.lock().insert(track_id.to_string());
        self
    }

    pub fn calls(&self, track_id: &str) -> u32 {
        self.calls.lock().get(track_id).copied().unwrap_or(0)
    }
}

pub fn catalog_url(track_id: &str, quality: AudioQuality, n: u32) -> String {
    format!("https://cdn.test/{}/{}/{}", track_id, quality.as_str(), n)
}

#[async_trait]
impl StreamUrlProvider for ScriptedCatalog {
    async fn get_stream_url(&self, track_id: &str, quality: AudioQuality) -> BridgeResult<StreamUrl> {
        let n = {
            let mut calls = self.calls.lock();
            let n = calls.entry(track_id.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        if self.unavailable.lock().contains(track_id) {
            return Err(BridgeError::Unauthorized("token rejected".to_string()));
        }
        Ok(StreamUrl::new(catalog_url(track_id, quality, n)))
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Default)]
pub struct ScriptedHttp {
    rules: Mutex<Vec<(String, u16, &'static str)>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs containing `pattern` answer with `status` and `content_type`.
    pub fn rule(self, pattern: &str, status: u16, content_type: &'static str) -> Self {
        self.rules
            .lock()
            .push((pattern.to_string(), status, content_type));
        self
    }

    /// `(url, Range header)` of every request, in order.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let range = request.headers.get("Range").cloned();
        self.requests.lock().push((request.url.clone(), range));

        let (status, content_type) = self
            .rules
            .lock()
            .iter()
            .find(|(pattern, _, _)| request.url.contains(pattern.as_str()))
            .map(|(_, status, content_type)| (*status, *content_type))
            .unwrap_or((206, "audio/flac"));

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from_static(b"fL"),
        })
    }
}

// ============================================================================
// Network
// ============================================================================

pub struct MeteredNetwork;

#[async_trait]
impl NetworkMonitor for MeteredNetwork {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(NetworkInfo {
            is_metered: true,
            ..NetworkInfo::unconstrained()
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn track(id: &str, duration: f64) -> Track {
    Track::new(id, id.to_uppercase(), duration)
}

/// Short budgets so scenarios finish within a few virtual seconds.
pub fn test_config() -> PlaybackConfig {
    PlaybackConfig {
        max_attempts: 3,
        backoff_base: Duration::from_millis(100),
        backoff_multiplier: 2.0,
        backoff_max: Duration::from_secs(1),
        load_timeout: Duration::from_secs(2),
        stall_timeout: Duration::from_secs(1),
        sustain_progress: 0.25,
        watchdog_interval: Duration::from_millis(100),
        probe_timeout: Duration::from_secs(1),
        ..PlaybackConfig::default()
    }
}

pub struct Harness {
    pub player: PlayerHandle,
    pub surface: Arc<FakeSurface>,
    pub catalog: Arc<ScriptedCatalog>,
    pub http: Arc<ScriptedHttp>,
}

pub struct HarnessBuilder {
    surface: FakeSurface,
    catalog: ScriptedCatalog,
    http: ScriptedHttp,
    config: PlaybackConfig,
    network: bool,
    probe: bool,
    preload: bool,
}

impl HarnessBuilder {
    pub fn new(surface: FakeSurface) -> Self {
        Self {
            surface,
            catalog: ScriptedCatalog::new(),
            http: ScriptedHttp::new(),
            config: test_config(),
            network: false,
            probe: false,
            preload: false,
        }
    }

    pub fn catalog(mut self, catalog: ScriptedCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn http(mut self, http: ScriptedHttp) -> Self {
        self.http = http;
        self
    }

    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn probe(mut self) -> Self {
        self.probe = true;
        self
    }

    pub fn preload(mut self) -> Self {
        self.preload = true;
        self
    }

    pub fn metered_network(mut self) -> Self {
        self.network = true;
        self
    }

    pub async fn start(self) -> Harness {
        let surface = Arc::new(self.surface);
        let catalog = Arc::new(self.catalog);
        let http = Arc::new(self.http);

        let mut builder = CoreConfig::builder()
            .catalog(catalog.clone())
            .surface(surface.clone())
            .http_client(http.clone())
            .fallback_store(Arc::new(MemoryKeyValueStore::new()))
            .enable_probe(self.probe)
            .enable_preload(self.preload);
        if self.network {
            builder = builder
                .network_monitor(Arc::new(MeteredNetwork))
                .enable_network_awareness(true);
        }
        let core = builder.build().expect("core config");
        let player = PlayerEngine::start(core, self.config)
            .await
            .expect("engine start");

        Harness {
            player,
            surface,
            catalog,
            http,
        }
    }
}

pub async fn start(surface: FakeSurface) -> Harness {
    HarnessBuilder::new(surface).start().await
}

/// Waits (on the virtual clock) until `predicate` holds for the published
/// state.
pub async fn wait_for<F>(player: &PlayerHandle, what: &str, mut predicate: F) -> PlayerSnapshot
where
    F: FnMut(&PlayerSnapshot) -> bool,
{
    let mut rx = player.watch_state();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    loop {
        {
            let snapshot = rx.borrow_and_update();
            if predicate(&snapshot) {
                return snapshot.clone();
            }
        }
        match tokio::time::timeout_at(deadline, rx.changed()).await {
            Ok(Ok(())) => {}
            _ => panic!("timed out waiting for {}: {:?}", what, player.get_state()),
        }
    }
}

/// Lets the simulation run for `secs` virtual seconds.
pub async fn advance(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}
