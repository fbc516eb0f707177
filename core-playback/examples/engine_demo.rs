//! # Player Engine Example
//!
//! Drives the engine against a simulated rendering surface whose first CDN
//! edge refuses to decode, so the first attempt fails and a fresh URL from
//! the catalog plays.
//!
//! Run with: `cargo run --example engine_demo --package core-playback`

use async_trait::async_trait;
use bridge_desktop::MemoryKeyValueStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioQuality, MediaErrorCode, RenderingSurface, StreamUrl, StreamUrlProvider, SurfaceEvent,
    SurfaceEventStream,
};
use core_playback::{PlaybackConfig, PlaybackStatus, PlayerEngine, Track};
use core_runtime::config::CoreConfig;
use core_runtime::events::CoreEvent;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Simulated Surface
// ============================================================================

/// Plays any URL except those on `bad-edge`, advancing 0.1 s per 100 ms.
#[derive(Default)]
struct DemoSurface {
    generation: Arc<AtomicU64>,
    playing: Arc<Mutex<bool>>,
    sender: Mutex<Option<mpsc::UnboundedSender<SurfaceEvent>>>,
}

impl DemoSurface {
    fn send(&self, event: SurfaceEvent) {
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            tx.send(event).ok();
        }
    }
}

#[async_trait]
impl RenderingSurface for DemoSurface {
    async fn load(&self, url: &str) -> BridgeResult<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.playing.lock().unwrap() = false;

        let Some(tx) = self.sender.lock().unwrap().clone() else {
            return Ok(());
        };
        let current = Arc::clone(&self.generation);
        let playing = Arc::clone(&self.playing);
        let broken = url.contains("bad-edge");

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            if broken {
                tx.send(SurfaceEvent::Error(MediaErrorCode::SourceNotSupported)).ok();
                return;
            }
            tx.send(SurfaceEvent::DurationChange(3.0)).ok();
            tx.send(SurfaceEvent::CanPlay).ok();

            let mut position = 0.0;
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            while current.load(Ordering::SeqCst) == generation && position < 3.0 {
                ticker.tick().await;
                if *playing.lock().unwrap() {
                    position += 0.1;
                    tx.send(SurfaceEvent::TimeUpdate(position)).ok();
                }
            }
            if current.load(Ordering::SeqCst) == generation {
                tx.send(SurfaceEvent::Ended).ok();
            }
        });
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        *self.playing.lock().unwrap() = true;
        self.send(SurfaceEvent::Playing);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        *self.playing.lock().unwrap() = false;
        self.send(SurfaceEvent::Paused);
        Ok(())
    }

    async fn seek(&self, position: f64) -> BridgeResult<()> {
        self.send(SurfaceEvent::TimeUpdate(position));
        Ok(())
    }

    async fn set_volume(&self, _volume: f32) -> BridgeResult<()> {
        Ok(())
    }

    async fn subscribe_events(&self) -> BridgeResult<Box<dyn SurfaceEventStream>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        Ok(Box::new(DemoEvents(rx)))
    }
}

struct DemoEvents(mpsc::UnboundedReceiver<SurfaceEvent>);

#[async_trait]
impl SurfaceEventStream for DemoEvents {
    async fn next(&mut self) -> Option<SurfaceEvent> {
        self.0.recv().await
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Hands out a broken edge first, then a healthy one.
#[derive(Default)]
struct DemoCatalog {
    calls: AtomicU32,
}

#[async_trait]
impl StreamUrlProvider for DemoCatalog {
    async fn get_stream_url(&self, track_id: &str, quality: AudioQuality) -> BridgeResult<StreamUrl> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let edge = if n == 0 { "bad-edge" } else { "edge-2" };
        Ok(StreamUrl::new(format!(
            "https://{}.cdn.example/{}/{}?token=secret",
            edge, track_id, quality
        )))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_filter("core_playback=debug"),
    )?;

    let core = CoreConfig::builder()
        .catalog(Arc::new(DemoCatalog::default()))
        .surface(Arc::new(DemoSurface::default()))
        .fallback_store(Arc::new(MemoryKeyValueStore::new()))
        .enable_probe(false)
        .enable_preload(false)
        .build()?;
    let config = PlaybackConfig {
        backoff_base: Duration::from_millis(200),
        ..PlaybackConfig::default()
    };

    let player = PlayerEngine::start(core, config).await?;
    let mut events = player.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let CoreEvent::Playback(event) = event {
                println!("event: {:?}", event);
            }
        }
    });

    player
        .play_queue(vec![Track::new("demo-1", "Demo Track", 3.0)], 0)
        .await?;

    let mut state = player.watch_state();
    loop {
        state.changed().await?;
        let snapshot = state.borrow_and_update().clone();
        if snapshot.status() == PlaybackStatus::Idle {
            break;
        }
        println!(
            "{:>9} {:>4.1}s / {:.1}s",
            snapshot.status(),
            snapshot.state.current_time,
            snapshot.state.duration
        );
    }

    let metrics = player.telemetry().metrics();
    println!(
        "attempts={} failures={} error_rate={:.2}",
        metrics.resolve_attempts, metrics.resolve_failures, metrics.error_rate
    );
    println!("{}", player.telemetry().export_json()?);

    player.shutdown().await;
    Ok(())
}
