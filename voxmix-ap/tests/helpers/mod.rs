//! Test helper modules for voxmix-ap integration tests
//!
//! - audio_generator: WAV fixtures via hound
//! - stubs: counting resource store and scripted streaming source
//! - event helpers for reading what the scheduler broadcast

#![allow(dead_code)]

pub mod audio_generator;
pub mod stubs;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use voxmix_ap::audio::ClockOutput;
use voxmix_ap::playback::{ResourceStore, StreamingSource, VoiceScheduler, VoiceSettings};
use voxmix_common::events::VoxEvent;

pub use stubs::{CountingStore, ScriptedStreaming};

/// Upper bound for any single wait in these tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings with a 1ms tick
pub fn fast_settings() -> VoiceSettings {
    VoiceSettings {
        tick: Duration::from_millis(1),
        ..VoiceSettings::default()
    }
}

/// Scheduler over a store, with an event channel
pub fn scheduler_with_store(
    store: Arc<dyn ResourceStore>,
) -> (VoiceScheduler, broadcast::Receiver<VoxEvent>) {
    let (tx, rx) = broadcast::channel(256);
    let voice = VoiceScheduler::builder(Box::new(ClockOutput::new()), store)
        .settings(fast_settings())
        .events(tx)
        .build();
    (voice, rx)
}

/// Streaming scheduler over a source, with an event channel
pub fn streaming_scheduler(
    source: Arc<dyn StreamingSource>,
    settings: VoiceSettings,
) -> (VoiceScheduler, broadcast::Receiver<VoxEvent>) {
    let (tx, rx) = broadcast::channel(256);
    let voice = VoiceScheduler::builder(
        Box::new(ClockOutput::new()),
        Arc::new(CountingStore::new(0.02)),
    )
    .settings(VoiceSettings {
        streaming: true,
        ..settings
    })
    .streaming_source(source)
    .events(tx)
    .build();
    (voice, rx)
}

/// Wait for the scheduler to go idle, failing the test on timeout
pub async fn wait_idle(voice: &VoiceScheduler) {
    tokio::time::timeout(TEST_TIMEOUT, voice.wait_idle())
        .await
        .expect("scheduler did not go idle");
}

/// Poll until `condition` holds, failing the test on timeout
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(TEST_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached");
}

/// Everything broadcast so far
pub fn drain(rx: &mut broadcast::Receiver<VoxEvent>) -> Vec<VoxEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Keys of VoiceStarted events, in order
pub fn started_keys(events: &[VoxEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            VoxEvent::VoiceStarted { key, .. } => Some(key.clone()),
            _ => None,
        })
        .collect()
}

/// Keys of VoiceSkipped events, in order
pub fn skipped_keys(events: &[VoxEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            VoxEvent::VoiceSkipped { key, .. } => Some(key.clone()),
            _ => None,
        })
        .collect()
}
