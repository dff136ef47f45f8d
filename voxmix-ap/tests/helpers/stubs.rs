//! Stub collaborators

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use voxmix_ap::audio::AudioClip;
use voxmix_ap::error::{Error, Result};
use voxmix_ap::playback::{ResourceStore, StreamingSource};

/// Store that serves silent clips and counts loads per key
///
/// Keys listed as missing are never found. An optional latency makes each
/// load block the calling thread after it is counted.
pub struct CountingStore {
    clip_secs: f32,
    latency: Duration,
    missing: HashSet<String>,
    loads: Mutex<HashMap<String, usize>>,
}

impl CountingStore {
    pub fn new(clip_secs: f32) -> Self {
        Self {
            clip_secs,
            latency: Duration::ZERO,
            missing: HashSet::new(),
            loads: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_missing(mut self, key: &str) -> Self {
        self.missing.insert(key.to_string());
        self
    }

    pub fn loads(&self, key: &str) -> usize {
        self.loads.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

impl ResourceStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    fn load(&self, key: &str) -> Option<AudioClip> {
        *self.loads.lock().unwrap().entry(key.to_string()).or_default() += 1;
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.missing.contains(key) {
            return None;
        }
        Some(AudioClip::silent(key, self.clip_secs, 1000))
    }
}

/// Streaming source that records locators and answers after a delay
pub struct ScriptedStreaming {
    latency: Duration,
    clip_secs: f32,
    failing: HashSet<String>,
    locators: Mutex<Vec<String>>,
}

impl ScriptedStreaming {
    pub fn new(latency: Duration, clip_secs: f32) -> Self {
        Self {
            latency,
            clip_secs,
            failing: HashSet::new(),
            locators: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn locators(&self) -> Vec<String> {
        self.locators.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamingSource for ScriptedStreaming {
    async fn fetch(&self, key: &str, locator: &str) -> Result<AudioClip> {
        self.locators.lock().unwrap().push(locator.to_string());
        tokio::time::sleep(self.latency).await;
        if self.failing.contains(key) {
            return Err(Error::Stream {
                locator: locator.to_string(),
                message: "404 Not Found".to_string(),
            });
        }
        Ok(AudioClip::silent(key, self.clip_secs, 1000))
    }
}
