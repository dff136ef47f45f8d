//! Component wiring
//!
//! Builds the channel manager, stores, voice scheduler and playback service
//! from an [`AudioConfig`] and hands them out as one bundle. Everything that
//! needs another component gets it passed in here; nothing looks components
//! up by type at runtime.

use crate::audio::mixer::MixerBackend;
use crate::audio::output::{ClockOutput, OutputAdapter};
use crate::channels::ChannelStateManager;
use crate::error::Result;
use crate::playback::store::{DirectoryStore, ResourceStore, StoreChain};
use crate::playback::streaming::{AnyStreamingSource, StaticLocale};
use crate::playback::{PlaybackService, VoiceScheduler, VoiceSettings};
use crate::state::SharedState;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use voxmix_common::config::{AudioConfig, VoiceConfig};

/// All audio components, wired together
pub struct AudioSystem {
    pub state: Arc<SharedState>,
    pub channels: Arc<RwLock<ChannelStateManager>>,
    pub voice: VoiceScheduler,
    pub playback: Arc<Mutex<PlaybackService>>,
}

impl AudioSystem {
    /// Wire a headless system (clock outputs) from configuration
    pub fn from_config(config: &AudioConfig, mixer: Option<Arc<dyn MixerBackend>>) -> Result<Self> {
        Self::with_voice_output(config, mixer, Box::new(ClockOutput::new()))
    }

    /// Wire a system around a caller-provided voice output
    pub fn with_voice_output(
        config: &AudioConfig,
        mixer: Option<Arc<dyn MixerBackend>>,
        voice_output: Box<dyn OutputAdapter>,
    ) -> Result<Self> {
        let state = Arc::new(SharedState::new());

        let mut channels = ChannelStateManager::new(mixer).with_events(state.event_sender());
        channels.initialize(&config.channels);

        let stores: Arc<dyn ResourceStore> = Arc::new(build_store_chain(&config.voice));

        let mut builder = VoiceScheduler::builder(voice_output, Arc::clone(&stores))
            .settings(VoiceSettings::from(&config.voice))
            .locale(Arc::new(StaticLocale(config.voice.locale.clone())))
            .events(state.event_sender());
        if config.voice.streaming {
            // The scheduler enforces fetch_timeout itself
            builder = builder.streaming_source(AnyStreamingSource::shared(None)?);
            info!("Voice streaming enabled from {}", config.voice.stream_base);
        }
        let voice = builder.build();
        voice.set_global_volume(config.voice.global_volume);

        let playback = PlaybackService::headless(stores);

        Ok(Self {
            state,
            channels: Arc::new(RwLock::new(channels)),
            voice,
            playback: Arc::new(Mutex::new(playback)),
        })
    }

    /// Stop all playback and release cached clips
    pub async fn shutdown(&self) {
        self.voice.shutdown();
        self.playback.lock().await.stop_all();
        info!("Audio system shut down");
    }
}

/// Development store first, then the packaged store
pub fn build_store_chain(config: &VoiceConfig) -> StoreChain {
    let mut chain = StoreChain::new();
    if let Some(root) = &config.dev_store {
        chain = chain.with_store(Arc::new(DirectoryStore::development(root)));
    }
    if let Some(root) = &config.packaged_store {
        chain = chain.with_store(Arc::new(DirectoryStore::packaged(root)));
    }
    if chain.is_empty() && !config.streaming {
        warn!("No voice stores configured; every voice key will be skipped");
    }
    chain
}
