//! Channel state manager
//!
//! Owns one [`ChannelState`] per channel and is the only writer of volume and
//! mute state. Volumes are linear `[0, 1]` on the API side and logarithmic
//! control values on the mixer side; conversion goes through
//! [`voxmix_common::volume`].
//!
//! **Responsibilities:**
//! - Initialize channel records from configured defaults
//! - Set/get volume, with mute edge detection on writes
//! - Toggle mute, restoring the pre-mute volume on unmute
//!
//! Reads (`get_volume`, `toggle_mute`) consult the live mixer value rather than
//! the stored volume, so external writes to the mixer are honored.
//!
//! Without a mixer backend every operation degrades to a no-op. The missing
//! backend is logged once, at error level.

use crate::audio::mixer::MixerBackend;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use voxmix_common::config::{ChannelDefaults, DEFAULT_CHANNEL_VOLUME};
use voxmix_common::events::VoxEvent;
use voxmix_common::volume::{
    clamp_linear, from_control, to_control, CONTROL_SILENCE, SILENCE_LINEAR_FLOOR,
};
use voxmix_common::ChannelId;

/// Per-channel volume and mute record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelState {
    name: &'static str,
    default_volume: f32,
    current_volume: f32,
    pre_mute_volume: f32,
    is_muted: bool,
}

impl ChannelState {
    fn new(channel: ChannelId, volume: f32) -> Self {
        Self {
            name: channel.as_str(),
            default_volume: volume,
            current_volume: volume,
            pre_mute_volume: volume,
            is_muted: false,
        }
    }

    /// Mixer parameter key
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_volume(&self) -> f32 {
        self.default_volume
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn pre_mute_volume(&self) -> f32 {
        self.pre_mute_volume
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }
}

/// Owner of all channel volume/mute state
pub struct ChannelStateManager {
    states: [ChannelState; ChannelId::COUNT],
    mixer: Option<Arc<dyn MixerBackend>>,
    missing_mixer_logged: AtomicBool,
    events: Option<broadcast::Sender<VoxEvent>>,
}

impl ChannelStateManager {
    /// Create a manager with every channel at the built-in default volume
    ///
    /// Nothing is written to the mixer until a volume is set.
    pub fn new(mixer: Option<Arc<dyn MixerBackend>>) -> Self {
        Self {
            states: ChannelId::ALL.map(|channel| ChannelState::new(channel, DEFAULT_CHANNEL_VOLUME)),
            mixer,
            missing_mixer_logged: AtomicBool::new(false),
            events: None,
        }
    }

    /// Broadcast volume/mute changes on the given sender
    pub fn with_events(mut self, events: broadcast::Sender<VoxEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build records and apply configured default volumes
    ///
    /// Each configured default goes through `set_volume`, so it reaches the
    /// mixer and participates in mute edge detection.
    pub fn initialize(&mut self, defaults: &ChannelDefaults) {
        info!("Initializing channel volumes");
        self.states = ChannelId::ALL.map(|channel| ChannelState::new(channel, DEFAULT_CHANNEL_VOLUME));
        for channel in ChannelId::ALL {
            let volume = defaults.volume_for(channel);
            self.state_mut(channel).default_volume = volume;
            self.set_volume(channel, volume);
        }
    }

    /// Resolve (or replace) the mixer backend
    ///
    /// Current volumes are pushed to the new backend so it matches the records.
    pub fn attach_mixer(&mut self, mixer: Arc<dyn MixerBackend>) {
        for state in &self.states {
            mixer.set_parameter(state.name, to_control(state.current_volume));
        }
        self.mixer = Some(mixer);
        self.missing_mixer_logged.store(false, Ordering::Relaxed);
        info!("Mixer backend attached");
    }

    pub fn has_mixer(&self) -> bool {
        self.mixer.is_some()
    }

    /// Read-only view of a channel record
    pub fn state(&self, channel: ChannelId) -> &ChannelState {
        &self.states[channel.index()]
    }

    pub fn is_muted(&self, channel: ChannelId) -> bool {
        self.state(channel).is_muted
    }

    /// Set both current and default volume (startup / config reload)
    ///
    /// Writes the value to the mixer but leaves the mute flag and the
    /// pre-mute snapshot alone. Without a mixer the record is left untouched.
    pub fn init_volume(&mut self, channel: ChannelId, volume: f32) {
        let Some(mixer) = self.mixer() else {
            return;
        };

        let volume = clamp_linear(volume);
        info!("Init volume {} to {}", channel, volume);

        let state = self.state_mut(channel);
        state.current_volume = volume;
        state.default_volume = volume;
        mixer.set_parameter(channel.as_str(), to_control(volume));
    }

    /// Set a channel's volume (clamped to `[0, 1]`)
    ///
    /// Mute state follows the edge into/out of silence: leaving the floor
    /// clears the flag, reaching it sets the flag. Setting 0 is therefore
    /// indistinguishable from muting.
    pub fn set_volume(&mut self, channel: ChannelId, volume: f32) {
        let Some(mixer) = self.mixer() else {
            return;
        };

        let volume = clamp_linear(volume);
        debug!("Set volume {} to {}", channel, volume);

        let state = &mut self.states[channel.index()];
        if state.current_volume <= SILENCE_LINEAR_FLOOR && volume >= 0.0 {
            state.is_muted = false;
        } else if state.current_volume >= 0.0 && volume <= SILENCE_LINEAR_FLOOR {
            state.is_muted = true;
        }

        mixer.set_parameter(state.name, to_control(volume));
        state.current_volume = volume;

        self.emit(VoxEvent::VolumeChanged {
            channel,
            volume,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Current linear volume as reported by the mixer
    ///
    /// Returns 0.0 without a mixer. A parameter the mixer has never seen
    /// reads as 0 dB (unity).
    pub fn get_volume(&self, channel: ChannelId) -> f32 {
        match self.mixer() {
            Some(_) => from_control(self.live_control(channel)),
            None => 0.0,
        }
    }

    /// Toggle mute; returns the resulting mute flag
    ///
    /// Without a mixer the flag is returned unchanged.
    pub fn toggle_mute(&mut self, channel: ChannelId) -> bool {
        if self.mixer().is_none() {
            return self.is_muted(channel);
        }

        if self.live_control(channel) <= CONTROL_SILENCE {
            let restore = self.state(channel).pre_mute_volume;
            self.set_volume(channel, restore);
            self.state_mut(channel).is_muted = false;
        } else {
            let state = self.state_mut(channel);
            state.pre_mute_volume = state.current_volume;
            self.set_volume(channel, SILENCE_LINEAR_FLOOR);
            self.state_mut(channel).is_muted = true;
        }

        let muted = self.is_muted(channel);
        info!("{} muted: {}", channel, muted);
        self.emit(VoxEvent::MuteToggled {
            channel,
            muted,
            timestamp: chrono::Utc::now(),
        });
        muted
    }

    fn live_control(&self, channel: ChannelId) -> f32 {
        self.mixer
            .as_ref()
            .and_then(|mixer| mixer.get_parameter(channel.as_str()))
            .unwrap_or(0.0)
    }

    fn state_mut(&mut self, channel: ChannelId) -> &mut ChannelState {
        &mut self.states[channel.index()]
    }

    /// Mixer handle, logging its absence once
    fn mixer(&self) -> Option<Arc<dyn MixerBackend>> {
        if self.mixer.is_none() && !self.missing_mixer_logged.swap(true, Ordering::Relaxed) {
            error!("Mixer backend not available; volume controls are inactive");
        }
        self.mixer.clone()
    }

    fn emit(&self, event: VoxEvent) {
        if let Some(events) = &self.events {
            // No receivers is fine
            let _ = events.send(event);
        }
    }
}
