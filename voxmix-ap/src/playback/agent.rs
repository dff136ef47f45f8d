//! Voice trigger binding
//!
//! A [`VoiceAgent`] is a reusable binding of clip keys and a delay to a voice
//! scheduler, attached to something with an enable/disable lifecycle (a
//! screen, a dialog). It can play on enable and stop on disable, and tracks
//! whether it was the one that started playback.

use crate::playback::voice::VoiceScheduler;
use tracing::debug;

/// Keys + delay bound to a scheduler
#[derive(Clone)]
pub struct VoiceAgent {
    scheduler: Option<VoiceScheduler>,
    keys: Vec<String>,
    delay: f32,
    play_on_enable: bool,
    stop_on_disable: bool,
    is_playing: bool,
}

impl VoiceAgent {
    pub fn new(keys: Vec<String>, delay: f32) -> Self {
        Self {
            scheduler: None,
            keys,
            delay: delay.max(0.0),
            play_on_enable: false,
            stop_on_disable: true,
            is_playing: false,
        }
    }

    /// Play the keys whenever the owner is enabled
    pub fn play_on_enable(mut self, enabled: bool) -> Self {
        self.play_on_enable = enabled;
        self
    }

    /// Stop playback when the owner is disabled (default on)
    pub fn stop_on_disable(mut self, enabled: bool) -> Self {
        self.stop_on_disable = enabled;
        self
    }

    /// Bind to a scheduler
    pub fn initialize(&mut self, scheduler: VoiceScheduler) {
        self.scheduler = Some(scheduler);
    }

    pub fn set_keys(&mut self, keys: Vec<String>) {
        self.keys = keys;
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Negative delays clamp to zero
    pub fn set_delay(&mut self, delay: f32) {
        self.delay = if delay > 0.0 { delay } else { 0.0 };
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    /// True if the last play request from this agent was accepted
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Play the bound keys; false if unbound or the scheduler refused
    pub fn play(&mut self) -> bool {
        let Some(scheduler) = &self.scheduler else {
            debug!("Voice agent not initialized, ignoring play");
            return false;
        };
        self.is_playing = scheduler.play(self.delay, &self.keys);
        self.is_playing
    }

    /// Stop the scheduler if this agent started playback
    pub fn stop(&mut self) {
        if !self.is_playing {
            return;
        }
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }
        self.is_playing = false;
    }

    pub fn on_enable(&mut self) {
        if self.play_on_enable {
            self.play();
        }
    }

    pub fn on_disable(&mut self) {
        if self.stop_on_disable {
            self.stop();
        }
    }
}
