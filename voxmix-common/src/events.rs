//! Event types for the voxmix event system

use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};

/// voxmix event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VoxEvent {
    /// Channel volume written to the mixer
    VolumeChanged {
        channel: ChannelId,
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Channel mute toggled
    MuteToggled {
        channel: ChannelId,
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Voice clip attached to the output and started
    VoiceStarted {
        key: String,
        duration_secs: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Voice key could not be resolved; playback advanced without it
    VoiceSkipped {
        key: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queued run drained
    VoiceQueueDrained {
        played: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Voice playback stopped and pending queue cleared
    VoiceQueueCleared {
        dropped: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl VoxEvent {
    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            VoxEvent::VolumeChanged { .. } => "VolumeChanged",
            VoxEvent::MuteToggled { .. } => "MuteToggled",
            VoxEvent::VoiceStarted { .. } => "VoiceStarted",
            VoxEvent::VoiceSkipped { .. } => "VoiceSkipped",
            VoxEvent::VoiceQueueDrained { .. } => "VoiceQueueDrained",
            VoxEvent::VoiceQueueCleared { .. } => "VoiceQueueCleared",
        }
    }
}
