//! # voxmix Audio Player Library (voxmix-ap)
//!
//! Per-channel volume/mute management and a sequential voice playback engine.
//!
//! **Components:**
//! - [`channels::ChannelStateManager`]: linear volume API over a logarithmic
//!   mixer, with mute/unmute restore semantics
//! - [`playback::VoiceScheduler`]: single-consumer voice queue with caching,
//!   streaming and cancellation
//! - [`playback::PlaybackService`]: fire-and-forget playback per channel
//! - [`system::AudioSystem`]: wiring of the above from configuration

pub mod audio;
pub mod channels;
pub mod error;
pub mod playback;
pub mod state;
pub mod system;

pub use error::{Error, Result};
pub use state::SharedState;
pub use system::AudioSystem;
