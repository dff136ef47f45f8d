//! Voice scheduling and per-channel playback

pub mod agent;
pub mod cache;
pub mod queue;
pub mod service;
pub mod store;
pub mod streaming;
pub mod voice;

pub use agent::VoiceAgent;
pub use cache::{CacheLookup, ClipCache};
pub use queue::VoiceQueue;
pub use service::PlaybackService;
pub use store::{DirectoryStore, ResourceStore, StoreChain};
pub use streaming::{
    build_locator, AnyStreamingSource, FileStreamingSource, HttpStreamingSource, LocaleProvider,
    StaticLocale, StreamingSource,
};
pub use voice::{VoiceScheduler, VoiceSchedulerBuilder, VoiceSettings, MAX_VOICE_DELAY};
