//! Audio resources and output devices

pub mod clip;
pub mod decode;
pub mod mixer;
pub mod output;

pub use clip::{AudioClip, ClipHandle, ClipOrigin};
pub use mixer::{InMemoryMixer, MixerBackend};
pub use output::{ClockOutput, OutputAdapter};
