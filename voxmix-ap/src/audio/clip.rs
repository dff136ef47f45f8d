//! Decoded audio clips
//!
//! An [`AudioClip`] holds decoded, interleaved f32 samples for one logical
//! clip key. Clips are shared through [`ClipHandle`] (an `Arc`), but their
//! decoded data is released explicitly with [`AudioClip::unload_audio_data`]
//! so large buffers are freed at a known point rather than whenever the last
//! handle happens to drop.
//!
//! Unloading keeps the clip itself valid. A clip that knows its [`ClipOrigin`]
//! rebuilds its data with [`AudioClip::reload`], so a cache can keep handing
//! out the same handle after the data was released.

use crate::audio::decode::decode_file;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle to a decoded clip
pub type ClipHandle = Arc<AudioClip>;

/// Where a clip's decoded data comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOrigin {
    /// Decoded from a file; reloading decodes the file again
    File(PathBuf),

    /// Generated silence; reloading regenerates it
    Silence,

    /// Decoded from bytes that were not kept; cannot be reloaded
    Transient,
}

/// Decoded audio resource identified by a logical key
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Interleaved by channel: [L, R, L, R, ...] for stereo
#[derive(Debug)]
pub struct AudioClip {
    /// Logical clip key (or locator for streamed clips)
    key: String,

    /// Native sample rate
    sample_rate: u32,

    /// Channel count
    channels: u16,

    /// Duration in seconds; survives unloading
    duration_secs: f32,

    /// Interleaved sample count of the decoded data
    sample_count: usize,

    origin: ClipOrigin,

    /// Decoded PCM data; None once unloaded
    samples: Mutex<Option<Arc<[f32]>>>,
}

impl AudioClip {
    /// Create a clip from decoded interleaved samples
    pub fn new(key: impl Into<String>, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            frames as f32 / sample_rate as f32
        };

        Self {
            key: key.into(),
            sample_rate,
            channels,
            duration_secs,
            sample_count: samples.len(),
            origin: ClipOrigin::Transient,
            samples: Mutex::new(Some(samples.into())),
        }
    }

    /// Record where the data can be rebuilt from
    pub fn with_origin(mut self, origin: ClipOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Create a silent clip of the given length
    ///
    /// Used where a placeholder resource is needed (headless runs, tests).
    pub fn silent(key: impl Into<String>, duration_secs: f32, sample_rate: u32) -> Self {
        let frames = (duration_secs.max(0.0) * sample_rate as f32).round() as usize;
        Self::new(key, vec![0.0; frames], sample_rate, 1).with_origin(ClipOrigin::Silence)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f32 {
        self.duration_secs
    }

    pub fn origin(&self) -> &ClipOrigin {
        &self.origin
    }

    /// True while decoded data is resident
    pub fn is_loaded(&self) -> bool {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Decoded samples, if still resident
    pub fn samples(&self) -> Option<Arc<[f32]>> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Release the decoded data
    ///
    /// Metadata (key, duration) stays valid. Returns true if data was released.
    pub fn unload_audio_data(&self) -> bool {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Rebuild unloaded data from the clip's origin
    ///
    /// Returns false if the data was still resident. File origins decode the
    /// file again, so call this off the async executor.
    pub fn reload(&self) -> Result<bool> {
        if self.is_loaded() {
            return Ok(false);
        }

        let samples: Arc<[f32]> = match &self.origin {
            ClipOrigin::Silence => vec![0.0; self.sample_count].into(),
            ClipOrigin::File(path) => decode_file(&self.key, path)?
                .samples()
                .ok_or_else(|| Error::Decode(format!("{}: decoded clip has no data", self.key)))?,
            ClipOrigin::Transient => {
                return Err(Error::InvalidState(format!(
                    "{}: clip data was unloaded and has no origin to reload from",
                    self.key
                )))
            }
        };

        let mut slot = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(samples);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_frames() {
        let clip = AudioClip::new("stereo", vec![0.0; 44100 * 2], 44100, 2);
        assert!((clip.duration() - 1.0).abs() < 1e-6);
        assert_eq!(clip.channels(), 2);
        assert_eq!(clip.key(), "stereo");
    }

    #[test]
    fn test_unload_keeps_metadata() {
        let clip = AudioClip::silent("hello", 0.5, 8000);
        assert!(clip.is_loaded());
        assert!(clip.unload_audio_data());
        assert!(!clip.is_loaded());
        assert!(clip.samples().is_none());
        assert!((clip.duration() - 0.5).abs() < 1e-6);

        // Second unload is a no-op
        assert!(!clip.unload_audio_data());
    }

    #[test]
    fn test_silent_clip_reloads() {
        let clip = AudioClip::silent("pause", 0.25, 8000);
        assert!(!clip.reload().unwrap());

        clip.unload_audio_data();
        assert!(clip.reload().unwrap());
        assert_eq!(clip.samples().unwrap().len(), 2000);
    }

    #[test]
    fn test_transient_clip_cannot_reload() {
        let clip = AudioClip::new("streamed", vec![0.5; 16], 8000, 2);
        assert_eq!(clip.origin(), &ClipOrigin::Transient);

        clip.unload_audio_data();
        assert!(matches!(clip.reload(), Err(Error::InvalidState(_))));
        assert!(!clip.is_loaded());
    }

    #[test]
    fn test_zero_rate_has_zero_duration() {
        let clip = AudioClip::new("odd", vec![0.0; 10], 0, 1);
        assert_eq!(clip.duration(), 0.0);
    }
}
