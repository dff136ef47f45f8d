//! Playback output adapters
//!
//! An [`OutputAdapter`] is a single-stream output: one clip attached at a
//! time, with play/stop, a playing flag, a mute flag and an output gain.
//! The voice engine drives exactly one adapter; the per-channel playback
//! service drives one adapter per channel.
//!
//! [`ClockOutput`] is a headless adapter that tracks playback against the
//! clock. It reports "playing" until the attached clip's duration has
//! elapsed, which is all the voice engine observes.

use crate::audio::clip::ClipHandle;
use tokio::time::Instant;
use voxmix_common::volume::clamp_linear;

/// Single-stream audio output device
pub trait OutputAdapter: Send {
    /// Attach a clip (or detach with None). Stops current playback.
    fn attach(&mut self, clip: Option<ClipHandle>);

    /// Currently attached clip
    fn clip(&self) -> Option<&ClipHandle>;

    /// Start playback of the attached clip from the beginning
    fn play(&mut self);

    /// Stop playback; the clip stays attached
    fn stop(&mut self);

    /// True while the attached clip is audibly progressing
    fn is_playing(&self) -> bool;

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Output gain (0-1)
    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);

    fn set_looping(&mut self, looping: bool);

    /// Duration in seconds of the attached clip, or 0 if none
    fn duration(&self) -> f32 {
        self.clip().map(|clip| clip.duration()).unwrap_or(0.0)
    }
}

/// Headless output that plays clips against the clock
#[derive(Debug)]
pub struct ClockOutput {
    clip: Option<ClipHandle>,
    started_at: Option<Instant>,
    muted: bool,
    volume: f32,
    looping: bool,
}

impl ClockOutput {
    pub fn new() -> Self {
        Self {
            clip: None,
            started_at: None,
            muted: false,
            volume: 1.0,
            looping: false,
        }
    }

    /// Seconds since playback started, if playing
    pub fn position(&self) -> Option<f32> {
        let started_at = self.started_at?;
        let elapsed = started_at.elapsed().as_secs_f32();
        let duration = self.duration();
        if self.looping && duration > 0.0 {
            Some(elapsed % duration)
        } else {
            Some(elapsed.min(duration))
        }
    }
}

impl Default for ClockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputAdapter for ClockOutput {
    fn attach(&mut self, clip: Option<ClipHandle>) {
        self.started_at = None;
        self.clip = clip;
    }

    fn clip(&self) -> Option<&ClipHandle> {
        self.clip.as_ref()
    }

    fn play(&mut self) {
        if self.clip.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.started_at = None;
    }

    fn is_playing(&self) -> bool {
        match (&self.clip, self.started_at) {
            (Some(clip), Some(started_at)) => {
                self.looping || started_at.elapsed().as_secs_f32() < clip.duration()
            }
            _ => false,
        }
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_linear(volume);
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clip::AudioClip;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_idle_output() {
        let output = ClockOutput::new();
        assert!(!output.is_playing());
        assert_eq!(output.duration(), 0.0);
        assert!(output.position().is_none());
    }

    #[test]
    fn test_play_without_clip_does_nothing() {
        let mut output = ClockOutput::new();
        output.play();
        assert!(!output.is_playing());
    }

    #[tokio::test]
    async fn test_playing_until_duration_elapses() {
        let mut output = ClockOutput::new();
        output.attach(Some(Arc::new(AudioClip::silent("short", 0.03, 1000))));
        output.play();
        assert!(output.is_playing());
        assert!((output.duration() - 0.03).abs() < 1e-6);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!output.is_playing());
    }

    #[test]
    fn test_stop_and_detach() {
        let mut output = ClockOutput::new();
        output.attach(Some(Arc::new(AudioClip::silent("long", 10.0, 1000))));
        output.play();
        assert!(output.is_playing());

        output.stop();
        assert!(!output.is_playing());
        assert!(output.clip().is_some());

        output.attach(None);
        assert_eq!(output.duration(), 0.0);
    }

    #[test]
    fn test_looping_keeps_playing() {
        let mut output = ClockOutput::new();
        output.attach(Some(Arc::new(AudioClip::silent("loop", 0.0, 1000))));
        output.set_looping(true);
        output.play();
        assert!(output.is_playing());
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut output = ClockOutput::new();
        output.set_volume(2.0);
        assert_eq!(output.volume(), 1.0);
        output.set_volume(-1.0);
        assert_eq!(output.volume(), 0.0);
    }
}
