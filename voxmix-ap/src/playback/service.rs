//! Per-channel playback service
//!
//! One output per channel for fire-and-forget playback: background music,
//! sound effects and one-off voice clips that bypass the voice queue.

use crate::audio::clip::ClipHandle;
use crate::audio::output::{ClockOutput, OutputAdapter};
use crate::error::{Error, Result};
use crate::playback::store::ResourceStore;
use std::sync::Arc;
use tracing::{debug, error, warn};
use voxmix_common::volume::clamp_linear;
use voxmix_common::ChannelId;

/// Music/SFX/Voice outputs
pub struct PlaybackService {
    outputs: [Box<dyn OutputAdapter>; ChannelId::COUNT],
    store: Arc<dyn ResourceStore>,
}

impl PlaybackService {
    /// Service with the given outputs, indexed by [`ChannelId::index`]
    pub fn new(outputs: [Box<dyn OutputAdapter>; ChannelId::COUNT], store: Arc<dyn ResourceStore>) -> Self {
        Self { outputs, store }
    }

    /// Service with a headless clock output on every channel
    pub fn headless(store: Arc<dyn ResourceStore>) -> Self {
        Self::new(
            [
                Box::new(ClockOutput::new()),
                Box::new(ClockOutput::new()),
                Box::new(ClockOutput::new()),
            ],
            store,
        )
    }

    /// Play a clip on a channel's output
    ///
    /// Stops whatever that output was playing. Volume is clamped to [0, 1].
    pub fn play_clip(&mut self, clip: ClipHandle, channel: ChannelId, looped: bool, volume: f32) {
        let output = self.output_mut(channel);
        if output.is_playing() {
            output.stop();
        }

        output.set_looping(looped);
        output.set_volume(clamp_linear(volume));
        debug!("Playing {} on {} (loop: {})", clip.key(), channel, looped);
        output.attach(Some(clip));
        output.play();
    }

    /// Load a clip from the store and play it
    pub fn play_from_store(
        &mut self,
        path: &str,
        channel: ChannelId,
        looped: bool,
        volume: f32,
    ) -> Result<ClipHandle> {
        if path.is_empty() {
            warn!("play_from_store called with an empty path");
            return Err(voxmix_common::Error::InvalidInput("empty resource path".into()).into());
        }

        let clip: ClipHandle = match self.store.load(path) {
            Some(clip) => Arc::new(clip),
            None => {
                error!("Unable to load clip {} from {} store", path, self.store.name());
                return Err(Error::NotFound(path.to_string()));
            }
        };

        self.play_clip(Arc::clone(&clip), channel, looped, volume);
        Ok(clip)
    }

    /// Music loops unless told otherwise
    pub fn play_music(&mut self, clip: ClipHandle, looped: bool, volume: f32) {
        self.play_clip(clip, ChannelId::Music, looped, volume);
    }

    pub fn play_sfx(&mut self, clip: ClipHandle, volume: f32) {
        self.play_clip(clip, ChannelId::Sfx, false, volume);
    }

    pub fn play_voice(&mut self, clip: ClipHandle, looped: bool, volume: f32) {
        self.play_clip(clip, ChannelId::Voice, looped, volume);
    }

    /// Stop one channel
    ///
    /// The SFX output keeps its clip attached; the others detach it.
    pub fn stop(&mut self, channel: ChannelId) {
        let output = self.output_mut(channel);
        output.stop();
        if channel != ChannelId::Sfx {
            output.attach(None);
        }
    }

    pub fn stop_all(&mut self) {
        for channel in ChannelId::ALL {
            self.stop(channel);
        }
    }

    pub fn output(&self, channel: ChannelId) -> &dyn OutputAdapter {
        self.outputs[channel.index()].as_ref()
    }

    fn output_mut(&mut self, channel: ChannelId) -> &mut dyn OutputAdapter {
        self.outputs[channel.index()].as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clip::AudioClip;

    struct OneClipStore;

    impl ResourceStore for OneClipStore {
        fn name(&self) -> &str {
            "one"
        }

        fn load(&self, key: &str) -> Option<AudioClip> {
            (key == "theme").then(|| AudioClip::silent(key, 10.0, 1000))
        }
    }

    fn service() -> PlaybackService {
        PlaybackService::headless(Arc::new(OneClipStore))
    }

    fn clip(key: &str) -> ClipHandle {
        Arc::new(AudioClip::silent(key, 10.0, 1000))
    }

    #[test]
    fn test_play_clip_clamps_volume() {
        let mut service = service();
        service.play_sfx(clip("boom"), 3.0);
        let output = service.output(ChannelId::Sfx);
        assert!(output.is_playing());
        assert_eq!(output.volume(), 1.0);
    }

    #[test]
    fn test_play_replaces_current_clip() {
        let mut service = service();
        service.play_music(clip("a"), true, 0.5);
        service.play_music(clip("b"), true, 0.5);
        let output = service.output(ChannelId::Music);
        assert_eq!(output.clip().unwrap().key(), "b");
        assert!(output.is_playing());
    }

    #[test]
    fn test_sfx_keeps_clip_on_stop() {
        let mut service = service();
        service.play_sfx(clip("boom"), 1.0);
        service.play_voice(clip("line"), false, 1.0);
        service.play_music(clip("theme"), true, 1.0);

        service.stop_all();
        assert!(service.output(ChannelId::Sfx).clip().is_some());
        assert!(service.output(ChannelId::Voice).clip().is_none());
        assert!(service.output(ChannelId::Music).clip().is_none());
        for channel in ChannelId::ALL {
            assert!(!service.output(channel).is_playing());
        }
    }

    #[test]
    fn test_play_from_store() {
        let mut service = service();
        let clip = service
            .play_from_store("theme", ChannelId::Music, true, 0.7)
            .unwrap();
        assert_eq!(clip.key(), "theme");
        assert!(service.output(ChannelId::Music).is_playing());

        assert!(matches!(
            service.play_from_store("missing", ChannelId::Music, false, 1.0),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.play_from_store("", ChannelId::Music, false, 1.0),
            Err(Error::Common(voxmix_common::Error::InvalidInput(_)))
        ));
    }
}
