//! Voice queue scheduler
//!
//! Sequences voice clips on a single output. A play request carries one or
//! more clip keys and an inter-clip delay:
//!
//! - One key while no queued run is active plays immediately.
//! - More keys start a queued run, or are appended to the run already in
//!   progress. A run pops keys front to back, resolves and plays each clip,
//!   waits for the output to finish (polled once per tick), waits one more
//!   tick, then waits the delay before the next key.
//!
//! Clips are resolved through the clip cache and the local stores, or in
//! streaming mode fetched from a locator built from the key. A key that
//! cannot be resolved marks the session "no clip" and the run moves on.
//! Decoding never happens under the session lock: runs decode on the blocking
//! pool, and the single-key path decodes on the caller's thread with the lock
//! released.
//!
//! [`VoiceScheduler::stop`] cancels the active run and any outstanding fetch.
//! Every suspension point checks the session's cancellation token under the
//! session lock, so a stopped run never touches the output again and a late
//! fetch result is discarded.

use crate::audio::clip::{AudioClip, ClipHandle};
use crate::audio::output::OutputAdapter;
use crate::error::{Error, Result};
use crate::playback::cache::{resolve, CacheLookup, ClipCache};
use crate::playback::queue::VoiceQueue;
use crate::playback::store::ResourceStore;
use crate::playback::streaming::{build_locator, LocaleProvider, StaticLocale, StreamingSource};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use voxmix_common::config::VoiceConfig;
use voxmix_common::events::VoxEvent;
use voxmix_common::volume::clamp_linear;

/// Longest accepted inter-clip delay; larger finite delays are capped
pub const MAX_VOICE_DELAY: Duration = Duration::from_secs(3600);

/// Scheduler tuning taken from the `[voice]` config section
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    /// Resolve clips through the streaming source
    pub streaming: bool,
    pub stream_base: String,
    pub stream_extension: String,

    /// Poll interval while waiting on the output
    pub tick: Duration,

    /// Upper bound on one streaming fetch
    pub fetch_timeout: Option<Duration>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::from(&VoiceConfig::default())
    }
}

impl From<&VoiceConfig> for VoiceSettings {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            streaming: config.streaming,
            stream_base: config.stream_base.clone(),
            stream_extension: config.stream_extension.clone(),
            tick: config.tick_interval(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// Mutable playback session, guarded by one lock
struct Session {
    output: Box<dyn OutputAdapter>,
    cache: ClipCache,
    queue: VoiceQueue,

    /// Last resolution failed; the completion wait ends immediately
    no_clip: bool,

    /// A queued run is active
    processing: bool,

    /// Cancelled by stop(); replaced with a fresh token afterwards
    cancel: CancellationToken,

    run: Option<JoinHandle<()>>,

    /// Outstanding single-key streaming fetch
    fetch: Option<JoinHandle<()>>,

    /// Bumped whenever an in-flight single-key resolution is superseded
    fetch_seq: u64,
}

impl Session {
    /// Abort any single-key fetch and invalidate in-flight resolutions
    fn supersede_fetch(&mut self) -> u64 {
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
        self.fetch_seq += 1;
        self.fetch_seq
    }
}

struct Inner {
    loader: Arc<dyn ResourceStore>,
    streaming: Option<Arc<dyn StreamingSource>>,
    locale: Arc<dyn LocaleProvider>,
    settings: VoiceSettings,
    events: Option<broadcast::Sender<VoxEvent>>,
    session: Mutex<Session>,
}

/// Builder for [`VoiceScheduler`]
pub struct VoiceSchedulerBuilder {
    output: Box<dyn OutputAdapter>,
    loader: Arc<dyn ResourceStore>,
    streaming: Option<Arc<dyn StreamingSource>>,
    locale: Arc<dyn LocaleProvider>,
    settings: VoiceSettings,
    events: Option<broadcast::Sender<VoxEvent>>,
}

impl VoiceSchedulerBuilder {
    pub fn settings(mut self, settings: VoiceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Source used when streaming mode is on
    pub fn streaming_source(mut self, source: Arc<dyn StreamingSource>) -> Self {
        self.streaming = Some(source);
        self
    }

    pub fn locale(mut self, locale: Arc<dyn LocaleProvider>) -> Self {
        self.locale = locale;
        self
    }

    pub fn events(mut self, events: broadcast::Sender<VoxEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> VoiceScheduler {
        if self.settings.streaming && self.streaming.is_none() {
            warn!("Streaming mode configured without a streaming source; using local stores");
        }

        VoiceScheduler {
            inner: Arc::new(Inner {
                loader: self.loader,
                streaming: self.streaming,
                locale: self.locale,
                settings: self.settings,
                events: self.events,
                session: Mutex::new(Session {
                    output: self.output,
                    cache: ClipCache::new(),
                    queue: VoiceQueue::new(),
                    no_clip: false,
                    processing: false,
                    cancel: CancellationToken::new(),
                    run: None,
                    fetch: None,
                    fetch_seq: 0,
                }),
            }),
        }
    }
}

/// Single-consumer voice playback scheduler
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct VoiceScheduler {
    inner: Arc<Inner>,
}

impl VoiceScheduler {
    pub fn builder(
        output: Box<dyn OutputAdapter>,
        loader: Arc<dyn ResourceStore>,
    ) -> VoiceSchedulerBuilder {
        VoiceSchedulerBuilder {
            output,
            loader,
            streaming: None,
            locale: Arc::new(StaticLocale::default()),
            settings: VoiceSettings::default(),
            events: None,
        }
    }

    /// Request playback of `keys` with `delay` seconds between queued clips
    ///
    /// Returns false if the voice output is muted, `keys` is empty, or the
    /// request needs a runtime and none is running. Resolution failures are
    /// not reported here; they surface as skipped clips. A non-finite or
    /// negative delay means none; a delay past [`MAX_VOICE_DELAY`] is capped.
    pub fn play<S: AsRef<str>>(&self, delay: f32, keys: &[S]) -> bool {
        if keys.is_empty() {
            return false;
        }

        let mut session = self.inner.lock();
        if session.output.is_muted() {
            debug!("Voice output muted, ignoring play request");
            return false;
        }

        if keys.len() == 1 && !session.processing {
            return self.play_immediate(session, keys[0].as_ref());
        }

        session
            .queue
            .enqueue_all(keys.iter().map(|key| key.as_ref().to_string()));
        if session.processing {
            debug!("Appended {} keys to active voice run", keys.len());
            return true;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                error!("Voice queue needs a tokio runtime; dropping request");
                session.queue.clear();
                return false;
            }
        };

        // A pending single-key resolution must not land on top of the run
        session.supersede_fetch();

        let delay = delay_duration(delay);
        session.processing = true;
        let token = session.cancel.clone();
        let inner = Arc::clone(&self.inner);
        info!(
            "Starting voice run: {} keys, {:.2}s delay",
            keys.len(),
            delay.as_secs_f32()
        );
        session.run = Some(runtime.spawn(run_queue(inner, delay, token)));
        true
    }

    /// Stop playback and reset to idle
    ///
    /// Cancels the active run and any outstanding fetch, drops pending keys,
    /// stops the output and unloads the attached clip. Safe when idle.
    pub fn stop(&self) {
        let mut session = self.inner.lock();
        session.cancel.cancel();
        session.cancel = CancellationToken::new();
        if let Some(run) = session.run.take() {
            run.abort();
        }
        session.supersede_fetch();

        let dropped = session.queue.clear();
        let was_processing = std::mem::replace(&mut session.processing, false);
        session.no_clip = false;
        session.output.stop();
        if let Some(clip) = session.output.clip() {
            clip.unload_audio_data();
        }
        session.output.attach(None);
        drop(session);

        if was_processing || dropped > 0 {
            info!("Voice playback stopped ({} pending dropped)", dropped);
            self.inner.emit(VoxEvent::VoiceQueueCleared {
                dropped,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Stop and release every cached clip
    pub fn shutdown(&self) {
        self.stop();
        let released = self.inner.lock().cache.clear();
        debug!("Voice scheduler shut down ({} cached clips released)", released);
    }

    /// Length in seconds of the clip attached to the output, or 0
    pub fn current_duration(&self) -> f32 {
        self.inner.lock().output.duration()
    }

    /// Key of the clip attached to the output
    pub fn current_clip(&self) -> Option<String> {
        self.inner
            .lock()
            .output
            .clip()
            .map(|clip| clip.key().to_string())
    }

    /// Flip the voice output's mute flag; returns the new state
    pub fn toggle_mute(&self) -> bool {
        let mut session = self.inner.lock();
        let muted = !session.output.is_muted();
        session.output.set_muted(muted);
        muted
    }

    pub fn is_muted(&self) -> bool {
        self.inner.lock().output.is_muted()
    }

    pub fn set_global_volume(&self, volume: f32) {
        self.inner.lock().output.set_volume(clamp_linear(volume));
    }

    pub fn global_volume(&self) -> f32 {
        self.inner.lock().output.volume()
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.is_streaming()
    }

    /// True while a queued run is active
    pub fn is_processing(&self) -> bool {
        self.inner.lock().processing
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().output.is_playing()
    }

    /// Keys waiting in the active run
    pub fn pending_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn cached_clips(&self) -> usize {
        self.inner.lock().cache.len()
    }

    /// Wait until no run is active, no fetch is outstanding and the output is quiet
    pub async fn wait_idle(&self) {
        loop {
            {
                let session = self.inner.lock();
                if !session.processing && session.fetch.is_none() && !session.output.is_playing() {
                    return;
                }
            }
            tokio::time::sleep(self.inner.settings.tick).await;
        }
    }

    /// Single-key fast path
    fn play_immediate(&self, mut session: MutexGuard<'_, Session>, key: &str) -> bool {
        if !self.inner.is_streaming() {
            let seq = session.supersede_fetch();
            let lookup = session.cache.lookup(key);
            drop(session);

            let loader = &self.inner.loader;
            let clip = resolve(key, lookup, |key| loader.load(key));

            let mut session = self.inner.lock();
            if session.fetch_seq != seq || session.processing {
                debug!("Discarding superseded voice clip {}", key);
                return true;
            }
            if let Some(clip) = &clip {
                session.cache.insert(key, Arc::clone(clip));
            }
            self.inner.play_clip(&mut session, key, clip);
            return true;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                error!("Streaming voice playback needs a tokio runtime");
                return false;
            }
        };

        let seq = session.supersede_fetch();
        let token = session.cancel.clone();
        let inner = Arc::clone(&self.inner);
        let key = key.to_string();

        session.fetch = Some(runtime.spawn(async move {
            let clip = inner.fetch_streamed(&key, &token).await;
            let mut session = inner.lock();
            if token.is_cancelled() || session.fetch_seq != seq {
                debug!("Discarding superseded fetch for {}", key);
                return;
            }
            session.fetch = None;
            inner.play_clip(&mut session, &key, clip);
        }));
        true
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_streaming(&self) -> bool {
        self.settings.streaming && self.streaming.is_some()
    }

    fn emit(&self, event: VoxEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }

    /// Finish a cache lookup on the blocking pool
    async fn resolve_blocking(&self, key: &str, lookup: CacheLookup) -> Option<ClipHandle> {
        if let CacheLookup::Hit(clip) = lookup {
            return Some(clip);
        }

        let loader = Arc::clone(&self.loader);
        let owned_key = key.to_string();
        let task = tokio::task::spawn_blocking(move || {
            resolve(&owned_key, lookup, |key| loader.load(key))
        });
        match task.await {
            Ok(clip) => clip,
            Err(e) => {
                error!("Resolving voice clip {} failed: {}", key, e);
                None
            }
        }
    }

    /// Fetch and decode through the streaming source
    ///
    /// None on failure (logged with the locator) or when cancelled.
    async fn fetch_streamed(&self, key: &str, token: &CancellationToken) -> Option<ClipHandle> {
        let source = self.streaming.as_ref()?;
        let locale = self.locale.language_code();
        let locator = build_locator(
            &self.settings.stream_base,
            key,
            locale.as_deref(),
            &self.settings.stream_extension,
        );

        let fetch = with_timeout(self.settings.fetch_timeout, &locator, source.fetch(key, &locator));
        let result = tokio::select! {
            _ = token.cancelled() => return None,
            result = fetch => result,
        };

        match result {
            Ok(clip) => Some(Arc::new(clip)),
            Err(e) => {
                warn!(locator = %locator, "Voice stream failed: {}", e);
                None
            }
        }
    }

    /// Attach and start a resolved clip, or record the miss
    fn play_clip(&self, session: &mut Session, key: &str, clip: Option<ClipHandle>) {
        let Some(clip) = clip else {
            warn!("No voice clip for key {}", key);
            session.no_clip = true;
            self.emit(VoxEvent::VoiceSkipped {
                key: key.to_string(),
                reason: "clip not found".to_string(),
                timestamp: chrono::Utc::now(),
            });
            return;
        };

        session.no_clip = false;
        if let Some(previous) = session.output.clip() {
            if !Arc::ptr_eq(previous, &clip) {
                previous.unload_audio_data();
            }
        }

        let duration_secs = clip.duration();
        session.output.attach(Some(clip));
        session.output.play();
        debug!("Playing voice clip {} ({:.2}s)", key, duration_secs);
        self.emit(VoxEvent::VoiceStarted {
            key: key.to_string(),
            duration_secs,
            timestamp: chrono::Utc::now(),
        });
    }
}

async fn with_timeout<F>(
    timeout: Option<Duration>,
    locator: &str,
    fetch: F,
) -> Result<AudioClip>
where
    F: Future<Output = Result<AudioClip>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fetch)
            .await
            .unwrap_or_else(|_| {
                Err(Error::Stream {
                    locator: locator.to_string(),
                    message: format!("timed out after {}ms", limit.as_millis()),
                })
            }),
        None => fetch.await,
    }
}

/// Sleep unless cancelled first; false when cancelled
async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Clamp a requested delay to `[0, MAX_VOICE_DELAY]`
fn delay_duration(delay: f32) -> Duration {
    if !delay.is_finite() {
        warn!("Voice delay {} is not finite, using no delay", delay);
        return Duration::ZERO;
    }
    if delay <= 0.0 {
        return Duration::ZERO;
    }
    match Duration::try_from_secs_f32(delay) {
        Ok(duration) if duration <= MAX_VOICE_DELAY => duration,
        _ => {
            warn!(
                "Voice delay {}s out of range, capping at {}s",
                delay,
                MAX_VOICE_DELAY.as_secs()
            );
            MAX_VOICE_DELAY
        }
    }
}

/// Resets the session when a run task ends without draining or being stopped
struct RunGuard {
    inner: Arc<Inner>,
    token: CancellationToken,
    finished: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // A stopped run was already reset by stop()
        if self.finished || self.token.is_cancelled() {
            return;
        }
        let mut session = self.inner.lock();
        let dropped = session.queue.clear();
        session.processing = false;
        session.run = None;
        error!("Voice run ended unexpectedly ({} pending dropped)", dropped);
    }
}

/// Queued run: drain the queue one clip at a time
async fn run_queue(inner: Arc<Inner>, delay: Duration, token: CancellationToken) {
    let tick = inner.settings.tick;
    let mut guard = RunGuard {
        inner: Arc::clone(&inner),
        token: token.clone(),
        finished: false,
    };

    loop {
        let key = {
            let mut session = inner.lock();
            if token.is_cancelled() {
                return;
            }
            let next = session.queue.pop_front();
            match next {
                Some(key) => key,
                None => {
                    session.processing = false;
                    session.run = None;
                    let played = session.queue.take_dispatched();
                    drop(session);
                    guard.finished = true;
                    info!("Voice run drained ({} clips)", played);
                    inner.emit(VoxEvent::VoiceQueueDrained {
                        played,
                        timestamp: chrono::Utc::now(),
                    });
                    return;
                }
            }
        };

        let streaming = inner.is_streaming();
        let clip = if streaming {
            inner.fetch_streamed(&key, &token).await
        } else {
            let lookup = inner.lock().cache.lookup(&key);
            inner.resolve_blocking(&key, lookup).await
        };

        {
            let mut session = inner.lock();
            if token.is_cancelled() {
                return;
            }
            if !streaming {
                if let Some(clip) = &clip {
                    session.cache.insert(&key, Arc::clone(clip));
                }
            }
            inner.play_clip(&mut session, &key, clip);
        }

        // Wait for the output to finish
        loop {
            let done = {
                let session = inner.lock();
                session.no_clip || !session.output.is_playing()
            };
            if done {
                break;
            }
            if !pause(&token, tick).await {
                return;
            }
        }

        if !pause(&token, tick).await {
            return;
        }
        if !delay.is_zero() && !pause(&token, delay).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::ClockOutput;

    struct SilentStore;

    impl ResourceStore for SilentStore {
        fn name(&self) -> &str {
            "silent"
        }

        fn load(&self, key: &str) -> Option<AudioClip> {
            (key != "missing").then(|| AudioClip::silent(key, 0.02, 1000))
        }
    }

    fn scheduler() -> VoiceScheduler {
        let settings = VoiceSettings {
            tick: Duration::from_millis(1),
            ..VoiceSettings::default()
        };
        VoiceScheduler::builder(Box::new(ClockOutput::new()), Arc::new(SilentStore))
            .settings(settings)
            .build()
    }

    #[test]
    fn test_empty_request_rejected() {
        let voice = scheduler();
        let keys: [&str; 0] = [];
        assert!(!voice.play(0.0, &keys));
        assert!(!voice.is_processing());
    }

    #[test]
    fn test_muted_output_rejects_play() {
        let voice = scheduler();
        assert!(voice.toggle_mute());
        assert!(!voice.play(0.0, &["a"]));
        assert!(voice.current_clip().is_none());

        assert!(!voice.toggle_mute());
        assert!(voice.play(0.0, &["a"]));
        assert_eq!(voice.current_clip().as_deref(), Some("a"));
    }

    #[test]
    fn test_single_key_plays_without_runtime() {
        let voice = scheduler();
        assert!(voice.play(0.0, &["a"]));
        assert!(!voice.is_processing());
        assert!((voice.current_duration() - 0.02).abs() < 1e-3);
    }

    #[test]
    fn test_queued_run_needs_runtime() {
        let voice = scheduler();
        assert!(!voice.play(0.0, &["a", "b"]));
        assert_eq!(voice.pending_len(), 0);
    }

    #[test]
    fn test_stop_when_idle_is_safe() {
        let voice = scheduler();
        voice.stop();
        voice.stop();
        assert_eq!(voice.current_duration(), 0.0);
    }

    #[test]
    fn test_stop_unloads_attached_clip() {
        let voice = scheduler();
        voice.play(0.0, &["a"]);
        voice.stop();
        assert!(voice.current_clip().is_none());
        assert_eq!(voice.current_duration(), 0.0);
    }

    #[test]
    fn test_swapping_clip_unloads_previous() {
        let voice = scheduler();
        voice.play(0.0, &["a"]);
        voice.play(0.0, &["b"]);

        let session = voice.inner.lock();
        assert!(!session.cache.get("a").unwrap().is_loaded());
        assert!(session.cache.get("b").unwrap().is_loaded());
    }

    #[test]
    fn test_delay_duration_bounds() {
        assert_eq!(delay_duration(0.5), Duration::from_millis(500));
        assert_eq!(delay_duration(0.0), Duration::ZERO);
        assert_eq!(delay_duration(-2.0), Duration::ZERO);
        assert_eq!(delay_duration(f32::NAN), Duration::ZERO);
        assert_eq!(delay_duration(f32::INFINITY), Duration::ZERO);
        assert_eq!(delay_duration(f32::NEG_INFINITY), Duration::ZERO);
        assert_eq!(delay_duration(1e20), MAX_VOICE_DELAY);
        assert_eq!(delay_duration(7200.0), MAX_VOICE_DELAY);
    }

    #[test]
    fn test_run_guard_resets_abandoned_run() {
        let voice = scheduler();
        {
            let mut session = voice.inner.lock();
            session.processing = true;
            session.queue.enqueue_all(["a", "b"]);
        }

        drop(RunGuard {
            inner: Arc::clone(&voice.inner),
            token: CancellationToken::new(),
            finished: false,
        });
        assert!(!voice.is_processing());
        assert_eq!(voice.pending_len(), 0);
    }

    #[test]
    fn test_run_guard_ignores_stopped_run() {
        let voice = scheduler();
        let token = CancellationToken::new();
        token.cancel();
        voice.inner.lock().processing = true;

        drop(RunGuard {
            inner: Arc::clone(&voice.inner),
            token,
            finished: false,
        });
        assert!(voice.is_processing());
    }

    #[test]
    fn test_global_volume_clamped() {
        let voice = scheduler();
        voice.set_global_volume(1.7);
        assert_eq!(voice.global_volume(), 1.0);
        voice.set_global_volume(0.25);
        assert_eq!(voice.global_volume(), 0.25);
    }

    #[tokio::test]
    async fn test_missing_key_marks_no_clip() {
        let voice = scheduler();
        assert!(voice.play(0.0, &["missing"]));
        assert!(voice.inner.lock().no_clip);
        voice.wait_idle().await;
    }

    #[tokio::test]
    async fn test_queued_run_drains() {
        let voice = scheduler();
        assert!(voice.play(0.0, &["a", "b"]));
        assert!(voice.is_processing());

        tokio::time::timeout(Duration::from_secs(2), voice.wait_idle())
            .await
            .unwrap();
        assert!(!voice.is_processing());
        assert_eq!(voice.current_clip().as_deref(), Some("b"));
    }
}
