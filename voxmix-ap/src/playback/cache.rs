//! Clip cache
//!
//! Maps logical clip keys to decoded clips. The cache is the owner responsible
//! for releasing what it holds: [`ClipCache::clear`] unloads every clip's
//! decoded data before forgetting it, and dropping the cache does the same.
//!
//! Misses are not errors; they trigger a load. Failed loads are not cached,
//! so the next request tries again. Entries never expire individually: a clip
//! whose data was unloaded stays cached and is rebuilt from its origin, and
//! the loader only runs again if that rebuild fails.
//!
//! Resolution is split so the decode can run without the cache borrowed:
//! [`ClipCache::lookup`] classifies the key, [`resolve`] does the blocking
//! work, and [`ClipCache::insert`] records the result.

use crate::audio::clip::{AudioClip, ClipHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache state of one key
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Cached with data resident
    Hit(ClipHandle),

    /// Cached but unloaded; needs a reload
    Unloaded(ClipHandle),

    Miss,
}

impl CacheLookup {
    /// True if resolving needs no I/O
    pub fn is_ready(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// Finish a lookup: reload an unloaded entry or run the loader on a miss
///
/// May decode from disk; callers on the async executor run it through
/// `spawn_blocking`.
pub fn resolve<F>(key: &str, lookup: CacheLookup, loader: F) -> Option<ClipHandle>
where
    F: FnOnce(&str) -> Option<AudioClip>,
{
    match lookup {
        CacheLookup::Hit(clip) => Some(clip),
        CacheLookup::Unloaded(clip) => match clip.reload() {
            Ok(_) => {
                debug!("Reloaded cached clip {}", key);
                Some(clip)
            }
            Err(e) => {
                warn!("Cached clip {} could not be reloaded ({}), loading again", key, e);
                loader(key).map(Arc::new)
            }
        },
        CacheLookup::Miss => loader(key).map(Arc::new),
    }
}

/// Key -> decoded clip map with explicit release
#[derive(Debug, Default)]
pub struct ClipCache {
    clips: HashMap<String, ClipHandle>,
}

impl ClipCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached clip for a key, without loading
    pub fn get(&self, key: &str) -> Option<&ClipHandle> {
        self.clips.get(key)
    }

    pub fn lookup(&self, key: &str) -> CacheLookup {
        match self.clips.get(key) {
            Some(clip) if clip.is_loaded() => CacheLookup::Hit(Arc::clone(clip)),
            Some(clip) => CacheLookup::Unloaded(Arc::clone(clip)),
            None => CacheLookup::Miss,
        }
    }

    /// Record a resolved clip; a reloaded entry is the same handle
    pub fn insert(&mut self, key: &str, clip: ClipHandle) {
        match self.clips.get(key) {
            Some(existing) if Arc::ptr_eq(existing, &clip) => {}
            _ => {
                self.clips.insert(key.to_string(), clip);
            }
        }
    }

    /// Return the cached clip, loading and caching it on a miss
    pub fn get_or_load<F>(&mut self, key: &str, loader: F) -> Option<ClipHandle>
    where
        F: FnOnce(&str) -> Option<AudioClip>,
    {
        let clip = resolve(key, self.lookup(key), loader)?;
        self.insert(key, Arc::clone(&clip));
        Some(clip)
    }

    /// Unload every clip and empty the cache; returns how many were held
    pub fn clear(&mut self) -> usize {
        let count = self.clips.len();
        for clip in self.clips.values() {
            clip.unload_audio_data();
        }
        self.clips.clear();
        if count > 0 {
            debug!("Clip cache cleared ({} clips released)", count);
        }
        count
    }

    pub fn contains(&self, key: &str) -> bool {
        self.clips.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl Drop for ClipCache {
    fn drop(&mut self) {
        self.clear();
    }
}
