//! Local resource stores
//!
//! A [`ResourceStore`] turns a logical clip key into a decoded clip. Stores are
//! chained: the voice engine asks an editable development store first and
//! falls back to the packaged asset store.
//!
//! [`DirectoryStore`] resolves keys under a root directory, trying each of its
//! search prefixes in turn and, when the key carries no extension, each known
//! audio extension.

use crate::audio::clip::AudioClip;
use crate::audio::decode::decode_file;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Extensions tried when a key has none
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "ogg", "flac", "m4a"];

/// Source of decoded clips keyed by logical clip key
pub trait ResourceStore: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &str;

    /// Load and decode a clip; None if the store does not have it
    fn load(&self, key: &str) -> Option<AudioClip>;
}

/// Store backed by a directory tree
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    name: String,
    root: PathBuf,
    prefixes: Vec<PathBuf>,
}

impl DirectoryStore {
    /// Store resolving `<root>/<prefix>/<key>` for each prefix in order
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, prefixes: Vec<PathBuf>) -> Self {
        let prefixes = if prefixes.is_empty() {
            vec![PathBuf::new()]
        } else {
            prefixes
        };
        Self {
            name: name.into(),
            root: root.into(),
            prefixes,
        }
    }

    /// Editable development store: `<root>/Assets/Voices/<key>`
    pub fn development(root: impl Into<PathBuf>) -> Self {
        Self::new("development", root, vec![PathBuf::from("Assets").join("Voices")])
    }

    /// Packaged asset store: `<root>/Voices/<key>`, then `<root>/<key>`
    pub fn packaged(root: impl Into<PathBuf>) -> Self {
        Self::new("packaged", root, vec![PathBuf::from("Voices"), PathBuf::new()])
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First existing file for a key, if any
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        if !is_safe_key(key) {
            warn!("{} store: rejecting unsafe clip key {:?}", self.name, key);
            return None;
        }

        let has_extension = Path::new(key).extension().is_some();
        for prefix in &self.prefixes {
            let base = self.root.join(prefix).join(key);
            if has_extension && base.is_file() {
                return Some(base);
            }
            for ext in AUDIO_EXTENSIONS {
                let candidate = append_extension(&base, ext);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

impl ResourceStore for DirectoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, key: &str) -> Option<AudioClip> {
        let path = self.resolve(key)?;
        match decode_file(key, &path) {
            Ok(clip) => {
                debug!("{} store: loaded {} from {}", self.name, key, path.display());
                Some(clip)
            }
            Err(e) => {
                warn!("{} store: failed to decode {}: {}", self.name, path.display(), e);
                None
            }
        }
    }
}

/// Stores consulted in order; the first hit wins
#[derive(Clone, Default)]
pub struct StoreChain {
    stores: Vec<Arc<dyn ResourceStore>>,
}

impl StoreChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a store to the end of the chain
    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.stores.push(store);
        self
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl ResourceStore for StoreChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn load(&self, key: &str) -> Option<AudioClip> {
        let clip = self.stores.iter().find_map(|store| store.load(key));
        if clip.is_none() {
            debug!("No store has clip {}", key);
        }
        clip
    }
}

/// Keys are relative paths without parent or root components
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn append_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
