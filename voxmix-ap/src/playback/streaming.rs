//! Streaming voice source
//!
//! In streaming mode voice clips are not read from the local stores. Each key is
//! turned into a locator under a base path (URL or directory) and fetched
//! asynchronously, then decoded off the async runtime.

use crate::audio::clip::AudioClip;
use crate::audio::decode::decode_bytes;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fetches and decodes a clip by locator
#[async_trait]
pub trait StreamingSource: Send + Sync {
    async fn fetch(&self, key: &str, locator: &str) -> Result<AudioClip>;
}

/// Supplies the current language code for locale-scoped locators
pub trait LocaleProvider: Send + Sync {
    fn language_code(&self) -> Option<String>;
}

/// Fixed locale (or none)
#[derive(Debug, Clone, Default)]
pub struct StaticLocale(pub Option<String>);

impl LocaleProvider for StaticLocale {
    fn language_code(&self) -> Option<String> {
        self.0.clone().filter(|code| !code.is_empty())
    }
}

/// Build the locator for a voice key
///
/// `base + "/Voices/" + [locale + "/"] + key + extension`
pub fn build_locator(base: &str, key: &str, locale: Option<&str>, extension: &str) -> String {
    let mut locator = String::with_capacity(base.len() + key.len() + extension.len() + 16);
    locator.push_str(base);
    locator.push_str("/Voices/");
    if let Some(code) = locale.filter(|code| !code.is_empty()) {
        locator.push_str(code);
        locator.push('/');
    }
    locator.push_str(key);
    locator.push_str(extension);
    locator
}

fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

fn extension_of(locator: &str) -> Option<String> {
    Path::new(locator)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string)
}

fn stream_error(locator: &str, message: impl ToString) -> Error {
    Error::Stream {
        locator: locator.to_string(),
        message: message.to_string(),
    }
}

/// Decode fetched bytes on the blocking pool
async fn decode_fetched(key: &str, locator: &str, bytes: Vec<u8>) -> Result<AudioClip> {
    let key_owned = key.to_string();
    let extension = extension_of(locator);
    tokio::task::spawn_blocking(move || decode_bytes(&key_owned, bytes, extension.as_deref()))
        .await
        .map_err(|e| stream_error(locator, format!("decode task failed: {}", e)))?
        .map_err(|e| stream_error(locator, e))
}

/// Streaming source over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpStreamingSource {
    client: reqwest::Client,
}

impl HttpStreamingSource {
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Client with an optional whole-request timeout
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StreamingSource for HttpStreamingSource {
    async fn fetch(&self, key: &str, locator: &str) -> Result<AudioClip> {
        debug!(key, locator, "Fetching voice clip over HTTP");
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| stream_error(locator, e))?
            .error_for_status()
            .map_err(|e| stream_error(locator, e))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| stream_error(locator, e))?;

        decode_fetched(key, locator, bytes.to_vec()).await
    }
}

/// Streaming source over the local filesystem
///
/// Accepts plain paths and `file://` locators.
#[derive(Debug, Clone, Default)]
pub struct FileStreamingSource;

#[async_trait]
impl StreamingSource for FileStreamingSource {
    async fn fetch(&self, key: &str, locator: &str) -> Result<AudioClip> {
        let path = locator.strip_prefix("file://").unwrap_or(locator);
        debug!(key, locator, "Reading voice clip from disk");
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| stream_error(locator, e))?;

        decode_fetched(key, locator, bytes).await
    }
}

/// Source picked by locator scheme
#[derive(Debug, Clone)]
pub struct AnyStreamingSource {
    http: HttpStreamingSource,
    file: FileStreamingSource,
}

impl AnyStreamingSource {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            http: HttpStreamingSource::with_timeout(timeout)?,
            file: FileStreamingSource,
        })
    }

    pub fn shared(timeout: Option<Duration>) -> Result<Arc<dyn StreamingSource>> {
        Ok(Arc::new(Self::new(timeout)?))
    }
}

#[async_trait]
impl StreamingSource for AnyStreamingSource {
    async fn fetch(&self, key: &str, locator: &str) -> Result<AudioClip> {
        if is_remote(locator) {
            self.http.fetch(key, locator).await
        } else {
            self.file.fetch(key, locator).await
        }
    }
}
