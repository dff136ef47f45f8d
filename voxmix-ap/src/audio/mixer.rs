//! Mixer backend: named-parameter control surface
//!
//! The channel manager writes one control value (dB) per channel, keyed by
//! the channel's stable name. Backends use interior mutability so a single
//! instance can be shared with other writers; reads always go to the backend.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Named-parameter mixer control surface
pub trait MixerBackend: Send + Sync {
    /// Write a control value (dB)
    fn set_parameter(&self, name: &str, control_value: f32);

    /// Read a control value; None if the parameter was never exposed/written
    fn get_parameter(&self, name: &str) -> Option<f32>;
}

/// In-process mixer backed by a parameter map
#[derive(Debug, Default)]
pub struct InMemoryMixer {
    parameters: Mutex<HashMap<String, f32>>,
}

impl InMemoryMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all parameters, sorted by name
    pub fn snapshot(&self) -> Vec<(String, f32)> {
        let parameters = self.parameters.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<(String, f32)> =
            parameters.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl MixerBackend for InMemoryMixer {
    fn set_parameter(&self, name: &str, control_value: f32) {
        self.parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), control_value);
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        self.parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mixer = InMemoryMixer::new();
        assert_eq!(mixer.get_parameter("Music"), None);

        mixer.set_parameter("Music", -6.0);
        mixer.set_parameter("Voice", -80.0);
        assert_eq!(mixer.get_parameter("Music"), Some(-6.0));

        let snapshot = mixer.snapshot();
        assert_eq!(snapshot, vec![("Music".to_string(), -6.0), ("Voice".to_string(), -80.0)]);
    }
}
