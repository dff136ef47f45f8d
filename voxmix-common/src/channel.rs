//! Audio channel identifiers
//!
//! The channel set is closed: Music, SFX and Voice. Each channel has a stable
//! string name which doubles as the mixer parameter key.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output channel category
///
/// Ordering follows declaration order so iteration over [`ChannelId::ALL`]
/// is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    Music,
    #[serde(rename = "SFX")]
    Sfx,
    Voice,
}

impl ChannelId {
    /// Every channel, in iteration order
    pub const ALL: [ChannelId; 3] = [ChannelId::Music, ChannelId::Sfx, ChannelId::Voice];

    /// Number of channels
    pub const COUNT: usize = Self::ALL.len();

    /// Stable name, used as the mixer parameter key
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChannelId::Music => "Music",
            ChannelId::Sfx => "SFX",
            ChannelId::Voice => "Voice",
        }
    }

    /// Dense index for per-channel storage
    pub const fn index(&self) -> usize {
        match self {
            ChannelId::Music => 0,
            ChannelId::Sfx => 1,
            ChannelId::Voice => 2,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ChannelId::ALL
            .into_iter()
            .find(|channel| channel.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidChannel(s.to_string()))
    }
}

impl TryFrom<usize> for ChannelId {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        ChannelId::ALL
            .get(index)
            .copied()
            .ok_or_else(|| Error::InvalidChannel(format!("index {}", index)))
    }
}
