//! # voxmix Common Library
//!
//! Shared code for the voxmix audio crates including:
//! - Channel identifiers (`ChannelId`)
//! - Linear <-> logarithmic volume conversion
//! - Audio settings loading
//! - Event types (`VoxEvent` enum)

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod volume;

pub use channel::ChannelId;
pub use error::{Error, Result};
