//! # Moodwave Common Library
//!
//! Shared code for the Moodwave generation pipeline:
//! - Error type and result alias
//! - TOML configuration loading and root folder resolution
//! - Event types (MoodwaveEvent) and the broadcast EventBus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, MoodwaveEvent, PlaybackState};
