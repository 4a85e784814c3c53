//! # Sound Engine
//!
//! Lifecycle management for a collection of playing sounds.
//!
//! ## Features
//!
//! - **Sound Manager**: Adds, plays, evicts and broadcasts to live sound instances
//! - **Global Tuning**: Manager-wide rate, detune, mute and volume
//! - **Focus Handling**: Optional pause on host blur, resume on focus
//! - **Audio Sprites**: Named sections of one asset, loaded from JSON sprite maps
//! - **Pluggable Backends**: Headless null backend, or `rodio` output with the `rodio` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use sound_engine::prelude::*;
//!
//! fn main() -> Result<(), AudioError> {
//!     let mut host = EventSystem::new();
//!     let backend = NullBackend::new().with_asset("laser", 0.25);
//!     let mut manager = SoundManager::new(backend, &mut host, SoundManagerConfig::default())?;
//!
//!     manager.play("laser", None)?;
//!     manager.update(0.5, 0.5)?;
//!     assert!(!manager.is_playing("laser"));
//!
//!     // Finished one-shots are evicted on the following update
//!     manager.update(0.6, 0.1)?;
//!     assert!(manager.is_empty());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod audio;
pub mod config;
pub mod events;
pub mod foundation;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        audio::{
            backend::{create_default_backend, NullBackend, SoundBackend},
            AudioError, GlobalTuning, PlayExtra, Sound, SoundHandle, SoundManager, SoundMarker,
            SpriteMapCache,
        },
        config::{Config, SoundConfig, SoundManagerConfig, SoundOverrides},
        events::{Event, EventSystem, EventType},
        foundation::time::FrameClock,
    };
}
