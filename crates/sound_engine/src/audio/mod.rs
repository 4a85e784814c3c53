//! Audio system
//!
//! The sound collection manager and the pieces it is built from:
//! - [`SoundManager`]: owns live sounds, global tuning and the per-frame pass
//! - [`Sound`]: capability object for one playing instance
//! - [`backend::SoundBackend`]: creates concrete sounds and reacts to focus changes
//! - [`AudioSpriteCache`]: sprite-map lookup used by audio sprites

pub mod asset;
pub mod backend;
pub mod manager;
pub mod sound;
pub mod sprite;

#[cfg(test)]
mod tests;

pub use asset::{AudioAsset, AudioFormat};
pub use manager::{PlayExtra, SoundManager, SoundManagerId};
pub use sound::{
    same_sound, EndedCallback, GlobalTuning, PlaybackState, Sound, SoundHandle, SoundMarker, DETUNE_RANGE,
};
pub use sprite::{AudioSpriteCache, AudioSpriteData, SpriteEntry, SpriteMapCache};

use thiserror::Error;

/// Audio system errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The manager was destroyed and can no longer be used
    #[error("Sound manager has been destroyed")]
    ManagerDestroyed,

    /// No sprite map is cached for the requested key
    #[error("No audio sprite data cached for key '{0}'")]
    MissingAudioSprite(String),

    /// The backend does not know the requested asset
    #[error("Audio asset not found: {0}")]
    AssetNotFound(String),

    /// The backend returned a sound that is already registered
    #[error("Sound '{0}' is already registered with this manager")]
    DuplicateHandle(String),

    /// A global parameter was given an out-of-range value
    #[error("Invalid value for {name}: {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: f32,
    },

    /// Backend was used before it was initialized
    #[error("Audio backend not initialized")]
    BackendNotInitialized,

    /// Backend initialization failed
    #[error("Audio backend initialization failed: {0}")]
    BackendInitFailed(String),

    /// Backend could not start playback
    #[error("Audio playback failed: {0}")]
    PlaybackFailed(String),

    /// Audio asset bytes could not be used
    #[error("Invalid audio asset: {0}")]
    InvalidAsset(String),

    /// Audio sprite JSON could not be parsed
    #[error("Invalid audio sprite data: {0}")]
    InvalidSpriteData(String),
}
