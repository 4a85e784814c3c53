//! Audio backend implementations
//!
//! A backend decides how sounds actually render. The manager only asks it to
//! create sound instances and tells it about focus and global mix changes.
//!
//! Available backends:
//! - [`NullBackend`]: headless, advances sounds on a simulated clock
//! - `RodioBackend`: device output through rodio (feature `rodio`)

pub mod null_backend;
#[cfg(feature = "rodio")]
pub mod rodio_backend;

pub use null_backend::{NullBackend, NullSound};
#[cfg(feature = "rodio")]
pub use rodio_backend::{RodioBackend, RodioSound};

use crate::audio::{AudioError, SoundHandle};
use crate::config::SoundConfig;

/// Audio backend trait for platform abstraction
///
/// # Threading
/// Not Send + Sync: the sound manager and every sound it owns live on one thread.
pub trait SoundBackend {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Create a new sound instance for an asset key
    ///
    /// Each call must return a fresh instance.
    fn create_sound(&mut self, key: &str, config: &SoundConfig) -> Result<SoundHandle, AudioError>;

    /// Host lost focus while the pause-on-blur policy is active
    fn on_blur(&mut self) {}

    /// Host regained focus while the pause-on-blur policy is active
    fn on_focus(&mut self) {}

    /// True while output is suspended by a blur
    fn is_suspended(&self) -> bool {
        false
    }

    /// Global mute flag changed
    fn on_mute_changed(&mut self, _mute: bool) {}

    /// Global volume changed
    fn on_volume_changed(&mut self, _volume: f32) {}

    /// Release output resources; the backend is not used afterwards
    fn shutdown(&mut self) {}
}

impl<B: SoundBackend + ?Sized> SoundBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_sound(&mut self, key: &str, config: &SoundConfig) -> Result<SoundHandle, AudioError> {
        (**self).create_sound(key, config)
    }

    fn on_blur(&mut self) {
        (**self).on_blur();
    }

    fn on_focus(&mut self) {
        (**self).on_focus();
    }

    fn is_suspended(&self) -> bool {
        (**self).is_suspended()
    }

    fn on_mute_changed(&mut self, mute: bool) {
        (**self).on_mute_changed(mute);
    }

    fn on_volume_changed(&mut self, volume: f32) {
        (**self).on_volume_changed(volume);
    }

    fn shutdown(&mut self) {
        (**self).shutdown();
    }
}

/// Create the default backend for the platform
///
/// Uses device output when the `rodio` feature is enabled and an output device
/// opens, and falls back to the headless backend otherwise.
pub fn create_default_backend() -> Box<dyn SoundBackend> {
    #[cfg(feature = "rodio")]
    {
        let mut backend = RodioBackend::new();
        match backend.initialize() {
            Ok(()) => return Box::new(backend),
            Err(e) => log::warn!("Falling back to null audio backend: {}", e),
        }
    }
    Box::new(NullBackend::new())
}
