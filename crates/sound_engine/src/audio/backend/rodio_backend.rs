//! Rodio audio backend implementation
//!
//! Uses the Rodio library for cross-platform audio playback.
//! Rodio is pure Rust and supports WAV, OGG Vorbis, MP3, and FLAC formats.
//!
//! # Example
//!
//! ```no_run
//! use sound_engine::audio::backend::{RodioBackend, SoundBackend};
//! use sound_engine::audio::AudioAsset;
//!
//! let mut backend = RodioBackend::new();
//! backend.initialize().unwrap();
//! backend.register_asset("explosion", AudioAsset::from_file("resources/audio/explosion.ogg").unwrap());
//! ```

use super::SoundBackend;
use crate::audio::sound::{EndedCallback, GlobalTuning, PlaybackState, Sound, SoundHandle, SoundMarker};
use crate::audio::{AudioAsset, AudioError};
use crate::config::{SoundConfig, SoundOverrides};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Cursor;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

/// Global mix values every voice multiplies in
#[derive(Debug, Clone, Copy)]
struct MasterMix {
    mute: bool,
    volume: f32,
}

/// Output side of one sound: the sink for the current playback plus the
/// instance's own mix settings
struct Voice {
    sink: Option<Sink>,
    volume: f32,
    mute: bool,
    /// Paused by a blur rather than by the sound itself
    suspended: bool,
}

impl Voice {
    fn apply_mix(&self, master: MasterMix) {
        if let Some(sink) = &self.sink {
            let audible = !(master.mute || self.mute);
            sink.set_volume(if audible { self.volume * master.volume } else { 0.0 });
        }
    }

    fn suspend(&mut self) {
        if let Some(sink) = &self.sink {
            if !sink.is_paused() {
                sink.pause();
                self.suspended = true;
            }
        }
    }

    fn wake(&mut self) {
        if self.suspended {
            if let Some(sink) = &self.sink {
                sink.play();
            }
            self.suspended = false;
        }
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.suspended = false;
    }
}

/// Rodio-based audio backend
pub struct RodioBackend {
    /// Audio output stream (must be kept alive)
    _output_stream: Option<OutputStream>,
    /// Output stream handle for creating sinks
    stream_handle: Option<OutputStreamHandle>,
    /// Encoded assets by key
    assets: HashMap<String, AudioAsset>,
    /// Voices of sounds that may still be alive
    voices: Vec<Weak<RefCell<Voice>>>,
    master: Rc<Cell<MasterMix>>,
    suspended: bool,
    /// Initialization state
    initialized: bool,
}

impl RodioBackend {
    /// Create a new Rodio backend
    pub fn new() -> Self {
        Self {
            _output_stream: None,
            stream_handle: None,
            assets: HashMap::new(),
            voices: Vec::new(),
            master: Rc::new(Cell::new(MasterMix { mute: false, volume: 1.0 })),
            suspended: false,
            initialized: false,
        }
    }

    /// Open the default output device
    pub fn initialize(&mut self) -> Result<(), AudioError> {
        if self.initialized {
            return Ok(());
        }

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AudioError::BackendInitFailed(format!("Failed to create audio output: {}", e)))?;

        self._output_stream = Some(stream);
        self.stream_handle = Some(stream_handle);
        self.initialized = true;

        log::info!("Rodio audio backend initialized");
        Ok(())
    }

    /// Check if backend is initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Make an encoded asset available under a key
    pub fn register_asset(&mut self, key: impl Into<String>, asset: AudioAsset) {
        self.assets.insert(key.into(), asset);
    }

    /// Visit every voice still owned by a sound, dropping dead entries
    fn for_each_voice(&mut self, mut f: impl FnMut(&mut Voice)) {
        self.voices.retain(|weak| match weak.upgrade() {
            Some(voice) => {
                if let Ok(mut voice) = voice.try_borrow_mut() {
                    f(&mut *voice);
                }
                true
            }
            None => false,
        });
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SoundBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn create_sound(&mut self, key: &str, config: &SoundConfig) -> Result<SoundHandle, AudioError> {
        let stream_handle = self.stream_handle.clone().ok_or(AudioError::BackendNotInitialized)?;
        let asset = self
            .assets
            .get(key)
            .ok_or_else(|| AudioError::AssetNotFound(key.to_string()))?;

        let voice = Rc::new(RefCell::new(Voice {
            sink: None,
            volume: config.volume,
            mute: config.mute,
            suspended: false,
        }));
        self.voices.push(Rc::downgrade(&voice));

        let sound = RodioSound {
            state: PlaybackState::new(key, config.clone()),
            data: asset.shared_data(),
            stream_handle,
            voice,
            master: Rc::clone(&self.master),
        };
        Ok(Rc::new(RefCell::new(sound)))
    }

    fn on_blur(&mut self) {
        self.suspended = true;
        self.for_each_voice(Voice::suspend);
    }

    fn on_focus(&mut self) {
        self.suspended = false;
        self.for_each_voice(Voice::wake);
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn on_mute_changed(&mut self, mute: bool) {
        let mut master = self.master.get();
        master.mute = mute;
        self.master.set(master);
        self.for_each_voice(|voice| voice.apply_mix(master));
    }

    fn on_volume_changed(&mut self, volume: f32) {
        let mut master = self.master.get();
        master.volume = volume;
        self.master.set(master);
        self.for_each_voice(|voice| voice.apply_mix(master));
    }

    fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }

        self.for_each_voice(Voice::release);
        self.voices.clear();
        self.stream_handle = None;
        self._output_stream = None;
        self.initialized = false;

        log::info!("Rodio audio backend shutdown");
    }
}

/// Sound instance of the [`RodioBackend`]
///
/// Each `play` builds a fresh sink, since a stopped rodio sink cannot be reused.
pub struct RodioSound {
    state: PlaybackState,
    data: Arc<[u8]>,
    stream_handle: OutputStreamHandle,
    voice: Rc<RefCell<Voice>>,
    master: Rc<Cell<MasterMix>>,
}

impl RodioSound {
    /// Playback bookkeeping
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    fn build_source(&self) -> Result<Box<dyn Source<Item = i16> + Send>, AudioError> {
        let decoder = Decoder::new(Cursor::new(Arc::clone(&self.data)))
            .map_err(|e| AudioError::PlaybackFailed(format!("Failed to decode audio: {}", e)))?;

        let (start, length) = match self.state.current_marker() {
            Some(marker) => (marker.start, marker.duration),
            None => (0.0, None),
        };
        let offset = Duration::from_secs_f64((start + self.state.seek).max(0.0));
        let delay = Duration::from_secs_f64(self.state.pending_delay);

        let skipped = decoder.skip_duration(offset);
        let section: Box<dyn Source<Item = i16> + Send> = match length {
            Some(length) => {
                let remaining = (length - self.state.seek).max(0.0);
                Box::new(skipped.take_duration(Duration::from_secs_f64(remaining)))
            }
            None => Box::new(skipped),
        };

        let source: Box<dyn Source<Item = i16> + Send> = if self.state.current_config.looped {
            Box::new(section.buffered().repeat_infinite().delay(delay))
        } else {
            Box::new(section.delay(delay))
        };
        Ok(source)
    }

    fn start_sink(&mut self) -> Result<(), AudioError> {
        let source = self.build_source()?;
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::PlaybackFailed(format!("Failed to create sink: {}", e)))?;
        sink.set_speed(self.state.total_rate());
        sink.append(source);

        let mut voice = self.voice.borrow_mut();
        voice.release();
        voice.volume = self.state.current_config.volume;
        voice.mute = self.state.current_config.mute;
        voice.sink = Some(sink);
        voice.apply_mix(self.master.get());
        Ok(())
    }

    fn fire_ended(&mut self) {
        log::debug!("Sound '{}' ended", self.state.key());
        for listener in self.state.take_ended_listeners() {
            listener(self);
        }
    }
}

impl Sound for RodioSound {
    fn key(&self) -> &str {
        self.state.key()
    }

    fn is_pending_remove(&self) -> bool {
        self.state.is_pending_remove()
    }

    fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    fn play(&mut self, marker: Option<&str>, config: Option<SoundOverrides>) -> bool {
        if !self.state.begin(marker, config) {
            return false;
        }
        match self.start_sink() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Sound '{}' failed to start: {}", self.state.key(), e);
                self.state.finish();
                false
            }
        }
    }

    fn pause(&mut self) -> bool {
        if !self.state.pause() {
            return false;
        }
        let mut voice = self.voice.borrow_mut();
        if let Some(sink) = &voice.sink {
            sink.pause();
        }
        voice.suspended = false;
        true
    }

    fn resume(&mut self) -> bool {
        if !self.state.resume() {
            return false;
        }
        if let Some(sink) = &self.voice.borrow().sink {
            sink.play();
        }
        true
    }

    fn stop(&mut self) -> bool {
        if !self.state.stop() {
            return false;
        }
        self.voice.borrow_mut().release();
        true
    }

    fn destroy(&mut self) {
        if self.state.mark_pending_remove() {
            self.voice.borrow_mut().release();
            self.state.clear_ended_listeners();
            log::debug!("Sound '{}' destroyed", self.state.key());
        }
    }

    fn set_rate(&mut self, global: &GlobalTuning) {
        self.state.apply_global(global);
        if let Some(sink) = &self.voice.borrow().sink {
            sink.set_speed(self.state.total_rate());
        }
    }

    fn add_marker(&mut self, marker: SoundMarker) -> bool {
        self.state.add_marker(marker)
    }

    fn update(&mut self, _time: f64, delta: f64) {
        if !self.state.is_playing() {
            return;
        }

        let finished = {
            let voice = self.voice.borrow();
            if voice.suspended {
                return;
            }
            voice.sink.as_ref().map_or(true, Sink::empty)
        };

        if finished {
            self.voice.borrow_mut().release();
            self.state.finish();
            self.fire_ended();
        } else {
            self.state.seek += delta.max(0.0) * f64::from(self.state.total_rate());
        }
    }

    fn once_ended(&mut self, callback: EndedCallback) {
        self.state.once_ended(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_initialization() {
        let mut backend = RodioBackend::new();
        assert!(!backend.is_initialized());

        // May fail in CI/test environments without audio device
        if backend.initialize().is_ok() {
            assert!(backend.is_initialized());
            backend.shutdown();
            assert!(!backend.is_initialized());
        }
    }

    #[test]
    fn test_double_initialization() {
        let mut backend = RodioBackend::new();

        if backend.initialize().is_ok() {
            assert!(backend.initialize().is_ok());
            backend.shutdown();
        }
    }

    #[test]
    fn test_create_without_initialization() {
        let mut backend = RodioBackend::new();
        backend.register_asset("beep", AudioAsset::from_bytes(b"RIFF....WAVE").unwrap());

        let result = backend.create_sound("beep", &SoundConfig::default());
        assert!(matches!(result, Err(AudioError::BackendNotInitialized)));
    }

    #[test]
    fn test_unknown_asset() {
        let mut backend = RodioBackend::new();

        if backend.initialize().is_ok() {
            let result = backend.create_sound("missing", &SoundConfig::default());
            assert!(matches!(result, Err(AudioError::AssetNotFound(_))));
            backend.shutdown();
        }
    }

    #[test]
    fn test_undecodable_asset_does_not_play() {
        let mut backend = RodioBackend::new();

        if backend.initialize().is_ok() {
            backend.register_asset("junk", AudioAsset::from_bytes(b"RIFF not really a wave").unwrap());
            let sound = backend.create_sound("junk", &SoundConfig::default()).unwrap();
            assert!(!sound.borrow_mut().play(None, None));
            assert!(!sound.borrow().is_playing());
            backend.shutdown();
        }
    }

    #[test]
    fn test_dead_voices_are_pruned() {
        let mut backend = RodioBackend::new();

        if backend.initialize().is_ok() {
            backend.register_asset("beep", AudioAsset::from_bytes(b"RIFF....WAVE").unwrap());
            let sound = backend.create_sound("beep", &SoundConfig::default()).unwrap();
            assert_eq!(backend.voices.len(), 1);
            drop(sound);
            backend.on_volume_changed(0.5);
            assert!(backend.voices.is_empty());
            backend.shutdown();
        }
    }
}
