//! Headless audio backend
//!
//! Produces no output. Sounds advance on the frame clock passed to
//! `update`, honor markers, looping, delays and the effective rate, and fire
//! their "ended" signal when they run out. Useful on machines without an
//! audio device and for driving the manager in tests.

use super::SoundBackend;
use crate::audio::sound::{EndedCallback, GlobalTuning, PlaybackState, Sound, SoundHandle, SoundMarker};
use crate::audio::AudioError;
use crate::config::{SoundConfig, SoundOverrides};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Backend that simulates playback without an output device
pub struct NullBackend {
    /// Known assets and their lengths in seconds
    durations: HashMap<String, f64>,
    /// Clock gate shared with every sound; set while blurred
    suspended: Rc<Cell<bool>>,
    muted: bool,
    volume: f32,
    created: usize,
}

impl NullBackend {
    /// Create a backend with no known assets
    pub fn new() -> Self {
        Self {
            durations: HashMap::new(),
            suspended: Rc::new(Cell::new(false)),
            muted: false,
            volume: 1.0,
            created: 0,
        }
    }

    /// Make an asset available with the given length in seconds
    pub fn register_asset(&mut self, key: impl Into<String>, duration: f64) {
        self.durations.insert(key.into(), duration.max(0.0));
    }

    /// Builder form of [`register_asset`](Self::register_asset)
    pub fn with_asset(mut self, key: impl Into<String>, duration: f64) -> Self {
        self.register_asset(key, duration);
        self
    }

    /// Number of sounds created so far
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Last global mute flag received
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Last global volume received
    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn create_sound(&mut self, key: &str, config: &SoundConfig) -> Result<SoundHandle, AudioError> {
        let duration = *self
            .durations
            .get(key)
            .ok_or_else(|| AudioError::AssetNotFound(key.to_string()))?;

        self.created += 1;
        let sound = NullSound::new(key, duration, config.clone(), Rc::clone(&self.suspended));
        Ok(Rc::new(RefCell::new(sound)))
    }

    fn on_blur(&mut self) {
        self.suspended.set(true);
        log::debug!("Null audio backend suspended");
    }

    fn on_focus(&mut self) {
        self.suspended.set(false);
        log::debug!("Null audio backend resumed");
    }

    fn is_suspended(&self) -> bool {
        self.suspended.get()
    }

    fn on_mute_changed(&mut self, mute: bool) {
        self.muted = mute;
    }

    fn on_volume_changed(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn shutdown(&mut self) {
        self.durations.clear();
        log::info!("Null audio backend shutdown");
    }
}

/// Sound instance of the [`NullBackend`]
pub struct NullSound {
    state: PlaybackState,
    duration: f64,
    suspended: Rc<Cell<bool>>,
}

impl NullSound {
    fn new(key: &str, duration: f64, config: SoundConfig, suspended: Rc<Cell<bool>>) -> Self {
        Self {
            state: PlaybackState::new(key, config),
            duration,
            suspended,
        }
    }

    /// Playback bookkeeping
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Length of the whole asset in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Length of the section being played
    fn section_length(&self) -> f64 {
        match self.state.current_marker() {
            Some(marker) => marker
                .duration
                .unwrap_or((self.duration - marker.start).max(0.0)),
            None => self.duration,
        }
    }

    fn fire_ended(&mut self) {
        log::debug!("Sound '{}' ended", self.state.key());
        for listener in self.state.take_ended_listeners() {
            listener(self);
        }
    }
}

impl Sound for NullSound {
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
        self.state.begin(marker, config)
    }

    fn pause(&mut self) -> bool {
        self.state.pause()
    }

    fn resume(&mut self) -> bool {
        self.state.resume()
    }

    fn stop(&mut self) -> bool {
        self.state.stop()
    }

    fn destroy(&mut self) {
        if self.state.mark_pending_remove() {
            self.state.clear_ended_listeners();
            log::debug!("Sound '{}' destroyed", self.state.key());
        }
    }

    fn set_rate(&mut self, global: &GlobalTuning) {
        self.state.apply_global(global);
    }

    fn add_marker(&mut self, marker: SoundMarker) -> bool {
        self.state.add_marker(marker)
    }

    fn update(&mut self, _time: f64, delta: f64) {
        if !self.state.is_playing() || self.suspended.get() {
            return;
        }

        let mut step = delta.max(0.0);
        if self.state.pending_delay > 0.0 {
            let waited = step.min(self.state.pending_delay);
            self.state.pending_delay -= waited;
            step -= waited;
            if step <= 0.0 {
                return;
            }
        }

        self.state.seek += step * f64::from(self.state.total_rate());

        let length = self.section_length();
        if self.state.seek < length {
            return;
        }

        if self.state.current_config.looped && length > 0.0 {
            self.state.seek %= length;
        } else {
            self.state.seek = length;
            self.state.finish();
            self.fire_ended();
        }
    }

    fn once_ended(&mut self, callback: EndedCallback) {
        self.state.once_ended(callback);
    }
}
