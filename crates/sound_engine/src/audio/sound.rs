//! Sound instances
//!
//! [`Sound`] is the capability the manager drives. Backends implement it on
//! top of [`PlaybackState`], which carries the bookkeeping every concrete
//! sound needs: markers, play/pause flags, seek position, effective rate and
//! the pending-removal flag.

use crate::config::{SoundConfig, SoundOverrides};
use crate::events::OnceSignal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::rc::Rc;

/// Valid detune range in cents (one octave each way)
pub const DETUNE_RANGE: RangeInclusive<f32> = -1200.0..=1200.0;

/// Shared, reference-counted sound instance
pub type SoundHandle = Rc<RefCell<dyn Sound>>;

/// One-shot listener for the "ended" signal
pub type EndedCallback = Box<dyn FnOnce(&mut dyn Sound)>;

/// Identity comparison for handles
pub fn same_sound(a: &SoundHandle, b: &SoundHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Manager-wide rate and detune, pushed to every active sound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTuning {
    /// Global playback-rate multiplier
    pub rate: f32,
    /// Global detune in cents
    pub detune: f32,
}

impl GlobalTuning {
    /// Combine the global values with an instance's own rate and detune
    ///
    /// `instance_rate * rate * 2^((instance_detune + detune) / 1200)`
    pub fn effective_rate(&self, instance_rate: f32, instance_detune: f32) -> f32 {
        let cents = instance_detune + self.detune;
        instance_rate * self.rate * (cents / 1200.0).exp2()
    }
}

impl Default for GlobalTuning {
    fn default() -> Self {
        Self { rate: 1.0, detune: 0.0 }
    }
}

/// Named section of a sound
#[derive(Debug, Clone, PartialEq)]
pub struct SoundMarker {
    /// Unique name within one sound
    pub name: String,
    /// Offset into the asset, in seconds
    pub start: f64,
    /// Length in seconds; `None` plays to the end of the asset
    pub duration: Option<f64>,
    /// Settings layered over the sound's own config when the marker plays
    pub config: SoundOverrides,
}

impl SoundMarker {
    /// Create a marker that plays with the sound's own settings
    pub fn new(name: impl Into<String>, start: f64, duration: Option<f64>) -> Self {
        Self {
            name: name.into(),
            start,
            duration,
            config: SoundOverrides::default(),
        }
    }

    /// Attach marker-specific settings
    pub fn with_config(mut self, config: SoundOverrides) -> Self {
        self.config = config;
        self
    }
}

/// Capability object for one sound instance
///
/// Operations that may not apply in the current state return `false`
/// instead of failing. A sound never removes itself from its manager; it
/// raises [`is_pending_remove`](Sound::is_pending_remove) and waits to be
/// evicted by the next maintenance pass.
pub trait Sound {
    /// Asset key the sound was created from
    fn key(&self) -> &str;

    /// True once playback has logically ended for good or destroy was requested
    fn is_pending_remove(&self) -> bool;

    /// True while playing and not paused
    fn is_playing(&self) -> bool;

    /// True while paused
    fn is_paused(&self) -> bool;

    /// Start playback of a marker (by name) or of the whole sound
    fn play(&mut self, marker: Option<&str>, config: Option<SoundOverrides>) -> bool;

    /// Pause playback
    fn pause(&mut self) -> bool;

    /// Resume paused playback
    fn resume(&mut self) -> bool;

    /// Stop playback and rewind
    fn stop(&mut self) -> bool;

    /// Release the sound; safe to call more than once
    fn destroy(&mut self);

    /// Recompute the effective playback rate from new global tuning
    fn set_rate(&mut self, global: &GlobalTuning);

    /// Register a marker; fails if the name is taken
    fn add_marker(&mut self, marker: SoundMarker) -> bool;

    /// Advance playback state for one frame
    fn update(&mut self, time: f64, delta: f64);

    /// Register a callback fired once when playback ends
    fn once_ended(&mut self, callback: EndedCallback);
}

/// Bookkeeping shared by concrete sound implementations
pub struct PlaybackState {
    key: String,
    /// Settings the sound was created with
    pub base_config: SoundConfig,
    /// Settings of the playback currently in progress
    pub current_config: SoundConfig,
    markers: HashMap<String, SoundMarker>,
    current_marker: Option<String>,
    /// Position inside the current marker (or asset), in seconds
    pub seek: f64,
    /// Remaining start delay, in seconds
    pub pending_delay: f64,
    playing: bool,
    paused: bool,
    pending_remove: bool,
    global: GlobalTuning,
    total_rate: f32,
    ended: OnceSignal<EndedCallback>,
}

impl PlaybackState {
    /// Create state for a sound built from `key`
    pub fn new(key: impl Into<String>, config: SoundConfig) -> Self {
        let total_rate = GlobalTuning::default().effective_rate(config.rate, config.detune);
        Self {
            key: key.into(),
            current_config: config.clone(),
            base_config: config,
            markers: HashMap::new(),
            current_marker: None,
            seek: 0.0,
            pending_delay: 0.0,
            playing: false,
            paused: false,
            pending_remove: false,
            global: GlobalTuning::default(),
            total_rate,
            ended: OnceSignal::new(),
        }
    }

    /// Asset key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Playing and not paused
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pending removal
    pub fn is_pending_remove(&self) -> bool {
        self.pending_remove
    }

    /// Marker currently playing, if any
    pub fn current_marker(&self) -> Option<&SoundMarker> {
        self.current_marker.as_ref().and_then(|name| self.markers.get(name))
    }

    /// Look up a registered marker
    pub fn marker(&self, name: &str) -> Option<&SoundMarker> {
        self.markers.get(name)
    }

    /// Number of registered markers
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Effective playback rate after the last tuning change
    pub fn total_rate(&self) -> f32 {
        self.total_rate
    }

    /// Register a marker, refusing duplicates and empty names
    pub fn add_marker(&mut self, marker: SoundMarker) -> bool {
        if self.pending_remove || marker.name.is_empty() || self.markers.contains_key(&marker.name) {
            log::warn!("Sound '{}': rejected marker '{}'", self.key, marker.name);
            return false;
        }
        self.markers.insert(marker.name.clone(), marker);
        true
    }

    /// Begin playback; returns false for an unknown marker or a removed sound
    ///
    /// Settings are layered: the base config, then the marker's overrides, then
    /// the inline `config`. Each layer only replaces the fields it sets.
    pub fn begin(&mut self, marker: Option<&str>, config: Option<SoundOverrides>) -> bool {
        if self.pending_remove {
            return false;
        }

        let mut effective = self.base_config.clone();
        match marker {
            Some(name) => {
                let Some(found) = self.markers.get(name) else {
                    log::warn!("Sound '{}': no marker named '{}'", self.key, name);
                    return false;
                };
                effective = found.config.apply(&effective);
                self.current_marker = Some(name.to_string());
            }
            None => self.current_marker = None,
        }
        if let Some(config) = config {
            effective = config.apply(&effective);
        }

        self.seek = effective.seek.max(0.0);
        self.pending_delay = effective.delay.max(0.0);
        self.current_config = effective;
        self.playing = true;
        self.paused = false;
        self.recompute_rate();
        true
    }

    /// Pause if playing
    pub fn pause(&mut self) -> bool {
        if self.pending_remove || !self.playing {
            return false;
        }
        self.playing = false;
        self.paused = true;
        true
    }

    /// Resume if paused
    pub fn resume(&mut self) -> bool {
        if self.pending_remove || !self.paused {
            return false;
        }
        self.playing = true;
        self.paused = false;
        true
    }

    /// Stop and rewind if playing or paused
    pub fn stop(&mut self) -> bool {
        if self.pending_remove || !(self.playing || self.paused) {
            return false;
        }
        self.playing = false;
        self.paused = false;
        self.seek = 0.0;
        true
    }

    /// Flag for eviction; returns false if already flagged
    pub fn mark_pending_remove(&mut self) -> bool {
        if self.pending_remove {
            return false;
        }
        self.playing = false;
        self.paused = false;
        self.pending_remove = true;
        true
    }

    /// Store new global tuning and recompute the effective rate
    pub fn apply_global(&mut self, global: &GlobalTuning) {
        self.global = *global;
        self.recompute_rate();
    }

    fn recompute_rate(&mut self) {
        self.total_rate = self
            .global
            .effective_rate(self.current_config.rate, self.current_config.detune);
    }

    /// Playback reached its end without looping
    pub fn finish(&mut self) {
        self.playing = false;
        self.paused = false;
    }

    /// Subscribe to the ended signal
    pub fn once_ended(&mut self, callback: EndedCallback) {
        self.ended.subscribe(callback);
    }

    /// Detach ended listeners so the owning sound can fire them on itself
    pub fn take_ended_listeners(&mut self) -> Vec<EndedCallback> {
        self.ended.take()
    }

    /// Drop ended listeners without firing them
    pub fn clear_ended_listeners(&mut self) {
        self.ended.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_effective_rate_combines_rate_and_detune() {
        let global = GlobalTuning { rate: 2.0, detune: 0.0 };
        assert_relative_eq!(global.effective_rate(1.5, 0.0), 3.0);

        let octave_up = GlobalTuning { rate: 1.0, detune: 1200.0 };
        assert_relative_eq!(octave_up.effective_rate(1.0, 0.0), 2.0);

        let cancelled = GlobalTuning { rate: 1.0, detune: 600.0 };
        assert_relative_eq!(cancelled.effective_rate(1.0, -600.0), 1.0);
    }

    #[test]
    fn test_marker_registration_rejects_duplicates() {
        let mut state = PlaybackState::new("fx", SoundConfig::default());
        assert!(state.add_marker(SoundMarker::new("jump", 0.0, Some(0.5))));
        assert!(!state.add_marker(SoundMarker::new("jump", 1.0, Some(0.5))));
        assert!(!state.add_marker(SoundMarker::new("", 1.0, None)));
        assert_eq!(state.marker_count(), 1);
    }

    #[test]
    fn test_begin_unknown_marker_fails() {
        let mut state = PlaybackState::new("fx", SoundConfig::default());
        assert!(!state.begin(Some("missing"), None));
        assert!(!state.is_playing());
    }

    #[test]
    fn test_marker_config_and_inline_override() {
        let mut state = PlaybackState::new("fx", SoundConfig::default());
        let marker = SoundMarker::new("slow", 0.0, Some(1.0))
            .with_config(SoundOverrides::default().with_rate(0.5).with_loop(true));
        state.add_marker(marker);

        assert!(state.begin(Some("slow"), None));
        assert_relative_eq!(state.total_rate(), 0.5);
        assert_eq!(state.current_marker().map(|m| m.name.as_str()), Some("slow"));

        assert!(state.begin(Some("slow"), Some(SoundOverrides::default().with_rate(2.0))));
        assert_relative_eq!(state.total_rate(), 2.0);
        assert!(state.current_config.looped);
    }

    #[test]
    fn test_marker_without_overrides_keeps_base_config() {
        let base = SoundConfig::default().with_volume(0.3).with_loop(true);
        let mut state = PlaybackState::new("music", base.clone());
        state.add_marker(SoundMarker::new("intro", 0.0, Some(4.0)));

        assert!(state.begin(Some("intro"), Some(SoundOverrides::default().with_detune(100.0))));
        assert_eq!(state.current_config.volume, 0.3);
        assert!(state.current_config.looped);
        assert_eq!(state.current_config.detune, 100.0);
        assert_eq!(state.base_config, base);
    }

    #[test]
    fn test_pause_resume_stop_transitions() {
        let mut state = PlaybackState::new("music", SoundConfig::default());
        assert!(!state.pause());
        assert!(state.begin(None, Some(SoundOverrides::default().with_seek(3.0))));
        assert!(state.pause());
        assert!(!state.pause());
        assert!(state.is_paused());
        assert!(state.resume());
        assert!(state.is_playing());
        assert!(state.stop());
        assert_eq!(state.seek, 0.0);
        assert!(!state.stop());
    }

    #[test]
    fn test_pending_remove_blocks_playback() {
        let mut state = PlaybackState::new("music", SoundConfig::default());
        assert!(state.mark_pending_remove());
        assert!(!state.mark_pending_remove());
        assert!(!state.begin(None, None));
        assert!(!state.add_marker(SoundMarker::new("a", 0.0, None)));
    }

    #[test]
    fn test_apply_global_updates_total_rate() {
        let mut state = PlaybackState::new("music", SoundConfig::default().with_rate(1.5));
        state.apply_global(&GlobalTuning { rate: 2.0, detune: 0.0 });
        assert_relative_eq!(state.total_rate(), 3.0);
    }
}
