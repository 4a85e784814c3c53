//! Sound collection manager
//!
//! Owns every live sound created through its backend, keeps the global mix
//! (mute, volume, rate, detune) consistent across them and runs the
//! per-frame maintenance pass that evicts finished sounds.
//!
//! # Lifecycle
//!
//! Sounds are registered when created with [`SoundManager::add`]. A sound that
//! finishes for good or is destroyed flags itself as pending removal; the next
//! [`SoundManager::update`] evicts it and it is never visited again. Sounds
//! started through [`SoundManager::play`] destroy themselves when they end, so
//! callers never have to track them.
//!
//! # Example
//!
//! ```
//! use sound_engine::audio::backend::NullBackend;
//! use sound_engine::audio::SoundManager;
//! use sound_engine::config::SoundManagerConfig;
//! use sound_engine::events::EventSystem;
//!
//! let mut host_events = EventSystem::new();
//! let backend = NullBackend::new().with_asset("explosion", 1.5);
//! let mut sounds = SoundManager::new(backend, &mut host_events, SoundManagerConfig::default()).unwrap();
//!
//! sounds.play("explosion", None).unwrap();
//! sounds.set_rate(1.25).unwrap();
//! sounds.update(0.016, 0.016).unwrap();
//! assert_eq!(sounds.len(), 1);
//! ```

use crate::audio::backend::SoundBackend;
use crate::audio::sound::{same_sound, GlobalTuning, Sound, SoundHandle, SoundMarker, DETUNE_RANGE};
use crate::audio::sprite::{AudioSpriteCache, SpriteMapCache};
use crate::audio::AudioError;
use crate::config::{SoundConfig, SoundManagerConfig, SoundOverrides};
use crate::events::{Event, EventArg, EventHandler, EventSystem, EventType, HandlerId};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_MANAGER_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a manager as the source of its notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundManagerId(u32);

impl SoundManagerId {
    fn next() -> Self {
        Self(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id as carried in event `source` arguments
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Extra input for the one-shot [`SoundManager::play`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlayExtra {
    /// Register this marker and play it by name
    Marker(SoundMarker),
    /// Play the whole sound with these settings layered over its own
    Config(SoundOverrides),
}

/// Shared between the manager and its focus relays
struct FocusPolicy {
    pause_on_blur: Cell<bool>,
    active: Cell<bool>,
}

/// Host focus handler; forwards to the backend while the policy allows it
struct FocusRelay {
    backend: Weak<RefCell<dyn SoundBackend>>,
    policy: Weak<FocusPolicy>,
}

impl EventHandler for FocusRelay {
    fn on_event(&mut self, event: &Event) -> bool {
        let Some(policy) = self.policy.upgrade() else {
            return false;
        };
        // Flag is read per signal so runtime toggles apply immediately
        if !policy.active.get() || !policy.pause_on_blur.get() {
            return false;
        }
        let Some(backend) = self.backend.upgrade() else {
            return false;
        };
        let Ok(mut backend) = backend.try_borrow_mut() else {
            log::warn!("Audio backend busy, dropped '{}' signal", event.kind());
            return false;
        };

        match event.event_type {
            EventType::FocusLost => backend.on_blur(),
            EventType::FocusGained => backend.on_focus(),
            _ => {}
        }
        false
    }
}

/// Manager for a collection of live sounds
pub struct SoundManager {
    id: SoundManagerId,
    backend: Rc<RefCell<dyn SoundBackend>>,
    sprite_cache: Box<dyn AudioSpriteCache>,
    events: EventSystem,
    policy: Rc<FocusPolicy>,
    focus_handlers: Vec<HandlerId>,
    sounds: Vec<SoundHandle>,
    mute: bool,
    volume: f32,
    rate: f32,
    detune: f32,
    time: f64,
    destroyed: bool,
}

impl SoundManager {
    /// Create a manager around a backend and subscribe to the host's focus signals
    ///
    /// # Errors
    /// `InvalidParameter` if the config holds an out-of-range volume, rate or detune.
    pub fn new<B: SoundBackend + 'static>(
        backend: B,
        host_events: &mut EventSystem,
        config: SoundManagerConfig,
    ) -> Result<Self, AudioError> {
        let volume = check_volume(config.volume)?;
        let rate = check_rate(config.rate)?;
        let detune = check_detune(config.detune)?;

        let backend: Rc<RefCell<dyn SoundBackend>> = Rc::new(RefCell::new(backend));
        let policy = Rc::new(FocusPolicy {
            pause_on_blur: Cell::new(config.pause_on_blur),
            active: Cell::new(true),
        });

        let focus_handlers = [EventType::FocusLost, EventType::FocusGained]
            .into_iter()
            .map(|event_type| {
                let relay = FocusRelay {
                    backend: Rc::downgrade(&backend),
                    policy: Rc::downgrade(&policy),
                };
                host_events.register_handler(event_type, Box::new(relay))
            })
            .collect();

        if config.mute || volume != 1.0 {
            let mut backend = backend.borrow_mut();
            backend.on_mute_changed(config.mute);
            backend.on_volume_changed(volume);
        }

        let id = SoundManagerId::next();
        log::info!("Sound manager {} created on '{}' backend", id.raw(), backend.borrow().name());

        Ok(Self {
            id,
            backend,
            sprite_cache: Box::new(SpriteMapCache::new()),
            events: EventSystem::new(),
            policy,
            focus_handlers,
            sounds: Vec::new(),
            mute: config.mute,
            volume,
            rate,
            detune,
            time: 0.0,
            destroyed: false,
        })
    }

    /// Use a different sprite-map source
    pub fn with_sprite_cache(mut self, cache: impl AudioSpriteCache + 'static) -> Self {
        self.sprite_cache = Box::new(cache);
        self
    }

    /// Replace the sprite-map source
    pub fn set_sprite_cache(&mut self, cache: Box<dyn AudioSpriteCache>) {
        self.sprite_cache = cache;
    }

    /// Identifier carried in this manager's notifications
    pub fn id(&self) -> SoundManagerId {
        self.id
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.borrow().name()
    }

    /// True while the backend is suspended by a blur
    pub fn is_suspended(&self) -> bool {
        self.backend.borrow().is_suspended()
    }

    /// Notification channel for value-changed events
    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    /// Mutable notification channel, for registering listeners
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Whether focus changes reach the backend
    pub fn pause_on_blur(&self) -> bool {
        self.policy.pause_on_blur.get()
    }

    /// Enable or disable forwarding of focus changes; takes effect at the next signal
    pub fn set_pause_on_blur(&mut self, enabled: bool) {
        self.policy.pause_on_blur.set(enabled);
    }

    /// Remove the focus relays from the host's event system
    pub fn detach_from_host(&mut self, host_events: &mut EventSystem) {
        for id in self.focus_handlers.drain(..) {
            host_events.unregister_handler(id);
        }
    }

    /// Whether [`destroy`](Self::destroy) has run
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn ensure_alive(&self) -> Result<(), AudioError> {
        if self.destroyed {
            Err(AudioError::ManagerDestroyed)
        } else {
            Ok(())
        }
    }

    /// Current global tuning as pushed to sounds
    pub fn tuning(&self) -> GlobalTuning {
        GlobalTuning {
            rate: self.rate,
            detune: self.detune,
        }
    }

    /// Create a sound for `key` through the backend and register it
    ///
    /// The new sound receives the current global tuning before it is returned.
    pub fn add(&mut self, key: &str, config: Option<SoundConfig>) -> Result<SoundHandle, AudioError> {
        self.ensure_alive()?;
        let config = config.unwrap_or_default();
        let sound = self.backend.borrow_mut().create_sound(key, &config)?;

        if self.sounds.iter().any(|existing| same_sound(existing, &sound)) {
            return Err(AudioError::DuplicateHandle(key.to_string()));
        }

        sound.borrow_mut().set_rate(&self.tuning());
        self.sounds.push(Rc::clone(&sound));
        log::debug!("Added sound '{}' ({} live)", key, self.sounds.len());
        Ok(sound)
    }

    /// Create a sound for an audio sprite and register one marker per clip
    ///
    /// # Errors
    /// `MissingAudioSprite` if the sprite cache has no map for `key`; nothing is
    /// registered in that case.
    pub fn add_audio_sprite(&mut self, key: &str, config: Option<SoundConfig>) -> Result<SoundHandle, AudioError> {
        self.ensure_alive()?;
        let markers: Vec<SoundMarker> = self
            .sprite_cache
            .sprite_map(key)
            .ok_or_else(|| AudioError::MissingAudioSprite(key.to_string()))?
            .spritemap
            .iter()
            .map(|(name, entry)| entry.to_marker(name))
            .collect();

        let sound = self.add(key, config)?;
        {
            let mut sound = sound.borrow_mut();
            for marker in markers {
                sound.add_marker(marker);
            }
        }
        Ok(sound)
    }

    /// Fire-and-forget playback; the sound destroys itself when it ends
    ///
    /// Returns whether playback started. A sound that fails to start is
    /// destroyed right away and evicted by the next [`update`](Self::update).
    pub fn play(&mut self, key: &str, extra: Option<PlayExtra>) -> Result<bool, AudioError> {
        let sound = self.add(key, None)?;
        let mut sound = sound.borrow_mut();
        sound.once_ended(Box::new(|sound: &mut dyn Sound| sound.destroy()));

        let started = match extra {
            Some(PlayExtra::Marker(marker)) => {
                let name = marker.name.clone();
                sound.add_marker(marker);
                sound.play(Some(&name), None)
            }
            Some(PlayExtra::Config(config)) => sound.play(None, Some(config)),
            None => sound.play(None, None),
        };
        if !started {
            discard_unstarted(&mut *sound);
        }
        Ok(started)
    }

    /// Fire-and-forget playback of one clip of an audio sprite
    ///
    /// `config` is layered over the clip's own settings, so a clip defined as
    /// looping keeps looping unless `config` says otherwise.
    pub fn play_audio_sprite(
        &mut self,
        key: &str,
        sprite_name: &str,
        config: Option<SoundOverrides>,
    ) -> Result<bool, AudioError> {
        let sound = self.add_audio_sprite(key, None)?;
        let mut sound = sound.borrow_mut();
        sound.once_ended(Box::new(|sound: &mut dyn Sound| sound.destroy()));
        let started = sound.play(Some(sprite_name), config);
        if !started {
            discard_unstarted(&mut *sound);
        }
        Ok(started)
    }

    /// Unregister a sound by identity without destroying it
    pub fn remove(&mut self, sound: &SoundHandle) -> bool {
        match self.sounds.iter().position(|existing| same_sound(existing, sound)) {
            Some(index) => {
                self.sounds.remove(index);
                true
            }
            None => false,
        }
    }

    /// Unregister every sound with `key` without destroying them
    ///
    /// Remaining sounds keep their relative order. Returns the number removed.
    pub fn remove_by_key(&mut self, key: &str) -> usize {
        let mut removed = 0;
        for index in (0..self.sounds.len()).rev() {
            if sound_key_is(&self.sounds[index], key) {
                self.sounds.remove(index);
                removed += 1;
            }
        }
        removed
    }

    /// Unregister every sound without destroying them
    pub fn remove_all(&mut self) {
        self.sounds.clear();
    }

    /// First registered sound with `key`
    pub fn get(&self, key: &str) -> Option<SoundHandle> {
        self.sounds
            .iter()
            .find(|sound| sound_key_is(sound, key))
            .cloned()
    }

    /// Every registered sound with `key`
    pub fn get_all(&self, key: &str) -> Vec<SoundHandle> {
        self.sounds
            .iter()
            .filter(|sound| sound_key_is(sound, key))
            .cloned()
            .collect()
    }

    /// Every active sound that is currently playing
    pub fn get_all_playing(&self) -> Vec<SoundHandle> {
        let mut playing = Vec::new();
        self.for_each_active_sound(|sound, index, sounds| {
            if sound.is_playing() {
                playing.push(Rc::clone(&sounds[index]));
            }
        });
        playing
    }

    /// True if any active sound with `key` is playing
    pub fn is_playing(&self, key: &str) -> bool {
        let mut found = false;
        self.for_each_active_sound(|sound, _, _| {
            found |= sound.key() == key && sound.is_playing();
        });
        found
    }

    /// Registered sounds, pending removal included
    pub fn sounds(&self) -> &[SoundHandle] {
        &self.sounds
    }

    /// Number of registered sounds
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    /// No sounds registered
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Pause every active sound
    pub fn pause_all(&mut self) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.for_each_active_sound(|sound, _, _| {
            sound.pause();
        });
        Ok(())
    }

    /// Resume every active sound
    pub fn resume_all(&mut self) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.for_each_active_sound(|sound, _, _| {
            sound.resume();
        });
        Ok(())
    }

    /// Stop every active sound
    pub fn stop_all(&mut self) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.for_each_active_sound(|sound, _, _| {
            sound.stop();
        });
        Ok(())
    }

    /// Stop every active sound with `key`, returning how many actually stopped
    pub fn stop_by_key(&mut self, key: &str) -> Result<usize, AudioError> {
        self.ensure_alive()?;
        let mut stopped = 0;
        self.for_each_active_sound(|sound, _, _| {
            if sound.key() == key && sound.stop() {
                stopped += 1;
            }
        });
        Ok(stopped)
    }

    /// Per-frame maintenance pass
    ///
    /// Evicts every sound pending removal, then advances each remaining sound
    /// exactly once, in registration order. Eviction is a stable in-place
    /// compaction: kept sounds retain their relative order.
    pub fn update(&mut self, time: f64, delta: f64) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.time = time;

        let before = self.sounds.len();
        self.sounds.retain(|sound| match sound.try_borrow() {
            Ok(sound) => !sound.is_pending_remove(),
            Err(_) => true,
        });
        let evicted = before - self.sounds.len();
        if evicted > 0 {
            log::debug!("Evicted {} finished sounds ({} live)", evicted, self.sounds.len());
        }

        for sound in &self.sounds {
            match sound.try_borrow_mut() {
                Ok(mut sound) => sound.update(time, delta),
                Err(_) => log::warn!("Skipped update of a sound that is already borrowed"),
            }
        }
        Ok(())
    }

    /// Tear down every sound, release the notification channel and the backend
    ///
    /// The manager is inert afterwards; mutating calls return `ManagerDestroyed`.
    pub fn destroy(&mut self) -> Result<(), AudioError> {
        self.ensure_alive()?;

        self.events.clear_handlers();
        self.policy.active.set(false);

        for sound in &self.sounds {
            match sound.try_borrow_mut() {
                Ok(mut sound) => sound.destroy(),
                Err(_) => log::warn!("Could not destroy a sound that is already borrowed"),
            }
        }
        self.sounds.clear();

        self.backend.borrow_mut().shutdown();
        self.destroyed = true;
        log::info!("Sound manager {} destroyed", self.id.raw());
        Ok(())
    }

    /// Run `callback(sound, index, sounds)` for every sound not pending removal
    ///
    /// Sounds that are already borrowed elsewhere are skipped with a warning so
    /// one misbehaving handle cannot abort the broadcast.
    pub fn for_each_active_sound<F>(&self, mut callback: F)
    where
        F: FnMut(&mut dyn Sound, usize, &[SoundHandle]),
    {
        for (index, handle) in self.sounds.iter().enumerate() {
            let Ok(mut sound) = handle.try_borrow_mut() else {
                log::warn!("Skipped sound {} that is already borrowed", index);
                continue;
            };
            if sound.is_pending_remove() {
                continue;
            }
            callback(&mut *sound, index, &self.sounds);
        }
    }

    /// Global mute flag
    pub fn mute(&self) -> bool {
        self.mute
    }

    /// Set the global mute flag and notify the backend and listeners
    pub fn set_mute(&mut self, mute: bool) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.mute = mute;
        self.backend.borrow_mut().on_mute_changed(mute);
        self.emit(EventType::MuteChanged, EventArg::Flag(mute));
        Ok(())
    }

    /// Global volume multiplier
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the global volume and notify the backend and listeners
    pub fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.volume = check_volume(volume)?;
        self.backend.borrow_mut().on_volume_changed(self.volume);
        self.emit(EventType::VolumeChanged, EventArg::Value(self.volume));
        Ok(())
    }

    /// Global playback-rate multiplier
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Set the global rate, push it to every active sound, then notify once
    ///
    /// # Errors
    /// `InvalidParameter` for non-finite or non-positive values.
    pub fn set_rate(&mut self, rate: f32) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.rate = check_rate(rate)?;
        self.propagate_tuning();
        self.emit(EventType::RateChanged, EventArg::Value(self.rate));
        Ok(())
    }

    /// Global detune in cents
    pub fn detune(&self) -> f32 {
        self.detune
    }

    /// Set the global detune, push it to every active sound, then notify once
    ///
    /// Values outside ±1200 cents are clamped.
    ///
    /// # Errors
    /// `InvalidParameter` for non-finite values.
    pub fn set_detune(&mut self, detune: f32) -> Result<(), AudioError> {
        self.ensure_alive()?;
        self.detune = clamp_detune(detune)?;
        // Detune changes the playback speed as well, so sounds recompute their rate
        self.propagate_tuning();
        self.emit(EventType::DetuneChanged, EventArg::Value(self.detune));
        Ok(())
    }

    fn propagate_tuning(&self) {
        let tuning = self.tuning();
        self.for_each_active_sound(|sound, _, _| sound.set_rate(&tuning));
    }

    fn emit(&mut self, event_type: EventType, value: EventArg) {
        let event = Event::new(event_type, self.time)
            .with_arg("source", EventArg::Source(self.id.raw()))
            .with_arg("value", value);
        self.events.emit(&event);
    }
}

impl Drop for SoundManager {
    fn drop(&mut self) {
        if !self.destroyed {
            let _ = self.destroy();
        }
    }
}

/// A one-shot that never started would never fire "ended"
fn discard_unstarted(sound: &mut dyn Sound) {
    log::warn!("One-shot '{}' failed to start, discarding it", sound.key());
    sound.destroy();
}

fn sound_key_is(sound: &SoundHandle, key: &str) -> bool {
    match sound.try_borrow() {
        Ok(sound) => sound.key() == key,
        Err(_) => {
            log::warn!("Skipped key match on a sound that is already borrowed");
            false
        }
    }
}

fn check_volume(volume: f32) -> Result<f32, AudioError> {
    if volume.is_finite() && volume >= 0.0 {
        Ok(volume)
    } else {
        Err(AudioError::InvalidParameter { name: "volume", value: volume })
    }
}

fn check_rate(rate: f32) -> Result<f32, AudioError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(AudioError::InvalidParameter { name: "rate", value: rate })
    }
}

fn check_detune(detune: f32) -> Result<f32, AudioError> {
    if detune.is_finite() && DETUNE_RANGE.contains(&detune) {
        Ok(detune)
    } else {
        Err(AudioError::InvalidParameter { name: "detune", value: detune })
    }
}

fn clamp_detune(detune: f32) -> Result<f32, AudioError> {
    if !detune.is_finite() {
        return Err(AudioError::InvalidParameter { name: "detune", value: detune });
    }
    let clamped = detune.clamp(*DETUNE_RANGE.start(), *DETUNE_RANGE.end());
    if clamped != detune {
        log::warn!("Detune {} clamped to {}", detune, clamped);
    }
    Ok(clamped)
}
