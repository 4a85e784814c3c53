//! Manager scenario tests
//!
//! Driven by recording mock sounds so every call the manager makes can be
//! checked, plus a few end-to-end runs on the null backend.

mod focus_tests;

use crate::audio::backend::SoundBackend;
use crate::audio::sound::{EndedCallback, GlobalTuning, Sound, SoundHandle, SoundMarker};
use crate::audio::{AudioError, SoundManager};
use crate::config::{SoundConfig, SoundManagerConfig, SoundOverrides};
use crate::events::{Event, EventSystem, EventType, OnceSignal};
use std::cell::RefCell;
use std::rc::Rc;

/// Sound that records every call it receives
pub(super) struct MockSound {
    pub key: String,
    pub pending_remove: bool,
    pub playing: bool,
    pub paused: bool,
    pub pause_calls: usize,
    pub resume_calls: usize,
    pub stop_calls: usize,
    pub destroy_calls: usize,
    pub set_rate_calls: Vec<GlobalTuning>,
    pub update_calls: Vec<(f64, f64)>,
    pub play_calls: Vec<(Option<String>, Option<SoundOverrides>)>,
    pub markers: Vec<SoundMarker>,
    ended: OnceSignal<EndedCallback>,
}

impl MockSound {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            pending_remove: false,
            playing: false,
            paused: false,
            pause_calls: 0,
            resume_calls: 0,
            stop_calls: 0,
            destroy_calls: 0,
            set_rate_calls: Vec::new(),
            update_calls: Vec::new(),
            play_calls: Vec::new(),
            markers: Vec::new(),
            ended: OnceSignal::new(),
        }
    }

    /// Simulate the end of playback
    pub fn finish(&mut self) {
        self.playing = false;
        for listener in self.ended.take() {
            listener(self);
        }
    }
}

impl Sound for MockSound {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_pending_remove(&self) -> bool {
        self.pending_remove
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self, marker: Option<&str>, config: Option<SoundOverrides>) -> bool {
        self.play_calls.push((marker.map(str::to_string), config));
        if let Some(name) = marker {
            if !self.markers.iter().any(|m| m.name == name) {
                return false;
            }
        }
        self.playing = true;
        true
    }

    fn pause(&mut self) -> bool {
        self.pause_calls += 1;
        self.paused = self.playing;
        self.playing = false;
        self.paused
    }

    fn resume(&mut self) -> bool {
        self.resume_calls += 1;
        let resumed = self.paused;
        self.playing |= resumed;
        self.paused = false;
        resumed
    }

    fn stop(&mut self) -> bool {
        self.stop_calls += 1;
        let stopped = self.playing || self.paused;
        self.playing = false;
        self.paused = false;
        stopped
    }

    fn destroy(&mut self) {
        self.destroy_calls += 1;
        self.pending_remove = true;
    }

    fn set_rate(&mut self, global: &GlobalTuning) {
        self.set_rate_calls.push(*global);
    }

    fn add_marker(&mut self, marker: SoundMarker) -> bool {
        if self.markers.iter().any(|m| m.name == marker.name) {
            return false;
        }
        self.markers.push(marker);
        true
    }

    fn update(&mut self, time: f64, delta: f64) {
        self.update_calls.push((time, delta));
    }

    fn once_ended(&mut self, callback: EndedCallback) {
        self.ended.subscribe(callback);
    }
}

/// Everything the mock backend saw
#[derive(Default)]
pub(super) struct BackendLog {
    pub created: Vec<Rc<RefCell<MockSound>>>,
    pub blur_calls: usize,
    pub focus_calls: usize,
    pub mute: Option<bool>,
    pub volume: Option<f32>,
    pub shutdown_calls: usize,
    /// Hand out the previous sound again instead of a new one
    pub reuse_last: bool,
}

pub(super) struct MockBackend {
    log: Rc<RefCell<BackendLog>>,
}

impl SoundBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn create_sound(&mut self, key: &str, _config: &SoundConfig) -> Result<SoundHandle, AudioError> {
        let mut log = self.log.borrow_mut();
        if key == "missing" {
            return Err(AudioError::AssetNotFound(key.to_string()));
        }
        if log.reuse_last {
            if let Some(last) = log.created.last() {
                let handle: SoundHandle = last.clone();
                return Ok(handle);
            }
        }
        let sound = Rc::new(RefCell::new(MockSound::new(key)));
        log.created.push(Rc::clone(&sound));
        Ok(sound)
    }

    fn on_blur(&mut self) {
        self.log.borrow_mut().blur_calls += 1;
    }

    fn on_focus(&mut self) {
        self.log.borrow_mut().focus_calls += 1;
    }

    fn on_mute_changed(&mut self, mute: bool) {
        self.log.borrow_mut().mute = Some(mute);
    }

    fn on_volume_changed(&mut self, volume: f32) {
        self.log.borrow_mut().volume = Some(volume);
    }

    fn shutdown(&mut self) {
        self.log.borrow_mut().shutdown_calls += 1;
    }
}

/// Manager over a mock backend, plus the host event system it listens to
pub(super) struct Fixture {
    pub manager: SoundManager,
    pub host: EventSystem,
    pub log: Rc<RefCell<BackendLog>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SoundManagerConfig::default())
    }

    pub fn with_config(config: SoundManagerConfig) -> Self {
        let log = Rc::new(RefCell::new(BackendLog::default()));
        let mut host = EventSystem::new();
        let backend = MockBackend { log: Rc::clone(&log) };
        let manager = SoundManager::new(backend, &mut host, config).unwrap();
        Self { manager, host, log }
    }

    /// Add sounds with the given keys, returning the mocks behind them
    pub fn add_sounds(&mut self, keys: &[&str]) -> Vec<Rc<RefCell<MockSound>>> {
        for key in keys {
            self.manager.add(key, None).unwrap();
        }
        let log = self.log.borrow();
        log.created[log.created.len() - keys.len()..].to_vec()
    }

    /// Deliver a focus signal the way the host would
    pub fn signal(&mut self, event_type: EventType) {
        self.host.send(Event::new(event_type, 0.0));
        self.host.dispatch();
    }

    /// Record every manager notification of one type
    pub fn record(&mut self, event_type: EventType) -> Rc<RefCell<Vec<Event>>> {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        self.manager.events_mut().register_handler(
            event_type,
            Box::new(move |event: &Event| {
                sink.borrow_mut().push(event.clone());
                false
            }),
        );
        received
    }
}

/// Keys of the manager's sounds, in order
pub(super) fn keys_of(manager: &SoundManager) -> Vec<String> {
    manager
        .sounds()
        .iter()
        .map(|sound| sound.borrow().key().to_string())
        .collect()
}
