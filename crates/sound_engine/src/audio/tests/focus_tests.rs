//! Host focus signals and the pause-on-blur policy

use super::Fixture;
use crate::audio::backend::NullBackend;
use crate::audio::SoundManager;
use crate::config::SoundManagerConfig;
use crate::events::{Event, EventSystem, EventType};

#[test]
fn test_focus_signals_reach_backend() {
    let mut fixture = Fixture::new();

    fixture.signal(EventType::FocusLost);
    fixture.signal(EventType::FocusGained);

    let log = fixture.log.borrow();
    assert_eq!(log.blur_calls, 1);
    assert_eq!(log.focus_calls, 1);
}

#[test]
fn test_policy_is_read_at_signal_time() {
    let mut fixture = Fixture::new();

    fixture.manager.set_pause_on_blur(false);
    fixture.signal(EventType::FocusLost);
    assert_eq!(fixture.log.borrow().blur_calls, 0);

    fixture.manager.set_pause_on_blur(true);
    fixture.signal(EventType::FocusLost);
    assert_eq!(fixture.log.borrow().blur_calls, 1);
}

#[test]
fn test_disabled_in_config() {
    let mut fixture = Fixture::with_config(SoundManagerConfig::default().with_pause_on_blur(false));
    assert!(!fixture.manager.pause_on_blur());

    fixture.signal(EventType::FocusLost);
    fixture.signal(EventType::FocusGained);

    let log = fixture.log.borrow();
    assert_eq!((log.blur_calls, log.focus_calls), (0, 0));
}

#[test]
fn test_relay_is_inert_after_destroy() {
    let mut fixture = Fixture::new();
    fixture.manager.destroy().unwrap();

    fixture.signal(EventType::FocusLost);
    assert_eq!(fixture.log.borrow().blur_calls, 0);
}

#[test]
fn test_relay_is_inert_after_drop() {
    let Fixture { manager, mut host, log } = Fixture::new();
    drop(manager);

    host.send(Event::new(EventType::FocusLost, 0.0));
    host.dispatch();
    assert_eq!(log.borrow().blur_calls, 0);
}

#[test]
fn test_detach_removes_relays() {
    let mut fixture = Fixture::new();
    assert_eq!(fixture.host.handler_count(EventType::FocusLost), 1);
    assert_eq!(fixture.host.handler_count(EventType::FocusGained), 1);

    fixture.manager.detach_from_host(&mut fixture.host);

    assert_eq!(fixture.host.handler_count(EventType::FocusLost), 0);
    assert_eq!(fixture.host.handler_count(EventType::FocusGained), 0);
}

#[test]
fn test_blur_suspends_null_playback() {
    let mut host = EventSystem::new();
    let backend = NullBackend::new().with_asset("music", 2.0);
    let mut manager = SoundManager::new(backend, &mut host, SoundManagerConfig::default()).unwrap();
    manager.play("music", None).unwrap();

    host.send(Event::new(EventType::FocusLost, 0.0));
    host.dispatch();
    assert!(manager.is_suspended());

    // Time passes while blurred, but the sound does not advance
    manager.update(5.0, 5.0).unwrap();
    assert!(manager.is_playing("music"));

    host.send(Event::new(EventType::FocusGained, 5.0));
    host.dispatch();
    assert!(!manager.is_suspended());

    manager.update(7.0, 2.0).unwrap();
    assert!(!manager.is_playing("music"));
}

#[test]
fn test_scheduled_focus_gain_resumes_at_its_time() {
    let mut host = EventSystem::new();
    let backend = NullBackend::new().with_asset("music", 10.0);
    let manager = SoundManager::new(backend, &mut host, SoundManagerConfig::default()).unwrap();

    host.send(Event::new(EventType::FocusLost, 0.0));
    host.post(1.0, Event::new(EventType::FocusGained, 1.0));

    host.update_time(0.5);
    host.dispatch();
    assert!(manager.is_suspended());

    host.update_time(1.0);
    host.dispatch();
    assert!(!manager.is_suspended());
}
