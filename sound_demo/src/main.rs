//! Headless sound manager demo
//!
//! Runs a short simulated session on the null backend: a looping music track,
//! fire-and-forget effects and sprite clips, a focus loss in the middle and
//! global tuning changes. Pass a `.toml` or `.ron` manager config as the first
//! argument to override the defaults.

use sound_engine::foundation::logging;
use sound_engine::prelude::*;

const FRAME_STEP: f64 = 1.0 / 60.0;
const FRAMES: u32 = 360;
const FOCUS_AWAY: f64 = 1.0;

const SPRITE_JSON: &str = r#"{
    "resources": ["sfx.ogg"],
    "spritemap": {
        "coin": { "start": 0.0, "end": 0.4 },
        "jump": { "start": 0.5, "end": 0.8 },
        "engine": { "start": 1.0, "end": 2.0, "loop": true }
    }
}"#;

fn load_config() -> Result<SoundManagerConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading manager config from {}", path);
            let config = SoundManagerConfig::load_from_file(&path)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(SoundManagerConfig::default()),
    }
}

fn build_manager(host: &mut EventSystem, config: SoundManagerConfig) -> Result<SoundManager, Box<dyn std::error::Error>> {
    let backend = NullBackend::new()
        .with_asset("music", 4.0)
        .with_asset("laser", 0.3)
        .with_asset("sfx", 2.0);

    let mut sprites = SpriteMapCache::new();
    sprites.load_json("sfx", SPRITE_JSON)?;

    let mut manager = SoundManager::new(backend, host, config)?.with_sprite_cache(sprites);
    manager.events_mut().register_handler(
        EventType::RateChanged,
        Box::new(|event: &Event| {
            log::info!("Manager rate is now {:?}", event.get_value());
            false
        }),
    );
    manager.events_mut().register_handler(
        EventType::DetuneChanged,
        Box::new(|event: &Event| {
            log::info!("Manager detune is now {:?} cents", event.get_value());
            false
        }),
    );
    Ok(manager)
}

fn run(host: &mut EventSystem, manager: &mut SoundManager) -> Result<(), Box<dyn std::error::Error>> {
    let music = manager.add("music", Some(SoundConfig::default().with_loop(true).with_volume(0.6)))?;
    music.borrow_mut().play(None, None);

    let engine = manager.add_audio_sprite("sfx", None)?;
    engine.borrow_mut().play(Some("engine"), None);

    let mut clock = FrameClock::new();
    for frame in 0..FRAMES {
        let (time, delta) = clock.advance(FRAME_STEP);
        host.update_time(time);

        match frame {
            30 | 90 | 150 => {
                manager.play("laser", None)?;
            }
            60 => {
                manager.play_audio_sprite("sfx", "coin", None)?;
            }
            120 => {
                log::info!("Host lost focus, regaining it in {:.1}s", FOCUS_AWAY);
                host.send(Event::new(EventType::FocusLost, time));
                host.post(time + FOCUS_AWAY, Event::new(EventType::FocusGained, time + FOCUS_AWAY));
            }
            200 => manager.set_rate(1.5)?,
            240 => manager.set_detune(-200.0)?,
            270 => {
                let stopped = manager.stop_by_key("sfx")?;
                log::info!("Stopped {} sprite sounds", stopped);
            }
            300 => manager.pause_all()?,
            330 => manager.resume_all()?,
            _ => {}
        }

        host.dispatch();
        manager.update(time, delta)?;

        if frame % 60 == 0 {
            log::info!(
                "t={:.2}s sounds={} playing={} suspended={}",
                time,
                manager.len(),
                manager.get_all_playing().len(),
                manager.is_suspended()
            );
        }
    }

    log::info!(
        "Simulated {} frames ({:.1} fps average)",
        clock.frame_count(),
        clock.average_fps()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    log::info!("Starting sound manager demo");

    let config = load_config()?;
    let mut host = EventSystem::new();
    let mut manager = build_manager(&mut host, config)?;
    log::info!("Using '{}' backend", manager.backend_name());

    let result = run(&mut host, &mut manager);

    manager.detach_from_host(&mut host);
    manager.destroy()?;

    match result {
        Ok(()) => {
            log::info!("Demo finished");
            Ok(())
        }
        Err(e) => {
            log::error!("Demo failed: {}", e);
            Err(e)
        }
    }
}
