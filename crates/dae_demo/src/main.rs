//! Headless demo: runs the engine for a few seconds against a software
//! framebuffer, renders a short synthesized jingle to a raw PCM file, and
//! exercises the save/restore protocol.
//!
//! Usage: `dae_demo [config.json]`. Drop PNG files named `<id>.png` in
//! `assets/` to give the sprites real graphics; missing files draw nothing
//! and are retried lazily, so the demo runs fine without them.

mod framebuffer;
mod loader;
mod pcm;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use dae_audio::{Adshr, Modulation, Oscillator, Waveform, SAMPLE_RATE};
use dae_core::config::{load_config_from_path, EngineConfig};
use dae_core::geometry::Vec2;
use dae_core::input::{GestureState, SINGLE_TAP};
use dae_scene::sink::to_pcm16;
use dae_scene::{
    AudioSink, Element, Engine, FieldReader, MemoryStore, Saveable, SaveableHandle, StateRegistry,
};

use framebuffer::Framebuffer;
use loader::PngLoader;
use pcm::PcmFileSink;

const SPRITE_GRAPHIC: u32 = 1;
const BADGE_GRAPHIC: u32 = 2;

fn main() -> Result<(), String> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config_from_path(Path::new(&path))?,
        None => EngineConfig::default(),
    };
    log::info!(
        "starting demo: {}x{} at {} Hz",
        config.logical_width,
        config.logical_height,
        config.tick_hz
    );

    let engine = Arc::new(Engine::with_tick_hz(
        config.tick_hz,
        Box::new(PngLoader::new(PathBuf::from("assets"))),
    ));
    populate_scene(&engine, &config);
    engine.enable_effects();

    let target = Framebuffer::new(config.logical_width, config.logical_height)
        .with_snapshot(30, PathBuf::from("demo_frame.png"));
    let threads = engine.start(Box::new(target));
    engine.surface_created(config.logical_width, config.logical_height);

    render_jingle(config.audio_buffer, Path::new("demo_jingle.pcm"))?;

    thread::sleep(Duration::from_secs(2));
    // Synthetic tap: the bouncer warps to the tapped point next tick.
    let tap = Vec2::new(
        config.logical_width as f32 * 0.25,
        config.logical_height as f32 * 0.25,
    );
    engine.input.set_state(SINGLE_TAP, tap, tap);
    thread::sleep(Duration::from_secs(1));

    log::info!(
        "uptime {} s, last fps {}, tick rate {:.1}, visible {}",
        engine.seconds(),
        engine.fps(),
        engine.tick_rate(),
        engine.visible_count()
    );
    engine.stop();
    threads.join();

    save_restore_demo()?;
    Ok(())
}

/// A sprite that bounces off the logical screen edges and warps to any
/// tapped position.
fn bouncer(width: f32, height: f32) -> Arc<Mutex<Element>> {
    let mut element = Element::with_graphic(SPRITE_GRAPHIC, width / 2.0, height / 2.0);
    element.vel.x = 3.0;
    element.vel.y = 2.0;
    element.behavior = Some(Box::new(
        move |element: &mut Element, input: &GestureState| -> Result<(), String> {
            if input.is_state(SINGLE_TAP) {
                element.pos.x = input.main_x();
                element.pos.y = input.main_y();
            }
            element.pos.x += element.vel.x;
            element.pos.y += element.vel.y;
            if element.pos.x < 0.0 || element.pos.x > width {
                element.vel.x = -element.vel.x;
            }
            if element.pos.y < 0.0 || element.pos.y > height {
                element.vel.y = -element.vel.y;
            }
            Ok(())
        },
    ));
    Arc::new(Mutex::new(element))
}

fn populate_scene(engine: &Arc<Engine>, config: &EngineConfig) {
    let width = config.logical_width as f32;
    let height = config.logical_height as f32;

    engine.spawn(bouncer(width, height));

    // A guided element drifting to the bottom corner, drawn behind the
    // bouncer.
    let drifter = Arc::new(Mutex::new(Element::with_graphic(BADGE_GRAPHIC, 10.0, 10.0)));
    drifter
        .lock()
        .unwrap()
        .move_to(1.5, Vec2::new(width - 20.0, height - 20.0));
    engine.spawn(drifter.clone());
    engine.set_depth(&drifter, 200.0);

    if config.debug_overlay {
        engine.spawn(stats_overlay(engine));
    }
}

/// Topmost text element that rewrites itself from the engine stats each
/// tick. Holds a weak reference so the overlay never keeps the engine
/// alive on its own.
fn stats_overlay(engine: &Arc<Engine>) -> Arc<Mutex<Element>> {
    let weak: Weak<Engine> = Arc::downgrade(engine);
    let mut element = Element::with_text("fps 0", 4.0, 12.0);
    element.topmost = true;
    element.draw_centered = false;
    element.behavior = Some(Box::new(
        move |element: &mut Element, _input: &GestureState| -> Result<(), String> {
            if let Some(engine) = weak.upgrade() {
                element.text = Some(format!(
                    "fps {} vis {}",
                    engine.fps(),
                    engine.visible_count()
                ));
            }
            Ok(())
        },
    ));
    Arc::new(Mutex::new(element))
}

/// One second of a gated square lead over an ADSHR envelope, written as
/// raw PCM.
fn render_jingle(buffer_size: usize, path: &Path) -> Result<(), String> {
    let mut osc = Oscillator::new(buffer_size, Waveform::Pulse);
    osc.volume = 0.6;
    osc.enabled = true;
    osc.modulation = Modulation::None;
    osc.set_envelope(Adshr::new(200, 400, 0.6, 2000, 1500));

    let mut sink = PcmFileSink::create(path)?;
    let mut pcm = Vec::new();
    let notes = [440.0, 554.37, 659.25, 880.0];
    let blocks_per_note = (SAMPLE_RATE as usize / 4 / buffer_size).max(1);
    for note in notes {
        osc.freq = note;
        for _ in 0..blocks_per_note {
            to_pcm16(osc.generate(), &mut pcm);
            sink.submit(&pcm)?;
        }
    }
    // Let the release tail ring out.
    osc.enabled = false;
    to_pcm16(osc.generate(), &mut pcm);
    sink.submit(&pcm)?;
    sink.finish()?;
    log::info!("jingle written to {}", path.display());
    Ok(())
}

struct HighScore {
    points: i32,
    holder: String,
}

impl Saveable for HighScore {
    fn type_tag(&self) -> &'static str {
        "high_score"
    }

    fn state_fields(&self) -> Vec<(String, String)> {
        vec![
            ("points".to_string(), self.points.to_string()),
            ("holder".to_string(), self.holder.clone()),
        ]
    }
}

fn high_score_factory(reader: &mut FieldReader) -> SaveableHandle {
    Arc::new(Mutex::new(HighScore {
        points: reader.next_i32(0),
        holder: reader.next_str("nobody"),
    }))
}

fn save_restore_demo() -> Result<(), String> {
    let mut store = MemoryStore::new();
    let mut registry = StateRegistry::new();
    registry.register_type("high_score", high_score_factory);
    registry.add(Arc::new(Mutex::new(HighScore {
        points: 9400,
        holder: "mju".to_string(),
    })));
    registry.save_all(&mut store)?;

    registry.clear_all();
    if !registry.load_all(&store) {
        return Err("saved state went missing".to_string());
    }
    for saveable in registry.saveables() {
        let saveable = saveable.lock().unwrap();
        log::info!(
            "restored {}: {:?}",
            saveable.type_tag(),
            saveable.state_fields()
        );
    }
    Ok(())
}
