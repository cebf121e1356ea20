//! The engine context and its two scheduler threads.
//!
//! The logic thread runs the fixed-tick update loop: walk the roster, clear
//! the coalesced input, sleep out the remainder of the period. The render
//! thread draws frames as fast as the surface allows, parking on a condvar
//! whenever no surface is attached. The two meet only through shared state
//! on the `Engine`: registries, input, and the stats block.
//!
//! Lifecycle is deliberately asymmetric. `spawn`/`spawn_offstage` add
//! elements to one or both registries, but `unload` is the only teardown
//! path and always removes from both, so an element can never linger
//! half-registered.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use dae_core::input::GestureState;
use dae_core::time::{TickPacer, TICK_HZ};

use crate::element::{draw_element, ElementHandle};
use crate::registry::{set_depth, Roster, Stage};
use crate::resource::{ResourceCache, ResourceLoader};
use crate::target::RenderTarget;

#[derive(Default)]
struct SurfaceState {
    ready: bool,
    width: u32,
    height: u32,
}

#[derive(Default, Clone, Copy)]
struct Stats {
    fps: u64,
    tick_rate: f64,
    visible_count: usize,
}

/// Handles for the two scheduler threads. Join after `Engine::stop` to
/// wait for a clean shutdown.
pub struct EngineThreads {
    logic: JoinHandle<()>,
    render: JoinHandle<()>,
}

impl EngineThreads {
    pub fn join(self) {
        let _ = self.logic.join();
        let _ = self.render.join();
    }
}

pub struct Engine {
    pub roster: Roster,
    pub stage: Stage,
    pub input: GestureState,
    pub resources: ResourceCache,
    tick_hz: u64,
    surface: Mutex<SurfaceState>,
    surface_signal: Condvar,
    stats: Mutex<Stats>,
    seconds: AtomicU64,
    frames_drawn: AtomicU64,
    running: AtomicBool,
    effects: AtomicBool,
}

impl Engine {
    pub fn new(loader: Box<dyn ResourceLoader>) -> Self {
        Self::with_tick_hz(TICK_HZ, loader)
    }

    pub fn with_tick_hz(tick_hz: u64, loader: Box<dyn ResourceLoader>) -> Self {
        Self {
            roster: Roster::new(),
            stage: Stage::new(),
            input: GestureState::new(),
            resources: ResourceCache::new(loader),
            tick_hz,
            surface: Mutex::new(SurfaceState::default()),
            surface_signal: Condvar::new(),
            stats: Mutex::new(Stats::default()),
            seconds: AtomicU64::new(0),
            frames_drawn: AtomicU64::new(0),
            running: AtomicBool::new(false),
            effects: AtomicBool::new(false),
        }
    }

    /// Adds an element to both registries: it ticks and it draws.
    pub fn spawn(&self, handle: ElementHandle) {
        self.roster.register(handle.clone());
        self.stage.register(handle);
    }

    /// Adds an element to the roster only: it ticks but never draws.
    pub fn spawn_offstage(&self, handle: ElementHandle) {
        self.roster.register(handle);
    }

    /// Removes an element from both registries. The sole teardown path.
    pub fn unload(&self, handle: &ElementHandle) {
        self.roster.unregister(handle);
        self.stage.unregister(handle);
    }

    pub fn set_depth(&self, handle: &ElementHandle, z: f32) {
        set_depth(handle, &self.stage, z);
    }

    pub fn enable_effects(&self) {
        self.effects.store(true, Ordering::Release);
    }

    pub fn disable_effects(&self) {
        self.effects.store(false, Ordering::Release);
    }

    /// Rendered-frames-per-second, snapshotted once each logic second.
    pub fn fps(&self) -> u64 {
        self.stats.lock().unwrap().fps
    }

    /// Smoothed logic rate in ticks per second, averaged over the pacer's
    /// recent frame-time window. Measures whole loop iterations, sleep
    /// included, so under load it reads below the nominal rate.
    pub fn tick_rate(&self) -> f64 {
        self.stats.lock().unwrap().tick_rate
    }

    /// Whole seconds of logic-thread uptime.
    pub fn seconds(&self) -> u64 {
        self.seconds.load(Ordering::Acquire)
    }

    /// Elements drawn in the most recent frame.
    pub fn visible_count(&self) -> usize {
        self.stats.lock().unwrap().visible_count
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Platform callback: a drawing surface exists. Wakes the render
    /// thread out of its parked wait.
    pub fn surface_created(&self, width: u32, height: u32) {
        let mut surface = self.surface.lock().unwrap();
        surface.ready = true;
        surface.width = width;
        surface.height = height;
        self.surface_signal.notify_all();
    }

    pub fn surface_changed(&self, width: u32, height: u32) {
        let mut surface = self.surface.lock().unwrap();
        surface.width = width;
        surface.height = height;
    }

    /// Sets the resolution-normalization factor for art authored at a
    /// different logical height than the actual surface.
    pub fn normalize_resolution(&self, authored_height: u32, actual_height: u32) {
        if authored_height > 0 {
            self.resources
                .set_pre_scale(actual_height as f32 / authored_height as f32);
        }
    }

    /// Platform callback: the surface is gone. The render thread parks
    /// until the next `surface_created`.
    pub fn surface_destroyed(&self) {
        self.surface.lock().unwrap().ready = false;
    }

    pub fn surface_size(&self) -> (u32, u32) {
        let surface = self.surface.lock().unwrap();
        (surface.width, surface.height)
    }

    /// Starts both scheduler threads. The engine must be shared in an
    /// `Arc`; each thread holds its own reference.
    pub fn start(self: &Arc<Self>, target: Box<dyn RenderTarget>) -> EngineThreads {
        self.running.store(true, Ordering::Release);

        let logic_engine = self.clone();
        let logic = thread::Builder::new()
            .name("dae-logic".to_string())
            .spawn(move || logic_engine.logic_loop())
            .expect("failed to spawn logic thread");

        let render_engine = self.clone();
        let render = thread::Builder::new()
            .name("dae-render".to_string())
            .spawn(move || render_engine.render_loop(target))
            .expect("failed to spawn render thread");

        EngineThreads { logic, render }
    }

    /// Signals both threads to exit. Wakes a render thread parked on the
    /// surface condvar.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let _guard = self.surface.lock().unwrap();
        self.surface_signal.notify_all();
    }

    fn logic_loop(&self) {
        log::info!("logic thread up at {} Hz", self.tick_hz);
        let mut pacer = TickPacer::new(self.tick_hz);
        while self.running.load(Ordering::Acquire) {
            let tick_start = Instant::now();
            if pacer.advance() {
                // Second rollover: take-and-reset the frame counter so the
                // published FPS covers exactly one second of rendering.
                let frames = self.frames_drawn.swap(0, Ordering::AcqRel);
                self.stats.lock().unwrap().fps = frames;
                self.seconds.store(pacer.seconds(), Ordering::Release);
            }
            self.roster.tick(&self.input);
            self.input.clear();
            thread::sleep(pacer.sleep_for(tick_start.elapsed()));
            pacer.record_frame_time(tick_start.elapsed().as_secs_f64());
            self.stats.lock().unwrap().tick_rate = pacer.smoothed_fps();
        }
        log::info!("logic thread down after {} s", pacer.seconds());
    }

    fn render_loop(&self, mut target: Box<dyn RenderTarget>) {
        log::info!("render thread up");
        while self.running.load(Ordering::Acquire) {
            {
                let mut surface = self.surface.lock().unwrap();
                while !surface.ready && self.running.load(Ordering::Acquire) {
                    surface = self.surface_signal.wait(surface).unwrap();
                }
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            if !target.acquire() {
                continue;
            }
            self.frames_drawn.fetch_add(1, Ordering::AcqRel);
            self.draw_frame(target.as_mut());
        }
        log::info!("render thread down");
    }

    fn draw_frame(&self, target: &mut dyn RenderTarget) {
        let effects = self.effects.load(Ordering::Acquire);
        target.clear();
        if effects {
            target.route_offscreen(true);
        }

        // Depth may have changed since last frame without anyone telling
        // the stage; the snapshot refreshes every depth key and re-sorts
        // when any moved.
        let draw_order = self.stage.draw_order_snapshot();

        let mut visible = 0;
        for handle in &draw_order {
            let element = handle.lock().unwrap();
            if element.visible && !element.topmost {
                draw_element(&element, target, &self.resources);
                visible += 1;
            }
        }

        if effects {
            target.route_offscreen(false);
            target.composite();
        }

        // Topmost elements draw over the composited result, untouched by
        // the effects pass.
        for handle in &draw_order {
            let element = handle.lock().unwrap();
            if element.visible && element.topmost {
                draw_element(&element, target, &self.resources);
                visible += 1;
            }
        }

        target.present();
        self.stats.lock().unwrap().visible_count = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::resource::{Pixmap, ResourceId};
    use dae_core::geometry::{Rect, Vec2};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_loader() -> Box<dyn ResourceLoader> {
        Box::new(|_id: ResourceId| Ok(Pixmap::solid(4, 4, [255, 255, 255, 255])))
    }

    #[derive(Default)]
    struct FrameLog {
        presents: AtomicUsize,
        draws: AtomicUsize,
        composites: AtomicUsize,
    }

    struct LoggingTarget {
        log: Arc<FrameLog>,
    }

    impl RenderTarget for LoggingTarget {
        fn acquire(&mut self) -> bool {
            true
        }
        fn clear(&mut self) {}
        fn route_offscreen(&mut self, _enabled: bool) {}
        fn composite(&mut self) {
            self.log.composites.fetch_add(1, Ordering::SeqCst);
        }
        fn draw_image(
            &mut self,
            _pixmap: &Pixmap,
            _x: f32,
            _y: f32,
            _centered: bool,
            _scale: f32,
            _src: Option<Rect>,
        ) {
            self.log.draws.fetch_add(1, Ordering::SeqCst);
        }
        fn draw_text(&mut self, _text: &str, _x: f32, _y: f32) {}
        fn present(&mut self) {
            self.log.presents.fetch_add(1, Ordering::SeqCst);
            // Keep the spin loop polite in tests.
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn visible_sprite() -> ElementHandle {
        Arc::new(Mutex::new(Element::with_graphic(1, 10.0, 10.0)))
    }

    #[test]
    fn spawn_registers_in_both_registries_and_unload_removes() {
        let engine = Engine::new(test_loader());
        let handle = visible_sprite();
        engine.spawn(handle.clone());
        assert_eq!(engine.roster.len(), 1);
        assert_eq!(engine.stage.len(), 1);
        engine.unload(&handle);
        assert_eq!(engine.roster.len(), 0);
        assert_eq!(engine.stage.len(), 0);
    }

    #[test]
    fn offstage_elements_tick_but_never_draw() {
        let engine = Engine::new(test_loader());
        engine.spawn_offstage(visible_sprite());
        assert_eq!(engine.roster.len(), 1);
        assert_eq!(engine.stage.len(), 0);
    }

    #[test]
    fn threads_run_tick_and_draw_then_stop_cleanly() {
        let engine = Arc::new(Engine::with_tick_hz(100, test_loader()));
        let log = Arc::new(FrameLog::default());

        let mover = visible_sprite();
        mover
            .lock()
            .unwrap()
            .move_to(1.0, Vec2::new(1000.0, 10.0));
        engine.spawn(mover.clone());

        let threads = engine.start(Box::new(LoggingTarget { log: log.clone() }));
        engine.surface_created(320, 480);
        thread::sleep(Duration::from_millis(200));
        engine.stop();
        threads.join();

        assert!(log.presents.load(Ordering::SeqCst) > 0, "no frames drawn");
        assert!(log.draws.load(Ordering::SeqCst) > 0, "element never drawn");
        // ~100 Hz for 200 ms should move the element well off its start.
        assert!(mover.lock().unwrap().pos.x > 5.0, "element never ticked");
        assert_eq!(engine.visible_count(), 1);
        // The smoothed rate saw real iterations: positive, and bounded by
        // the 1 ms sleep floor.
        let rate = engine.tick_rate();
        assert!(rate > 0.0, "tick rate never sampled");
        assert!(rate < 1000.0);
    }

    #[test]
    fn render_thread_parks_without_a_surface() {
        let engine = Arc::new(Engine::with_tick_hz(100, test_loader()));
        let log = Arc::new(FrameLog::default());
        engine.spawn(visible_sprite());

        let threads = engine.start(Box::new(LoggingTarget { log: log.clone() }));
        // No surface_created call: the render thread must stay parked.
        thread::sleep(Duration::from_millis(100));
        assert_eq!(log.presents.load(Ordering::SeqCst), 0);
        engine.stop();
        threads.join();
    }

    #[test]
    fn effects_enable_composite_pass() {
        let engine = Arc::new(Engine::with_tick_hz(100, test_loader()));
        let log = Arc::new(FrameLog::default());
        engine.spawn(visible_sprite());
        engine.enable_effects();

        let threads = engine.start(Box::new(LoggingTarget { log: log.clone() }));
        engine.surface_created(320, 480);
        thread::sleep(Duration::from_millis(100));
        engine.stop();
        threads.join();

        let presents = log.presents.load(Ordering::SeqCst);
        assert!(presents > 0);
        assert_eq!(log.composites.load(Ordering::SeqCst), presents);
    }

    /// Records the width of every pixmap drawn, in draw order.
    struct OrderTarget {
        widths: Vec<u32>,
    }

    impl RenderTarget for OrderTarget {
        fn acquire(&mut self) -> bool {
            true
        }
        fn clear(&mut self) {}
        fn route_offscreen(&mut self, _enabled: bool) {}
        fn composite(&mut self) {}
        fn draw_image(
            &mut self,
            pixmap: &Pixmap,
            _x: f32,
            _y: f32,
            _centered: bool,
            _scale: f32,
            _src: Option<Rect>,
        ) {
            self.widths.push(pixmap.width);
        }
        fn draw_text(&mut self, _text: &str, _x: f32, _y: f32) {}
        fn present(&mut self) {}
    }

    #[test]
    fn one_frame_draws_back_to_front_with_topmost_last() {
        // Graphic width doubles as an element label: the loader hands back
        // an id-by-id pixmap.
        let engine = Engine::new(Box::new(|id: ResourceId| {
            Ok(Pixmap::solid(id, 1, [255, 255, 255, 255]))
        }));

        let far = Arc::new(Mutex::new(Element::with_graphic(20, 0.0, 0.0)));
        far.lock().unwrap().pos.z = 20.0;
        let near = Arc::new(Mutex::new(Element::with_graphic(10, 0.0, 0.0)));
        near.lock().unwrap().pos.z = 10.0;
        // Deepest element of all, but topmost: must still draw last.
        let overlay = Arc::new(Mutex::new(Element::with_graphic(99, 0.0, 0.0)));
        {
            let mut overlay = overlay.lock().unwrap();
            overlay.pos.z = 900.0;
            overlay.topmost = true;
        }
        engine.spawn(near);
        engine.spawn(overlay);
        engine.spawn(far);

        let mut target = OrderTarget { widths: Vec::new() };
        engine.draw_frame(&mut target);
        assert_eq!(target.widths, vec![20, 10, 99]);
        assert_eq!(engine.visible_count(), 3);
    }

    #[test]
    fn surface_state_tracks_platform_callbacks() {
        let engine = Engine::new(test_loader());
        engine.surface_created(320, 480);
        assert_eq!(engine.surface_size(), (320, 480));
        engine.surface_changed(640, 960);
        assert_eq!(engine.surface_size(), (640, 960));
        engine.surface_destroyed();
        // Size survives destruction; only readiness drops.
        assert_eq!(engine.surface_size(), (640, 960));
    }
}
