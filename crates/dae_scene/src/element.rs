//! The scene graph node type.
//!
//! One composite `Element` record replaces a deep inheritance chain: every
//! element carries the tick-participation flag and the drawable fields
//! (position, depth, visibility), and a capability tag selects the extra
//! per-kind data (sprite-sheet frames, perspective projection, text
//! layout). Per-kind update/draw logic lives in free functions dispatching
//! on the tag; user extension goes through an injected `Behavior` strategy
//! rather than subclassing.

use std::sync::{Arc, Mutex};

use dae_core::geometry::{Rect, Vec2, Vec3};
use dae_core::input::GestureState;

use crate::resource::{ResourceCache, ResourceId};
use crate::target::RenderTarget;

pub type ElementHandle = Arc<Mutex<Element>>;

/// User hook called each tick after the built-in per-kind update.
/// An `Err` is isolated at the tick boundary: logged, other elements
/// unaffected.
///
/// Runs with this element's lock held. Mutate the element through the
/// given reference (including `pos.z` -- the draw pass re-sorts every
/// frame); do not lock other element handles from inside, and use the
/// registries only for register/unregister.
pub trait Behavior: Send {
    fn update(&mut self, element: &mut Element, input: &GestureState) -> Result<(), String>;
}

impl<F> Behavior for F
where
    F: FnMut(&mut Element, &GestureState) -> Result<(), String> + Send,
{
    fn update(&mut self, element: &mut Element, input: &GestureState) -> Result<(), String> {
        self(element, input)
    }
}

/// Sprite-sheet animation state: frames laid out as a horizontal strip.
#[derive(Debug, Clone)]
pub struct SpriteState {
    pub frame_count: u32,
    pub current_frame: u32,
    /// Ticks to dwell on each frame.
    pub frame_delay: u32,
    pub playing: bool,
    delay_counter: u32,
}

impl SpriteState {
    pub fn new(frame_count: u32, frame_delay: u32) -> Self {
        Self {
            frame_count: frame_count.max(1),
            current_frame: 0,
            frame_delay: frame_delay.max(1),
            playing: true,
            delay_counter: 0,
        }
    }

    fn advance(&mut self) {
        if !self.playing {
            return;
        }
        self.delay_counter += 1;
        if self.delay_counter >= self.frame_delay {
            self.delay_counter = 0;
            self.current_frame = (self.current_frame + 1) % self.frame_count;
        }
    }
}

/// Perspective projection of depth onto screen scale.
#[derive(Debug, Clone)]
pub struct ProjectionState {
    /// Screen y of the vanishing line.
    pub horizon: f32,
    pub focal_length: f32,
}

impl ProjectionState {
    pub fn new(horizon: f32, focal_length: f32) -> Self {
        Self {
            horizon,
            focal_length,
        }
    }

    /// Scale factor for an element at depth `z`; approaches zero as the
    /// element recedes.
    pub fn scale_at(&self, z: f32) -> f32 {
        let denom = self.focal_length + z.max(0.0);
        if denom <= 0.0 {
            1.0
        } else {
            self.focal_length / denom
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextState {
    /// Offset of the text baseline relative to the element position.
    pub offset: Vec2,
}

/// Capability tag. `Plain` elements draw their graphic (if any) as-is.
pub enum ElementKind {
    Plain,
    Sprite(SpriteState),
    Sprite3d(ProjectionState),
    Text(TextState),
}

struct Guidance {
    destination: Vec2,
    speed: f32,
}

pub struct Element {
    /// Only active elements receive per-tick updates.
    pub active: bool,
    /// z is the depth key: higher z draws earlier (further back).
    pub pos: Vec3,
    pub vel: Vec3,
    pub visible: bool,
    /// Topmost elements draw in a second pass after everything else.
    pub topmost: bool,
    pub draw_centered: bool,
    /// Shared graphic, owned by the resource cache; the element holds only
    /// the id and tolerates the bitmap being absent.
    pub graphic: Option<ResourceId>,
    pub text: Option<String>,
    pub kind: ElementKind,
    pub behavior: Option<Box<dyn Behavior>>,
    guided: Option<Guidance>,
}

pub const DEFAULT_DEPTH: f32 = 100.0;

impl Element {
    pub fn new() -> Self {
        Self {
            active: true,
            pos: Vec3::new(0.0, 0.0, DEFAULT_DEPTH),
            vel: Vec3::ZERO,
            visible: true,
            topmost: false,
            draw_centered: true,
            graphic: None,
            text: None,
            kind: ElementKind::Plain,
            behavior: None,
            guided: None,
        }
    }

    pub fn with_graphic(id: ResourceId, x: f32, y: f32) -> Self {
        let mut element = Self::new();
        element.graphic = Some(id);
        element.pos.x = x;
        element.pos.y = y;
        element
    }

    pub fn with_text(text: impl Into<String>, x: f32, y: f32) -> Self {
        let mut element = Self::new();
        element.text = Some(text.into());
        element.pos.x = x;
        element.pos.y = y;
        element.kind = ElementKind::Text(TextState::default());
        element
    }

    /// Stop drawing and stop receiving ticks, without unloading.
    pub fn hibernate(&mut self) {
        self.visible = false;
        self.active = false;
    }

    pub fn wake(&mut self) {
        self.visible = true;
        self.active = true;
    }

    /// Engage self-guided motion toward `destination` at `speed` units per
    /// tick. Arrival snaps onto the destination exactly.
    pub fn move_to(&mut self, speed: f32, destination: Vec2) {
        self.guided = Some(Guidance { destination, speed });
    }

    /// A self-guided element has arrived once guidance disengages.
    pub fn has_reached_destination(&self) -> bool {
        self.guided.is_none()
    }

    /// Proximity test against a point, with independent x/y radii.
    /// Invisible elements are never in range.
    pub fn within_range(&self, target: Vec2, x_radius: f32, y_radius: f32) -> bool {
        if !self.visible {
            return false;
        }
        let p = self.pos.truncate();
        (p.x - target.x).abs() < x_radius && (p.y - target.y).abs() < y_radius
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::new()
    }
}

/// One tick of built-in element logic, then the injected behavior.
/// Self-guided motion re-aims the velocity at the destination every tick
/// and snaps on arrival.
pub fn update_element(element: &mut Element, input: &GestureState) -> Result<(), String> {
    if let Some(guidance) = &element.guided {
        let delta = guidance.destination - element.pos.truncate();
        let distance = delta.magnitude();
        if distance != 0.0 {
            let dir = delta / distance;
            element.vel.x = dir.x * guidance.speed;
            element.vel.y = dir.y * guidance.speed;
        }
        element.pos += element.vel;
        if distance <= guidance.speed {
            element.pos.x = guidance.destination.x;
            element.pos.y = guidance.destination.y;
            element.vel.x = 0.0;
            element.vel.y = 0.0;
            element.guided = None;
        }
    }

    if let ElementKind::Sprite(sprite) = &mut element.kind {
        sprite.advance();
    }

    // The behavior borrows the element mutably, so it steps out of the
    // struct for the duration of the call.
    if let Some(mut behavior) = element.behavior.take() {
        let result = behavior.update(element, input);
        element.behavior = Some(behavior);
        return result;
    }
    Ok(())
}

/// Draws one element. A missing or failed graphic draws nothing this frame;
/// the cache retries the load on the next attempt.
pub fn draw_element(element: &Element, target: &mut dyn RenderTarget, cache: &ResourceCache) {
    let mut x = element.pos.x;
    let mut y = element.pos.y;
    // Resolution normalization applies on top of any per-kind scaling.
    let mut scale = cache.pre_scale();

    if let ElementKind::Sprite3d(projection) = &element.kind {
        let depth_scale = projection.scale_at(element.pos.z);
        y = projection.horizon + (y - projection.horizon) * depth_scale;
        scale *= depth_scale;
    }

    if let Some(id) = element.graphic {
        if let Some(pixmap) = cache.get(id) {
            let src = match &element.kind {
                ElementKind::Sprite(sprite) => {
                    let frame_w = (pixmap.width / sprite.frame_count).max(1);
                    Some(Rect::new(
                        (sprite.current_frame * frame_w) as i32,
                        0,
                        frame_w as i32,
                        pixmap.height as i32,
                    ))
                }
                _ => None,
            };
            target.draw_image(&pixmap, x, y, element.draw_centered, scale, src);
        }
    }

    if let Some(text) = element.text.as_deref() {
        if !text.is_empty() {
            if let ElementKind::Text(layout) = &element.kind {
                x += layout.offset.x;
                y += layout.offset.y;
            }
            target.draw_text(text, x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scene_conventions() {
        let e = Element::new();
        assert!(e.active);
        assert!(e.visible);
        assert!(!e.topmost);
        assert!(e.draw_centered);
        assert_eq!(e.pos.z, DEFAULT_DEPTH);
    }

    #[test]
    fn hibernate_and_wake_toggle_both_flags() {
        let mut e = Element::new();
        e.hibernate();
        assert!(!e.active);
        assert!(!e.visible);
        e.wake();
        assert!(e.active);
        assert!(e.visible);
    }

    #[test]
    fn self_guided_element_reaches_destination_and_snaps() {
        let input = GestureState::new();
        let mut e = Element::new();
        e.move_to(3.0, Vec2::new(10.0, 0.0));
        assert!(!e.has_reached_destination());
        for _ in 0..10 {
            update_element(&mut e, &input).unwrap();
        }
        assert!(e.has_reached_destination());
        assert_eq!(e.pos.x, 10.0);
        assert_eq!(e.pos.y, 0.0);
        assert_eq!(e.vel.x, 0.0);
    }

    #[test]
    fn guided_velocity_points_at_destination() {
        let input = GestureState::new();
        let mut e = Element::new();
        e.move_to(5.0, Vec2::new(0.0, 100.0));
        update_element(&mut e, &input).unwrap();
        assert_eq!(e.vel.x, 0.0);
        assert_eq!(e.vel.y, 5.0);
        assert_eq!(e.pos.y, 5.0);
    }

    #[test]
    fn within_range_respects_visibility() {
        let mut e = Element::new();
        e.pos.x = 50.0;
        e.pos.y = 50.0;
        assert!(e.within_range(Vec2::new(52.0, 48.0), 5.0, 5.0));
        assert!(!e.within_range(Vec2::new(60.0, 50.0), 5.0, 5.0));
        e.visible = false;
        assert!(!e.within_range(Vec2::new(52.0, 48.0), 5.0, 5.0));
    }

    #[test]
    fn sprite_frames_advance_with_delay_and_wrap() {
        let input = GestureState::new();
        let mut e = Element::new();
        e.kind = ElementKind::Sprite(SpriteState::new(3, 2));
        let frame = |e: &Element| match &e.kind {
            ElementKind::Sprite(s) => s.current_frame,
            _ => unreachable!(),
        };
        update_element(&mut e, &input).unwrap();
        assert_eq!(frame(&e), 0);
        update_element(&mut e, &input).unwrap();
        assert_eq!(frame(&e), 1);
        for _ in 0..4 {
            update_element(&mut e, &input).unwrap();
        }
        assert_eq!(frame(&e), 0);
    }

    #[test]
    fn projection_scale_shrinks_with_depth() {
        let p = ProjectionState::new(120.0, 400.0);
        assert!(p.scale_at(0.0) >= 1.0 - f32::EPSILON);
        assert!(p.scale_at(400.0) < p.scale_at(100.0));
        assert!((p.scale_at(400.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn behavior_runs_after_builtin_update() {
        let input = GestureState::new();
        let mut e = Element::new();
        e.behavior = Some(Box::new(
            |element: &mut Element, _input: &GestureState| -> Result<(), String> {
                element.pos.x += 1.0;
                Ok(())
            },
        ));
        update_element(&mut e, &input).unwrap();
        update_element(&mut e, &input).unwrap();
        assert_eq!(e.pos.x, 2.0);
        assert!(e.behavior.is_some(), "behavior must be restored after call");
    }

    #[test]
    fn behavior_error_propagates_to_caller() {
        let input = GestureState::new();
        let mut e = Element::new();
        e.behavior = Some(Box::new(
            |_: &mut Element, _: &GestureState| -> Result<(), String> {
                Err("scripted fault".to_string())
            },
        ));
        let err = update_element(&mut e, &input).unwrap_err();
        assert!(err.contains("scripted fault"));
    }
}
