//! Drawing surface abstraction.
//!
//! The render thread drives a `RenderTarget` through a fixed frame
//! protocol: `acquire`, `clear`, optional offscreen routing for the effects
//! hook, element draws, `composite`, `present`. Backends range from a real
//! window surface to the in-memory framebuffer the demo binary uses.

use dae_core::geometry::Rect;

use crate::resource::Pixmap;

pub trait RenderTarget: Send {
    /// Claims the surface for one frame. Returning false skips the frame;
    /// the scheduler retries on the next loop iteration.
    fn acquire(&mut self) -> bool;

    fn clear(&mut self);

    /// Redirects subsequent draws to an offscreen buffer (`true`) or back
    /// to the frame surface (`false`). Only used while effects are enabled.
    fn route_offscreen(&mut self, enabled: bool);

    /// Applies the effects pass: transforms the offscreen buffer and blits
    /// it onto the frame surface.
    fn composite(&mut self);

    /// Draws a pixmap, or the `src` sub-rectangle of it, at (`x`, `y`)
    /// scaled by `scale`. `centered` positions the image by its center
    /// instead of its top-left corner.
    fn draw_image(
        &mut self,
        pixmap: &Pixmap,
        x: f32,
        y: f32,
        centered: bool,
        scale: f32,
        src: Option<Rect>,
    );

    fn draw_text(&mut self, text: &str, x: f32, y: f32);

    /// Commits the finished frame.
    fn present(&mut self);
}
